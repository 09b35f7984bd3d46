use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::extract::{JsonBody, RequestOrigin};
use crate::api::middleware::auth::{CurrentUser, AUTH_COOKIE, LOGGED_OUT};
use crate::api::response;
use crate::auth::{create_token, digest_token, generate_reset_token, hash_password, verify_password};
use crate::domain::errors::DomainError;
use crate::domain::user::{password_messages, Email, NewUser, User};
use crate::infrastructure::email::EmailMessage;
use crate::state::AppState;

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirm: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Issues a session token, sets it as an httpOnly cookie and returns the user
fn create_send_token(
    state: &AppState,
    origin: &RequestOrigin,
    user: &User,
    status: StatusCode,
    message: &str,
) -> Result<Response, ApiError> {
    let token = create_token(user.id, &state.config.jwt_secret, state.config.jwt_expires_in)?;

    let cookie = Cookie::build((AUTH_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(origin.is_secure())
        .max_age(time::Duration::seconds(
            state.config.jwt_cookie_expires_in.num_seconds(),
        ));

    let body = Json(json!({
        "status": "success",
        "token": token,
        "message": message,
        "data": user,
    }));

    Ok((status, CookieJar::new().add(cookie), body).into_response())
}

fn new_password_hash(state: &AppState, password: Option<&str>, confirm: Option<&str>) -> Result<String, ApiError> {
    DomainError::check(password_messages(password, confirm))?;
    Ok(hash_password(password.unwrap_or_default(), state.config.bcrypt_cost)?)
}

/// Register a new user
///
/// POST /api/v1/users/signup
pub async fn signup(
    State(state): State<AppState>,
    origin: RequestOrigin,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<Response, ApiError> {
    let registration = body.validate()?;
    let password_hash = hash_password(&registration.password, state.config.bcrypt_cost)?;
    let user = User::register(&registration, password_hash, Utc::now());

    state.users.as_crud().insert(&user).await?;
    tracing::info!(user_id = %user.id, "User signed up");

    let welcome = EmailMessage::welcome(&user, &origin.url("/me"))?;
    if let Err(e) = state.mailer.send(welcome).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to send welcome email");
    }

    create_send_token(&state, &origin, &user, StatusCode::CREATED, "Signed up successfully")
}

/// Login with email and password
///
/// POST /api/v1/users/login
pub async fn login(
    State(state): State<AppState>,
    origin: RequestOrigin,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (
        req.email.filter(|e| !e.is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide email and password"));
    };

    let incorrect = || ApiError::unauthorized("Incorrect email or password");

    let email = Email::new(email).map_err(|_| incorrect())?;
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(incorrect)?;

    if !verify_password(&password, &user.password_hash) {
        return Err(incorrect());
    }

    tracing::info!(user_id = %user.id, "User logged in");
    create_send_token(&state, &origin, &user, StatusCode::OK, "Logged in successfully")
}

/// GET /api/v1/users/logout
pub async fn logout() -> impl IntoResponse {
    let cookie = Cookie::build((AUTH_COOKIE, LOGGED_OUT))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(1));

    (CookieJar::new().add(cookie), response::success())
}

/// Emails a one-time password reset link
///
/// POST /api/v1/users/forgetPassword
pub async fn forget_password(
    State(state): State<AppState>,
    origin: RequestOrigin,
    JsonBody(req): JsonBody<ForgetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let not_found = || ApiError::not_found("User not found!");

    let email = req
        .email
        .and_then(|raw| Email::new(raw).ok())
        .ok_or_else(not_found)?;
    let mut user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(not_found)?;

    let reset = generate_reset_token();
    user.start_password_reset(reset.digest, Utc::now());
    state.users.as_crud().update(&user).await?;

    let url = origin.url(&format!("/resetPassword/{}", reset.token));
    let sent = match EmailMessage::password_reset(&user, &url) {
        Ok(message) => state.mailer.send(message).await,
        Err(e) => Err(e),
    };

    if let Err(e) = sent {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        user.clear_password_reset();
        state.users.as_crud().update(&user).await?;
        return Err(ApiError::server_error("Error sending and email! try again later"));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Reset email sent successfully"
    })))
}

/// PATCH /api/v1/users/resetPassword/:token
pub async fn reset_password(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(token): Path<String>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let mut user = state
        .users
        .find_by_reset_token(&digest_token(&token), now)
        .await?
        .ok_or_else(|| ApiError::bad_request("Token is invalid or expired"))?;

    let password_hash = new_password_hash(
        &state,
        req.password.as_deref(),
        req.password_confirm.as_deref(),
    )?;
    user.set_password(password_hash, now);
    state.users.as_crud().update(&user).await?;

    tracing::info!(user_id = %user.id, "Password reset");
    create_send_token(&state, &origin, &user, StatusCode::OK, "Password changed successfully")
}

/// PATCH /api/v1/users/updatePassword
pub async fn update_password(
    State(state): State<AppState>,
    origin: RequestOrigin,
    CurrentUser(mut user): CurrentUser,
    JsonBody(req): JsonBody<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    if !present(&req.current_password) || !present(&req.new_password) || !present(&req.new_password_confirm) {
        return Err(ApiError::bad_request("Enter required fields"));
    }

    if !verify_password(req.current_password.as_deref().unwrap_or_default(), &user.password_hash) {
        return Err(ApiError::unauthorized("Current password is wrong"));
    }

    let password_hash = new_password_hash(
        &state,
        req.new_password.as_deref(),
        req.new_password_confirm.as_deref(),
    )?;
    user.set_password(password_hash, Utc::now());
    state.users.as_crud().update(&user).await?;

    tracing::info!(user_id = %user.id, "Password updated");
    create_send_token(&state, &origin, &user, StatusCode::OK, "password changed successfully")
}
