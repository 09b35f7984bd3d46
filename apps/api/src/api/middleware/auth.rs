use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::api::errors::{ApiError, LOGIN_REQUIRED};
use crate::auth::jwt::verify_token;
use crate::domain::user::{Role, User};
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "natoursJWTToken";
pub const LOGGED_OUT: &str = "loggedout";

pub const ADMIN: &[Role] = &[Role::Admin];
pub const STAFF: &[Role] = &[Role::Admin, Role::LeadGuide];
pub const ALL_GUIDES: &[Role] = &[Role::Admin, Role::LeadGuide, Role::Guide];
pub const REVIEWERS: &[Role] = &[Role::User, Role::Admin];
pub const CUSTOMERS: &[Role] = &[Role::User];

/// The authenticated user of a request
///
/// Usage:
/// ```rust,ignore
/// async fn protected_handler(
///     CurrentUser(user): CurrentUser,
/// ) -> Result<String, ApiError> {
///     Ok(format!("Hello {}", user.name))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The user behind the session cookie, if any; never rejects
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<User>);

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty() && value != LOGGED_OUT)
}

/// Bearer token first, then the session cookie
fn request_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_token(headers))
}

/// Resolves a session token to a live user
async fn user_for_token(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = verify_token(token, &state.config.jwt_secret)?;

    let user = state
        .users
        .as_crud()
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found!"))?;

    if user.changed_password_after(claims.iat) {
        return Err(ApiError::unauthorized(
            "User changed password, please log in again",
        ));
    }

    Ok(user)
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = request_token(headers).ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;
    user_for_token(state, &token).await
}

/// Fails with 403 unless the user holds one of `roles`
pub fn restrict_to(user: &User, roles: &[Role]) -> Result<(), ApiError> {
    if user.has_any_role(roles) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Access denied!"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        let user = authenticate(state, &parts.headers).await?;
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(CurrentUser(user)) = parts.extensions.get::<CurrentUser>() {
            return Ok(MaybeUser(Some(user.clone())));
        }
        let Some(token) = cookie_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        Ok(MaybeUser(user_for_token(state, &token).await.ok()))
    }
}

/// Route layer rejecting unauthenticated requests; stores the user for handlers
pub async fn protect(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Role gate for routes behind [`protect`]
///
/// ```rust,ignore
/// .route_layer(middleware::from_fn(|req: Request, next: Next| require_roles(STAFF, req, next)))
/// ```
pub async fn require_roles(
    roles: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let CurrentUser(user) = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))?;
    restrict_to(user, roles)?;
    Ok(next.run(request).await)
}
