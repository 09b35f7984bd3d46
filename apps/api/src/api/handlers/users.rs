// Account self-service plus admin user management

use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::factory::Resource;
use crate::api::errors::ApiError;
use crate::api::extract::JsonBody;
use crate::api::middleware::auth::CurrentUser;
use crate::api::response;
use crate::domain::entity::Entity;
use crate::domain::repositories::CrudRepository;
use crate::domain::user::{User, UserPatch};
use crate::state::AppState;

const NOT_AN_IMAGE: &str = "Not an image! Please upload only images.";

impl Resource for User {
    fn repository(state: &AppState) -> &dyn CrudRepository<Self> {
        state.users.as_crud()
    }
}

/// Fields accepted by `PATCH /updateMe`; password fields are only read to reject them
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    #[serde(skip)]
    pub photo: Option<PhotoUpload>,
}

/// Uploaded photo held in memory until the rest of the form validates
#[derive(Debug)]
pub struct PhotoUpload {
    pub extension: &'static str,
    pub bytes: Bytes,
}

impl PhotoUpload {
    fn filename(&self, user: &User) -> String {
        format!("user-{}-{}.{}", user.id, Utc::now().timestamp_millis(), self.extension)
    }
}

/// Raster formats browsers render inertly; anything else is refused
fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Reads text fields and an optional `photo` upload
async fn read_multipart(mut multipart: Multipart) -> Result<UpdateMeForm, ApiError> {
    let mut form = UpdateMeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let extension = field
                .content_type()
                .and_then(image_extension)
                .ok_or_else(|| ApiError::bad_request(NOT_AN_IMAGE))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            form.photo = Some(PhotoUpload { extension, bytes });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "email" => form.email = Some(value),
            "password" => form.password = Some(value),
            "passwordConfirm" => form.password_confirm = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

fn photo_path(state: &AppState, filename: &str) -> PathBuf {
    PathBuf::from(&state.config.public_dir)
        .join("img")
        .join("users")
        .join(filename)
}

/// Writes the photo under `<public>/img/users`
async fn store_photo(path: &Path, bytes: &[u8]) -> Result<(), ApiError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::internal_server_error(format!("Failed to store photo: {}", e)))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ApiError::internal_server_error(format!("Failed to store photo: {}", e)))
}

/// GET /api/v1/users/me
pub async fn get_me(CurrentUser(user): CurrentUser) -> Result<Json<Value>, ApiError> {
    response::data(&user)
}

/// PATCH /api/v1/users/updateMe (JSON or multipart/form-data)
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let form = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let JsonBody(form) = JsonBody::<UpdateMeForm>::from_request(request, &state).await?;
        form
    };

    if form.password.is_some() || form.password_confirm.is_some() {
        return Err(ApiError::bad_request(
            "This route is not for password updates. Please use /updatePassword",
        ));
    }

    let upload = form.photo.map(|photo| {
        let filename = photo.filename(&user);
        (filename, photo.bytes)
    });
    user.apply(UserPatch {
        name: form.name,
        email: form.email,
        role: None,
        photo: upload.as_ref().map(|(filename, _)| filename.clone()),
    })?;

    let stored = match &upload {
        Some((filename, bytes)) => {
            let path = photo_path(&state, filename);
            store_photo(&path, bytes).await?;
            tracing::info!(user_id = %user.id, %filename, "Stored user photo");
            Some(path)
        }
        None => None,
    };

    if let Err(err) = state.users.as_crud().update(&user).await {
        if let Some(path) = stored {
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove orphaned photo");
            }
        }
        return Err(err.into());
    }

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user }
    })))
}

/// Soft delete: the account stays stored but becomes invisible
///
/// DELETE /api/v1/users/deleteMe
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    user.deactivate();
    state.users.as_crud().update(&user).await?;
    tracing::info!(user_id = %user.id, "User deactivated their account");
    Ok(StatusCode::NO_CONTENT)
}

/// Accounts are only created through signup
pub async fn create_user() -> ApiError {
    ApiError::server_error("This route is not defined! Please use /signup instead")
}
