use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::app::auth::{AuthService, RegisterError};
use crate::app::gallery::GalleryService;
use crate::app::uploads::UploadService;
use crate::domain::image::ImageRecord;
use crate::domain::user::User;
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let username = payload.username.trim();
    let email = payload.email.trim();
    let password = payload.password.trim();
    let confirm = payload.confirm.trim();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::bad_request("please fill out all fields"));
    }
    if password != confirm {
        return Err(AppError::bad_request("passwords do not match"));
    }

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let user = service
        .register(username, email, password)
        .await
        .map_err(|err| match err {
            RegisterError::UsernameTaken => AppError::conflict("username already taken"),
            RegisterError::EmailTaken => AppError::conflict("email already registered"),
            RegisterError::Database(err) => {
                tracing::error!(error = ?err, "failed to register user");
                AppError::internal("database error")
            }
        })?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let session = service
        .login(&payload.username, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match session {
        Some(session) => Ok(Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
        })),
        None => Err(AppError::unauthorized("invalid username or password")),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageRecord>), AppError> {
    let mut file: Option<(String, String, bytes::Bytes)> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("invalid multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("failed to read file field"))?;
                file = Some((filename, content_type, data));
            }
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("failed to read caption field"))?;
                if !text.is_empty() {
                    caption = Some(text);
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, data) = match file {
        Some(file) if !file.0.is_empty() => file,
        // Missing file part or empty filename: nothing is written anywhere.
        _ => return Err(AppError::bad_request("a file with a filename is required")),
    };

    let service = UploadService::new(
        state.db.clone(),
        state.storage.clone(),
        state.storage_public_url.clone(),
        state.original_container.clone(),
    );
    let record = service
        .store_original(user.user_id, &filename, &content_type, caption, data)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to store upload");
            AppError::internal("failed to store upload")
        })?;

    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Serialize)]
pub struct GalleryResponse {
    pub originals: Vec<ImageRecord>,
    pub thumbnails: Vec<ImageRecord>,
}

pub async fn gallery(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<GalleryResponse>, AppError> {
    let service = GalleryService::new(state.db.clone());
    let gallery = service.list_for_owner(user.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to load gallery");
        AppError::internal("failed to load gallery")
    })?;

    Ok(Json(GalleryResponse {
        originals: gallery.originals,
        thumbnails: gallery.thumbnails,
    }))
}
