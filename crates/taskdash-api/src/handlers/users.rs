use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use taskdash_db::User;

use super::{bad_request, internal_error, not_found, ErrorResponse};
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

pub async fn login(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(bad_request("Username and password required"));
    }

    match state
        .db
        .verify_login(&payload.username, &payload.password)
        .await
    {
        Ok(Some(user)) => Ok(Json(LoginResponse {
            success: true,
            user,
        })),
        Ok(None) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid credentials".to_string(),
            }),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn list_users(
    State(state): State<ApiState>,
) -> Result<Json<Vec<User>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .db
        .list_users()
        .await
        .map(Json)
        .map_err(internal_error)
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

pub async fn create_user(
    State(state): State<ApiState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), (StatusCode, Json<ErrorResponse>)> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(bad_request("Username and password required"));
    }

    let role = payload.role.as_deref().unwrap_or("user");

    match state
        .db
        .create_user(
            &payload.username,
            &payload.password,
            payload.email.as_deref(),
            role,
        )
        .await
    {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(e @ taskdash_db::Error::DuplicateUsername(_)) => Err(bad_request(e)),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

pub async fn update_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<User>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .db
        .update_user(
            user_id,
            payload.username.as_deref(),
            payload.email.as_deref(),
            payload.role.as_deref(),
            payload.password.as_deref(),
        )
        .await
    {
        Ok(user) => Ok(Json(user)),
        Err(taskdash_db::Error::UserNotFound(_)) => Err(not_found("User not found")),
        Err(e) => Err(internal_error(e)),
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

pub async fn delete_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<Json<DeleteResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.db.delete_user(user_id).await {
        Ok(true) => Ok(Json(DeleteResponse {
            message: "User deleted".to_string(),
        })),
        Ok(false) => Err(not_found("User not found")),
        Err(e) => Err(internal_error(e)),
    }
}
