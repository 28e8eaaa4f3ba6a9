use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::api::{
    dto::{CreateUserRequest, UserResponse},
    error::ApiError,
};
use crate::services::UserService;

pub async fn create_user(
    State(service): State<Arc<UserService>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = service
        .create_user(payload.user_id, payload.name, payload.email)
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(service): State<Arc<UserService>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = service.get_user(&user_id).await?;

    Ok(Json(user.into()))
}
