use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use crate::api::{
    dto::{LogoutResponse, UserResponse},
    error::ApiError,
};
use crate::db::DbError;
use crate::services::UserService;
use crate::sessions::AuthSession;

/// Return the user logged into the current session
pub async fn current_user(
    State(service): State<Arc<UserService>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = session
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    match service.get_user(&user_id).await {
        Ok(user) => Ok(Json(user.into())),
        // The session outlived its user
        Err(DbError::NotFound) => {
            session.logout();
            Err(ApiError::Unauthorized("Not authenticated".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(Extension(session): Extension<AuthSession>) -> Json<LogoutResponse> {
    let logged_out = session.logout();
    if logged_out {
        tracing::debug!(session_id = %session.id(), "Session logged out");
    }

    Json(LogoutResponse { logged_out })
}
