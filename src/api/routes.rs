use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::middleware::{TestingAutoAuthenticator, auto_login_middleware};
use crate::services::UserService;
use crate::sessions::{SessionStore, session_middleware};

use super::handlers;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub sessions: SessionStore,
    pub auto_login: Arc<TestingAutoAuthenticator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Users
        .route(
            "/api/v1/users",
            post(handlers::create_user).with_state(state.user_service.clone()),
        )
        .route(
            "/api/v1/users/{user_id}",
            get(handlers::get_user).with_state(state.user_service.clone()),
        )
        // Session
        .route(
            "/api/v1/me",
            get(handlers::current_user).with_state(state.user_service.clone()),
        )
        .route("/api/v1/logout", post(handlers::logout))
        // Outermost layer runs first: the session must exist before auto-login
        .layer(middleware::from_fn_with_state(
            state.auto_login.clone(),
            auto_login_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
}

async fn health_check() -> axum::Json<crate::api::dto::HealthResponse> {
    axum::Json(crate::api::dto::HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
    })
}
