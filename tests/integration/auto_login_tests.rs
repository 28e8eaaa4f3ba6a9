use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tower::ServiceExt;

use testing_autologin::{
    api::{AppState, LogoutResponse, UserResponse, create_router},
    config::StaticConfig,
    db::DbError,
    domain::User,
    middleware::{TESTING_USER_ENV, TestingAutoAuthenticator},
    repositories::{UserLookup, UserStore},
    services::UserService,
    sessions::SessionStore,
};

#[derive(Default)]
struct MemoryUsers {
    users: RwLock<HashMap<String, User>>,
    unavailable: bool,
}

impl MemoryUsers {
    fn with_user(user_id: &str) -> Self {
        let users = Self::default();
        users.users.write().unwrap().insert(
            user_id.to_string(),
            User::new(
                user_id.to_string(),
                "Dev User".to_string(),
                "dev@example.com".to_string(),
            ),
        );
        users
    }

    fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn find_by_id(&self, user_id: &str) -> UserLookup {
        if self.unavailable {
            return UserLookup::Error(DbError::MigrationError("schema change".to_string()));
        }
        match self.users.read().unwrap().get(user_id) {
            Some(user) => UserLookup::Found(user.clone()),
            None => UserLookup::NotFound,
        }
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        self.users
            .write()
            .unwrap()
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }
}

fn app(config: StaticConfig, users: MemoryUsers) -> (Router, SessionStore) {
    app_with_sessions(config, users, SessionStore::new())
}

fn app_with_sessions(
    config: StaticConfig,
    users: MemoryUsers,
    sessions: SessionStore,
) -> (Router, SessionStore) {
    let users: Arc<dyn UserStore> = Arc::new(users);
    let state = AppState {
        user_service: Arc::new(UserService::new(users.clone())),
        sessions: sessions.clone(),
        auto_login: Arc::new(TestingAutoAuthenticator::new(Arc::new(config), users)),
    };
    (create_router(state), sessions)
}

fn dev_config(user_id: &str) -> StaticConfig {
    StaticConfig::new("local").with(TESTING_USER_ENV, user_id)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn logs_in_testing_user_and_issues_session_cookie() {
    let (app, sessions) = app(dev_config("dev_1"), MemoryUsers::with_user("dev_1"));

    let response = app.clone().oneshot(get("/api/v1/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(cookie.starts_with("session_id="));
    let me: UserResponse = json(response).await;
    assert_eq!(me.user_id, "dev_1");
    assert_eq!(sessions.len(), 1);

    // Resumed session: no new cookie, no new session
    let response = app
        .oneshot(get("/api/v1/me", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn unset_or_empty_testing_user_leaves_requests_anonymous() {
    for config in [StaticConfig::new("local"), dev_config("")] {
        let (app, sessions) = app(config, MemoryUsers::with_user("dev_1"));

        let response = app.oneshot(get("/api/v1/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(session_cookie(&response).is_none());
        assert!(sessions.is_empty());
    }
}

#[tokio::test]
async fn excluded_environments_never_log_in() {
    for environment in ["production", "testing"] {
        let config = StaticConfig::new(environment).with(TESTING_USER_ENV, "dev_1");
        let (app, sessions) = app(config, MemoryUsers::with_user("dev_1"));

        let response = app.oneshot(get("/api/v1/me", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sessions.is_empty());
    }
}

#[tokio::test]
async fn unavailable_store_does_not_break_requests() {
    let (app, sessions) = app(dev_config("dev_1"), MemoryUsers::unavailable());

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn unknown_testing_user_stays_anonymous_until_created() {
    let (app, _) = app(dev_config("late_user"), MemoryUsers::default());

    let response = app.clone().oneshot(get("/api/v1/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"user_id":"late_user","name":"Late","email":"late@example.com"}"#,
        ))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/api/v1/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me: UserResponse = json(response).await;
    assert_eq!(me.user_id, "late_user");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let (app, sessions) = app(dev_config("dev_1"), MemoryUsers::with_user("dev_1"));

    let response = app.clone().oneshot(get("/api/v1/me", None)).await.unwrap();
    let cookie = session_cookie(&response).expect("session cookie");

    let logout = Request::builder()
        .method("POST")
        .uri("/api/v1/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: LogoutResponse = json(response).await;
    assert!(body.logged_out);
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn user_endpoints_report_validation_and_missing_users() {
    let (app, _) = app(StaticConfig::new("local"), MemoryUsers::default());

    let response = app
        .clone()
        .oneshot(get("/api/v1/users/nobody", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let create = Request::builder()
        .method("POST")
        .uri("/api/v1/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"user_id":"u1","name":"Bad","email":"not-an-email"}"#,
        ))
        .unwrap();
    let response = app.oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quoted_session_cookie_resumes_the_session() {
    let (app, sessions) = app(dev_config("dev_1"), MemoryUsers::with_user("dev_1"));

    let response = app.clone().oneshot(get("/api/v1/me", None)).await.unwrap();
    let cookie = session_cookie(&response).expect("session cookie");
    let id = cookie.trim_start_matches("session_id=");

    let quoted = format!("session_id=\"{}\"", id);
    let response = app.oneshot(get("/api/v1/me", Some(&quoted))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn set_cookie_carries_session_attributes() {
    let (app, _) = app(dev_config("dev_1"), MemoryUsers::with_user("dev_1"));

    let response = app.oneshot(get("/health", None)).await.unwrap();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();

    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
}

#[tokio::test]
async fn cookieless_traffic_does_not_grow_sessions_without_bound() {
    let sessions = SessionStore::with_limits(Duration::from_secs(60), 16);
    let (app, sessions) = app_with_sessions(
        dev_config("dev_1"),
        MemoryUsers::with_user("dev_1"),
        sessions,
    );

    for _ in 0..200 {
        let response = app.clone().oneshot(get("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(sessions.len(), 16);
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_not_resumed() {
    let sessions = SessionStore::with_limits(Duration::from_secs(60), 16);
    let (app, sessions) = app_with_sessions(
        dev_config("dev_1"),
        MemoryUsers::with_user("dev_1"),
        sessions,
    );

    let response = app.clone().oneshot(get("/health", None)).await.unwrap();
    let cookie = session_cookie(&response).expect("session cookie");

    tokio::time::advance(Duration::from_secs(120)).await;

    // The expired session is swept and a fresh one issued
    let response = app.oneshot(get("/health", Some(&cookie))).await.unwrap();
    let renewed = session_cookie(&response).expect("renewed session cookie");
    assert_ne!(renewed, cookie);
    assert_eq!(sessions.len(), 1);
}
