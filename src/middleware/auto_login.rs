use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::ConfigProvider;
use crate::repositories::{UserLookup, UserStore};
use crate::sessions::{AuthSession, SessionGuard};

/// Environment variable naming the user to log in automatically.
pub const TESTING_USER_ENV: &str = "USER_TESTING_ID";

/// Environments in which auto-login never happens.
pub const EXCLUDED_ENVIRONMENTS: [&str; 2] = ["production", "testing"];

/// Which branch an auto-login attempt took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoLogin {
    /// `USER_TESTING_ID` is unset or empty.
    Disabled,
    AlreadyAuthenticated,
    EnvironmentExcluded,
    /// The user was missing or the store failed.
    UserUnavailable,
    LoggedIn(String),
}

/// Logs the configured testing user into unauthenticated sessions
/// outside production and testing environments.
pub struct TestingAutoAuthenticator {
    config: Arc<dyn ConfigProvider>,
    users: Arc<dyn UserStore>,
}

impl TestingAutoAuthenticator {
    pub fn new(config: Arc<dyn ConfigProvider>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }

    /// Returns the testing user id when auto-login would be attempted
    /// for an unauthenticated session.
    pub fn armed_user_id(&self) -> Option<String> {
        let user_id = self.testing_user_id()?;
        (!self.environment_excluded()).then_some(user_id)
    }

    /// Run the gating checks in order and log the testing user in when
    /// they all pass. Lookup failures are dropped.
    pub async fn authenticate<S>(&self, session: &S) -> AutoLogin
    where
        S: SessionGuard + ?Sized,
    {
        let Some(user_id) = self.testing_user_id() else {
            return AutoLogin::Disabled;
        };

        if session.is_authenticated() {
            return AutoLogin::AlreadyAuthenticated;
        }

        if self.environment_excluded() {
            return AutoLogin::EnvironmentExcluded;
        }

        match self.users.find_by_id(&user_id).await {
            UserLookup::Found(user) => {
                session.login(&user);
                AutoLogin::LoggedIn(user.user_id)
            }
            UserLookup::NotFound | UserLookup::Error(_) => AutoLogin::UserUnavailable,
        }
    }

    fn testing_user_id(&self) -> Option<String> {
        self.config
            .get(TESTING_USER_ENV)
            .filter(|user_id| !user_id.is_empty())
    }

    fn environment_excluded(&self) -> bool {
        let environment = self.config.current_environment();
        EXCLUDED_ENVIRONMENTS.contains(&environment.as_str())
    }
}

/// Request filter wrapping [`TestingAutoAuthenticator`]. Always hands the
/// request on to `next` and returns its response untouched.
pub async fn auto_login_middleware(
    State(auto_login): State<Arc<TestingAutoAuthenticator>>,
    req: Request,
    next: Next,
) -> Response {
    let session = req.extensions().get::<AuthSession>().cloned();

    if let Some(session) = session {
        match auto_login.authenticate(&session).await {
            AutoLogin::LoggedIn(user_id) => {
                tracing::info!(
                    session_id = %session.id(),
                    "Automatically logged in testing user {}",
                    user_id
                );
            }
            AutoLogin::Disabled => {
                tracing::debug!("Auto-login disabled: {} not set", TESTING_USER_ENV);
            }
            AutoLogin::AlreadyAuthenticated => {
                tracing::debug!(session_id = %session.id(), "Session already authenticated");
            }
            AutoLogin::EnvironmentExcluded => {
                tracing::debug!("Skipping auto-login in excluded environment");
            }
            AutoLogin::UserUnavailable => {}
        }
    }

    next.run(req).await
}
