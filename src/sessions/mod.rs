pub mod layer;
pub mod store;

pub use layer::{SESSION_COOKIE, session_id_from_jar, session_middleware};
pub use store::{
    AuthSession, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS, SessionGuard, SessionStore,
};
