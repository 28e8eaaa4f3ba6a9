use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use super::store::{SessionGuard, SessionStore};

pub const SESSION_COOKIE: &str = "session_id";

/// Attaches an [`AuthSession`](super::AuthSession) to every request.
///
/// A live `session_id` cookie resumes that session; anything else gets a
/// fresh id, which is handed to the client only if the session ends the
/// request authenticated.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut req: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let resumed = session_id_from_jar(&jar).filter(|id| store.touch(*id));
    let session = store.session(resumed.unwrap_or_else(Uuid::new_v4));
    req.extensions_mut().insert(session.clone());

    let response = next.run(req).await;

    if resumed.is_none() && session.is_authenticated() {
        let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        return (jar.add(cookie), response).into_response();
    }

    response
}

/// Session id carried by the `session_id` cookie, if well formed.
pub fn session_id_from_jar(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value_trimmed()).ok())
}
