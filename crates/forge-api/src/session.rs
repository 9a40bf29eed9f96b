//! Session cookie handling and the authenticated-user extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use forge_core::UserRepository;

use crate::{ApiError, AppState};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "forge_session";

/// Cookie carrying a freshly signed session token.
pub fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
}

/// Expired, empty cookie that makes the browser drop the session.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .secure(secure)
        .build()
}

/// Issue a session for `user_id` and add it to `jar`.
pub fn start_session(state: &AppState, jar: CookieJar, user_id: &str) -> Result<CookieJar, ApiError> {
    let token = state.sessions.sign(user_id)?;
    let max_age = state.sessions.ttl().num_seconds();
    Ok(jar.add(session_cookie(token, max_age, state.cookie_secure)))
}

/// The user id from a verified session token, if any. Does not check that
/// the user still exists.
#[derive(Debug, Clone)]
pub struct SessionUser(pub Option<String>);

#[axum::async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(SessionUser(None));
        };

        match state.sessions.verify(cookie.value()) {
            Ok(claims) => Ok(SessionUser(Some(claims.user_id))),
            Err(e) => {
                debug!(subsystem = "api", component = "session", error = %e, "Rejected session cookie");
                Ok(SessionUser(None))
            }
        }
    }
}

/// Requires a valid session for an existing user; 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(user_id) = SessionUser::from_request_parts(parts, state).await?;
        let user_id = user_id.ok_or_else(ApiError::auth_required)?;

        if !state.db.users.exists(&user_id).await? {
            debug!(subsystem = "api", component = "session", user_id = %user_id, "Session for deleted user");
            return Err(ApiError::auth_required());
        }

        Ok(CurrentUser { user_id })
    }
}
