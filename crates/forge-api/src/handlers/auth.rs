//! Registration, login, logout and the current user.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use forge_core::validation::{normalize_email, validate_email, validate_password};
use forge_core::UserRepository;
use forge_crypto::{hash_password, verify_password};

use crate::error::ApiResultExt;
use crate::extract::ApiJson;
use crate::handlers::{ErrorResponse, MessageResponse};
use crate::session::{removal_cookie, start_session, SessionUser};
use crate::{ApiError, AppState};

/// Email and password, as posted by the register and login forms.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields, or 400 when either is missing or blank.
    fn required(self) -> Result<(String, String), ApiError> {
        match (self.email, self.password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok((email.trim().to_string(), password))
            }
            _ => Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create an account and start a session.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = Credentials,
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, body = ErrorResponse),
        (status = 409, body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let (email, password) = body.required()?;
    validate_email(&email)?;
    validate_password(&password)?;

    let user_id = normalize_email(&email);
    let taken = || ApiError::Conflict("User with this email already exists".to_string());
    if state.db.users.exists(&user_id).await.or_fail("Failed to register user")? {
        return Err(taken());
    }

    let params = state.password_params;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, &params))
        .await
        .map_err(|_| ApiError::Internal("Failed to register user".to_string()))?
        .or_fail("Failed to register user")?;

    let user = match state.db.users.create(&user_id, &password_hash).await {
        Ok(user) => user,
        Err(e) if e.is_unique_violation() => return Err(taken()),
        Err(e) => return Err(e).or_fail("Failed to register user"),
    };

    let jar = start_session(&state, jar, &user.id)?;
    info!(subsystem = "api", component = "auth", op = "register", user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: UserSummary {
                email: user.id,
                created_at: user.created_at,
            },
        }),
    ))
}

/// Verify credentials and start a session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = Credentials,
    responses(
        (status = 200, body = AuthResponse),
        (status = 400, body = ErrorResponse),
        (status = 401, body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let (email, password) = body.required()?;
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .db
        .users
        .get(&normalize_email(&email))
        .await
        .or_fail("Failed to login")?
        .ok_or_else(invalid)?;

    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|_| ApiError::Internal("Failed to login".to_string()))?
        .or_fail("Failed to login")?;
    if !matches {
        return Err(invalid());
    }

    let jar = start_session(&state, jar, &user.id)?;
    info!(subsystem = "api", component = "auth", op = "login", user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user: UserSummary {
                email: user.id,
                created_at: user.created_at,
            },
        }),
    ))
}

/// Drop the session cookie. Works without a session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(removal_cookie(state.cookie_secure)),
        Json(MessageResponse::new("Logged out")),
    )
}

/// The signed-in user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, body = MeResponse),
        (status = 401, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user_id = user_id.ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let user = state
        .db
        .users
        .get(&user_id)
        .await
        .or_fail("Failed to get user")?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        email: user.id,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }))
}
