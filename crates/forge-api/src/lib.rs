//! # forge-api
//!
//! HTTP API for the forge planner: cookie-session auth, goals with
//! deliverables, calendar events, info tags, per-user provider keys and a
//! streaming chat proxy.
//!
//! The binary in `main.rs` wires configuration, logging and the database
//! together; everything else lives here so tests can drive the router with
//! `tower::ServiceExt::oneshot`.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use forge_crypto::{CryptoResult, KeySealer, MasterKey, PasswordParams, SessionSigner};
use forge_db::Database;
use forge_inference::ProviderRegistry;

pub use config::ServerConfig;
pub use error::ApiError;

use config::MAX_BODY_BYTES;
use handlers::{ai_keys, auth, chat, deliverables, events, goals, health, info_tags};
use middleware::{build_rate_limiter, rate_limit_middleware, GlobalRateLimiter, MakeRequestUuidV7};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<SessionSigner>,
    pub sealer: Arc<KeySealer>,
    pub providers: ProviderRegistry,
    pub password_params: PasswordParams,
    pub cookie_secure: bool,
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// Derive the session and sealing keys from `master` and apply the
    /// cookie and rate limit settings from `config`.
    pub fn new(
        db: Database,
        master: &MasterKey,
        providers: ProviderRegistry,
        config: &ServerConfig,
    ) -> CryptoResult<Self> {
        Ok(Self {
            db,
            sessions: Arc::new(SessionSigner::new(master)?),
            sealer: Arc::new(KeySealer::new(master)?),
            providers,
            password_params: PasswordParams::default(),
            cookie_secure: config.cookie_secure,
            rate_limiter: build_rate_limiter(&config.rate_limit),
        })
    }

    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password_params = params;
        self
    }
}

fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Build the full application router.
pub fn build_router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi::ApiDoc::openapi()))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        // Goals
        .route("/api/goals", get(goals::list_goals).post(goals::create_goal))
        .route(
            "/api/goals/:id",
            get(goals::get_goal)
                .put(goals::update_goal)
                .delete(goals::delete_goal),
        )
        .route("/api/goals/:id/schedule", post(goals::schedule_goal))
        // Deliverables and their calendar view
        .route(
            "/api/deliverables/:id",
            patch(deliverables::update_deliverable).delete(deliverables::delete_deliverable),
        )
        .route("/api/goal-events", get(deliverables::list_goal_events))
        .route(
            "/api/goal-events/:id",
            patch(deliverables::update_goal_event).delete(deliverables::delete_goal_event),
        )
        // Calendar events
        .route("/api/events", get(events::list_events).post(events::create_event))
        .route(
            "/api/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        // Info tags
        .route(
            "/api/info-tags",
            get(info_tags::list_info_tags).post(info_tags::create_info_tag),
        )
        .route(
            "/api/info-tags/:id",
            get(info_tags::get_info_tag)
                .patch(info_tags::update_info_tag)
                .delete(info_tags::delete_info_tag),
        )
        // Provider keys
        .route(
            "/api/ai-agent-api-keys",
            get(ai_keys::list_ai_keys).post(ai_keys::create_ai_key),
        )
        .route(
            "/api/ai-agent-api-keys/:id",
            get(ai_keys::get_ai_key)
                .put(ai_keys::update_ai_key)
                .delete(ai_keys::delete_ai_key),
        )
        // Chat
        .route("/api/chat", post(chat::chat))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(allowed_origins))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
