//! # whatref-api
//!
//! HTTP server for wristwatch identification.
//!
//! Exposes a stateless analyze endpoint, stateful guess sessions with a
//! bounded number of retries, and the recent-history list.

pub mod config;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;
use whatref_core::{
    HistoryStore, ImageNormalizer, InferenceGateway, ResultClassifier, SessionServices,
    VisionBackend,
};

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};
pub use services::SessionRegistry;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub services: Arc<SessionServices>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        backend: Arc<dyn VisionBackend>,
        classifier: ResultClassifier,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let gateway =
            InferenceGateway::new(backend, classifier).with_timeout(config.inference_timeout);
        let normalizer = ImageNormalizer::new(config.normalizer.clone());
        let services = SessionServices::new(gateway, normalizer, history)
            .with_max_retries(config.max_guess_retries);
        let sessions = SessionRegistry::new(config.session_capacity);

        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            sessions: Arc::new(sessions),
        }
    }

    pub fn gateway(&self) -> &InferenceGateway {
        &self.services.gateway
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.services.history
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn allowed_origins(config: &ServerConfig) -> Vec<HeaderValue> {
    config
        .frontend_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(subsystem = "api", "Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

/// Build the application router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    use handlers::{analyze, health, history, sessions};

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(&state.config)))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/api/analyze", post(analyze::analyze_image))
        .route("/api/health", get(health::health_check))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/guess-again", post(sessions::guess_again))
        .route("/api/sessions/:id/image", post(sessions::replace_image))
        .route(
            "/api/history",
            get(history::list_history).delete(history::clear_history),
        )
        .route("/api/openapi.json", get(openapi::openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        // Overflow surfaces through the extractors, which answer with the JSON error body.
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
