//! HTTP surface of the gateway
//!
//! - `GET /api/contracts/stream/?prompt=...` validates the prompt and relays
//!   the upstream output as server-sent events
//! - `GET /health` for liveness probes
//!
//! Validation failures are answered with 400 before any upstream call.
//! Once the 200 event-stream response is committed, upstream failures can
//! only be reported as in-stream error events.

use axum::{
    Json, Router,
    body::Body,
    extract::{RawQuery, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::validator::PromptValidator;

use super::streaming::relay_stream;
use super::upstream::{GeminiUpstream, GenerateRequest, Upstream};

/// Message returned for failures that must not leak internal detail
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Number of prompt characters written to the log
const PROMPT_LOG_PREVIEW: usize = 100;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Prompt classifier applied before any upstream call
    pub validator: Arc<PromptValidator>,
    /// Text-generation backend
    pub upstream: Arc<dyn Upstream>,
}

/// The gateway HTTP server
pub struct GatewayServer {
    config: Config,
}

impl GatewayServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Resolve settings, build the components and serve until shutdown
    pub async fn serve(&self) -> Result<()> {
        let settings = self.config.upstream.resolve()?;
        tracing::info!("Upstream endpoint: {}", settings.url);
        tracing::debug!("Upstream settings: {:?}", settings);

        let upstream = GeminiUpstream::new(settings)?;
        let validator = PromptValidator::new(self.config.validator.clone())?;

        let app_state = Arc::new(AppState {
            validator: Arc::new(validator),
            upstream: Arc::new(upstream),
        });

        let app = create_router(app_state);

        let addr: SocketAddr = self
            .config
            .server
            .listen_addr
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid listen address: {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Server(format!("Failed to bind to {addr}: {e}")))?;

        tracing::info!("Starting gateway on {addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Server(format!("Server error: {e}")))?;

        tracing::info!("Gateway shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/contracts/stream", get(stream_handler))
        .route("/api/contracts/stream/", get(stream_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}

/// Value of the `prompt` query parameter. The last occurrence wins.
///
/// Decoding is lossy, so no query string is rejected here; malformed input
/// is left to the validator.
pub fn prompt_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .filter(|(key, _)| key == "prompt")
        .last()
        .map(|(_, value)| value.into_owned())
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Validate the prompt, then stream the generated contract
async fn stream_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let request_id = Uuid::new_v4();
    let raw_prompt = prompt_param(query.as_deref());

    let prompt = match state.validator.validate(raw_prompt.as_deref()) {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                error_type = e.category(),
                "Invalid prompt input: {e}"
            );
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let preview: String = prompt.as_str().chars().take(PROMPT_LOG_PREVIEW).collect();
    tracing::info!(
        request_id = %request_id,
        "Starting contract generation for prompt: {preview}..."
    );

    let request = GenerateRequest::from_validated(&prompt);
    let body = Body::from_stream(relay_stream(state.upstream.clone(), request, request_id));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", HeaderValue::from_static("no"))
        .body(body)
        .unwrap_or_else(|e| {
            tracing::error!(request_id = %request_id, "Failed to build stream response: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR_MESSAGE)
        })
}

/// Create a JSON error response of the form `{"error": "<message>"}`
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(error_type = "panic", "Unexpected error in stream handler: {detail}");

    error_response(StatusCode::INTERNAL_SERVER_ERROR, UNEXPECTED_ERROR_MESSAGE)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::relay::{UpstreamBody, UpstreamError};
    use async_trait::async_trait;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Upstream that records calls and never produces output
    #[derive(Default)]
    struct CountingUpstream {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Upstream for CountingUpstream {
        async fn open(
            &self,
            _request: &GenerateRequest,
        ) -> std::result::Result<UpstreamBody, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::pin(futures::stream::empty::<
                std::result::Result<bytes::Bytes, UpstreamError>,
            >()))
        }
    }

    fn create_test_state(upstream: Arc<dyn Upstream>) -> Arc<AppState> {
        Arc::new(AppState {
            validator: Arc::new(PromptValidator::new(ValidatorConfig::default()).unwrap()),
            upstream,
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state(Arc::new(CountingUpstream::default())));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("\"status\":\"ok\""));
    }

    #[tokio::test]
    async fn test_invalid_prompt_never_reaches_upstream() {
        let upstream = Arc::new(CountingUpstream::default());
        let app = create_router(create_test_state(upstream.clone()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/contracts/stream/?prompt=hi")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stream_headers() {
        let upstream = Arc::new(CountingUpstream::default());
        let app = create_router(create_test_state(upstream.clone()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/contracts/stream?prompt=Draft%20ToS%20for%20a%20cloud%20SaaS%20company")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["cache-control"], "no-cache");
        assert_eq!(response.headers()["x-accel-buffering"], "no");
        assert!(body_string(response).await.is_empty());
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"], UNEXPECTED_ERROR_MESSAGE);
    }

    #[test]
    fn test_prompt_param_takes_last_value() {
        assert_eq!(prompt_param(None), None);
        assert_eq!(prompt_param(Some("")), None);
        assert_eq!(prompt_param(Some("other=1")), None);
        assert_eq!(
            prompt_param(Some("prompt=a&prompt=b%20c+d")),
            Some("b c d".to_string())
        );
        assert_eq!(prompt_param(Some("prompt=")), Some(String::new()));
        assert_eq!(
            prompt_param(Some("prompt=%FF")),
            Some("\u{FFFD}".to_string())
        );
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(StatusCode::BAD_REQUEST, "nope");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
