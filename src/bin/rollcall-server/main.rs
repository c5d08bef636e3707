use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

mod metrics;

use metrics::ImageOutcome;
use rollcall::opts::DEFAULT_VISION_ENDPOINT;
use rollcall::{
    Credentials, Error, Recognition, RosterMap, TextRecognizer, VisionConfig, VisionRecognizer,
    parse_roster,
};

type SharedRecognizer = Arc<dyn TextRecognizer + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "HTTP server for roster extraction")]
struct Params {
    /// Host interface to bind to.
    #[arg(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// TCP port to listen on.
    #[arg(long = "port", default_value_t = 8080)]
    port: u16,

    /// Maximum request body size (bytes).
    #[arg(long = "max-bytes", default_value_t = 20 * 1024 * 1024)]
    max_bytes: usize,

    /// Vision API key. Without credentials `/v1/extract` answers 503.
    #[arg(long = "api-key", env = "ROLLCALL_VISION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OAuth2 access token, used when no API key is given.
    #[arg(long = "access-token", env = "ROLLCALL_VISION_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// JSON file holding `api_key` or `access_token`.
    #[arg(long = "credentials")]
    credentials: Option<PathBuf>,

    /// Vision API base URL.
    #[arg(long = "endpoint", default_value = DEFAULT_VISION_ENDPOINT)]
    endpoint: String,

    /// Per-request OCR timeout in seconds.
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,
}

#[derive(Clone)]
struct AppState {
    recognizer: Option<SharedRecognizer>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

fn main() {
    rollcall::init_logging();

    if let Err(err) = run() {
        error!(error = ?err, "rollcall-server failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let params = Params::parse();
    metrics::init();

    let addr: SocketAddr = format!("{}:{}", params.host, params.port)
        .parse()
        .context("invalid host/port bind address")?;

    // The blocking HTTP client must be created and dropped outside the async runtime, so
    // we build it first and hold the last reference until the runtime is gone.
    let recognizer = build_recognizer(&params)?;
    if recognizer.is_none() {
        warn!("no Vision credentials configured; /v1/extract is disabled");
    }

    let state = AppState {
        recognizer: recognizer.clone(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let served = runtime.block_on(serve(addr, params.max_bytes, state));
    drop(runtime);
    drop(recognizer);

    served
}

fn build_recognizer(params: &Params) -> Result<Option<SharedRecognizer>> {
    let credentials = match credentials(params)? {
        Some(credentials) => credentials,
        None => return Ok(None),
    };

    let mut config = VisionConfig::new(credentials).with_endpoint(&params.endpoint);
    if let Some(secs) = params.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let recognizer = VisionRecognizer::new(config).context("failed to build Vision client")?;
    Ok(Some(Arc::new(recognizer)))
}

fn credentials(params: &Params) -> Result<Option<Credentials>> {
    Credentials::resolve(
        params.api_key.as_deref(),
        params.access_token.as_deref(),
        params.credentials.as_deref(),
    )
    .context("failed to load Vision credentials")
}

fn router(state: AppState, max_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/v1/parse", post(parse_text))
        .route("/v1/extract", post(extract_image))
        .route_layer(from_fn(metrics::track_http_metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

async fn serve(addr: SocketAddr, max_bytes: usize, state: AppState) -> Result<()> {
    let app = router(state, max_bytes);

    let listener = TcpListener::bind(addr).await.context("bind failed")?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn root() -> &'static str {
    "rollcall-server: POST /v1/parse (text body), POST /v1/extract (image body)"
}

async fn healthz() -> &'static str {
    "ok"
}

/// Parse already-recognized roster text.
async fn parse_text(body: String) -> std::result::Result<Response, AppError> {
    let rosters = parse_roster(&body);
    metrics::record_rosters(&rosters);
    json_response(&rosters)
}

/// Run OCR over an uploaded image, then parse the recognized text.
async fn extract_image(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Response, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("request body was empty"));
    }

    let Some(recognizer) = state.recognizer.clone() else {
        return Err(AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "text recognition is not configured",
        ));
    };

    let recognition = tokio::task::spawn_blocking(move || recognizer.recognize(&body))
        .await
        .map_err(|err| {
            error!(error = %err, "recognition task failed");
            AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "recognition task failed")
        })?;

    let rosters = match recognition {
        Ok(Recognition::Text(text)) => {
            metrics::record_image(ImageOutcome::Text);
            parse_roster(&text)
        }
        Ok(Recognition::NoText) => {
            metrics::record_image(ImageOutcome::NoText);
            info!("no text detected");
            RosterMap::new()
        }
        Err(err) => {
            metrics::record_image(ImageOutcome::Error);
            warn!(error = %err, "recognition failed");
            let status = match err {
                Error::Provider(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return Err(AppError::new(status, err.to_string()));
        }
    };

    metrics::record_rosters(&rosters);
    json_response(&rosters)
}

fn json_response(rosters: &RosterMap) -> std::result::Result<Response, AppError> {
    let body = rollcall::json_encoder::to_string(rosters)
        .map_err(|err| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        )],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(std::result::Result<Recognition, String>);

    impl TextRecognizer for Fixed {
        fn recognize(&self, _image: &[u8]) -> rollcall::Result<Recognition> {
            self.0.clone().map_err(Error::provider)
        }
    }

    fn state_with(outcome: std::result::Result<Recognition, String>) -> AppState {
        AppState {
            recognizer: Some(Arc::new(Fixed(outcome))),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn parse_returns_rosters() {
        let response = match parse_text("Room-101\n1. Alice(23)\n2. Bob(45)".to_owned()).await {
            Ok(response) => response,
            Err(err) => panic!("unexpected error: {}", err.message),
        };
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["101"][1]["name"], "Bob");
        assert_eq!(json["101"][1]["id"], 45);
    }

    #[tokio::test]
    async fn extract_without_recognizer_is_unavailable() {
        let state = AppState { recognizer: None };
        let err = extract_image(State(state), Bytes::from_static(b"img"))
            .await
            .err()
            .expect("expected AppError");
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn extract_rejects_empty_body() {
        let state = state_with(Ok(Recognition::NoText));
        let err = extract_image(State(state), Bytes::new())
            .await
            .err()
            .expect("expected AppError");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn extract_parses_recognized_text() {
        let state = state_with(Ok(Recognition::Text("Room-5\nSajid (7)".to_owned())));
        let response = match extract_image(State(state), Bytes::from_static(b"img")).await {
            Ok(response) => response,
            Err(err) => panic!("unexpected error: {}", err.message),
        };
        let json = body_json(response).await;
        assert_eq!(json["5"][0]["name"], "Sajid");
    }

    #[tokio::test]
    async fn extract_without_text_returns_empty_object() {
        let state = state_with(Ok(Recognition::NoText));
        let response = match extract_image(State(state), Bytes::from_static(b"img")).await {
            Ok(response) => response,
            Err(err) => panic!("unexpected error: {}", err.message),
        };
        assert_eq!(body_json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_bad_gateway() {
        let state = state_with(Err("quota exceeded".to_owned()));
        let err = extract_image(State(state), Bytes::from_static(b"img"))
            .await
            .err()
            .expect("expected AppError");
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(err.message.contains("quota exceeded"));
    }

    #[test]
    fn params_defaults_leave_ocr_disabled() -> anyhow::Result<()> {
        let params = Params {
            api_key: None,
            access_token: None,
            ..Params::try_parse_from(["rollcall-server"])?
        };
        assert_eq!(params.port, 8080);
        assert_eq!(params.endpoint, DEFAULT_VISION_ENDPOINT);
        assert!(credentials(&params)?.is_none());
        assert!(build_recognizer(&params)?.is_none());
        Ok(())
    }

    #[test]
    fn token_flag_enables_ocr() -> anyhow::Result<()> {
        let params = Params {
            api_key: None,
            ..Params::try_parse_from(["rollcall-server", "--access-token", "t"])?
        };
        assert_eq!(
            credentials(&params)?,
            Some(Credentials::BearerToken("t".to_owned()))
        );
        Ok(())
    }
}
