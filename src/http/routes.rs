use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::classify::Mode;
use crate::error::RunError;
use crate::export::Exporter;
use crate::run::{IngestOutcome, RunConfig, RunController, StatusSnapshot};
use crate::sample::{Sample, RX_CHANNELS};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RunController>,
    pub exporter: Exporter,
}

impl AppState {
    pub fn new(controller: Arc<RunController>, exporter: Exporter) -> Self {
        Self {
            controller,
            exporter,
        }
    }
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    BadRequest(String),
    NotFound(&'static str),
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

/// Generic acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Start request as posted by the rig UI. Numeric fields arrive as JSON
/// numbers or numeric strings depending on the client, so they are accepted
/// as raw values and parsed leniently.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub classification_type: String,
    pub cycles: serde_json::Value,
    pub duration: serde_json::Value,
    #[serde(default)]
    pub soft_threshold: Option<serde_json::Value>,
    #[serde(default)]
    pub fresh_threshold: Option<serde_json::Value>,
}

/// Push-ingestion payload from the rig.
#[derive(Debug, Deserialize)]
pub struct SamplePayload {
    pub time: f64,
    pub tx: f64,
    pub rx: Vec<f64>,
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub run_active: bool,
    pub uptime_ms: u64,
    pub discarded_samples: u64,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/stop", get(stop))
        .route("/status", get(status))
        .route("/api/post", post(post_sample))
        .route("/download_all", get(download_all))
        .route("/download_touch", get(download_touch))
        .route("/download_untouch", get(download_untouch))
        .route("/plot", get(plot))
        .route("/health", get(health))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving HTTP router")?;
    Ok(())
}

const INVALID_NUMBER_MESSAGE: &str = "Invalid number format for configuration parameters.";

/// Parse an integer that may arrive as a JSON number or a numeric string.
fn parse_numeric(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn required_numeric(value: &serde_json::Value) -> Result<i64, HttpServerError> {
    parse_numeric(value)
        .ok_or_else(|| HttpServerError::BadRequest(INVALID_NUMBER_MESSAGE.to_string()))
}

fn optional_numeric(value: Option<&serde_json::Value>) -> Result<Option<i64>, HttpServerError> {
    value.map(required_numeric).transpose()
}

pub async fn start(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpServerError> {
    let Json(request) = payload
        .map_err(|err| HttpServerError::BadRequest(format!("Malformed JSON body: {}", err)))?;

    let mode = Mode::from_wire(&request.classification_type).ok_or_else(|| {
        HttpServerError::BadRequest(format!(
            "Unknown classification type: {}",
            request.classification_type
        ))
    })?;

    let cycles_raw = required_numeric(&request.cycles)?;
    let duration_raw = required_numeric(&request.duration)?;
    if cycles_raw < 0 || duration_raw < 0 {
        return Err(HttpServerError::BadRequest(INVALID_NUMBER_MESSAGE.to_string()));
    }

    let threshold = match mode {
        Mode::SoftHard => optional_numeric(request.soft_threshold.as_ref())?,
        Mode::FreshRotten => optional_numeric(request.fresh_threshold.as_ref())?,
    }
    .map(|v| v as f64)
    .unwrap_or_else(|| mode.default_threshold());

    let config = RunConfig {
        cycles: u32::try_from(cycles_raw)
            .map_err(|_| HttpServerError::BadRequest(INVALID_NUMBER_MESSAGE.to_string()))?,
        phase_duration: std::time::Duration::from_secs(duration_raw as u64),
        mode,
        threshold,
    };

    state.controller.start(config).map_err(|err| match err {
        RunError::InvalidConfig { .. } | RunError::AlreadyActive => {
            HttpServerError::BadRequest(err.to_string())
        }
        RunError::LockPoisoned { .. } => HttpServerError::Internal(err.to_string()),
    })?;

    Ok(MessageResponse::new("Test started..."))
}

pub async fn stop(State(state): State<AppState>) -> Json<MessageResponse> {
    state.controller.stop();
    MessageResponse::new("Stopping...")
}

pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.controller.status())
}

pub async fn post_sample(
    State(state): State<AppState>,
    payload: Result<Json<SamplePayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpServerError> {
    let Json(payload) =
        payload.map_err(|_| HttpServerError::BadRequest("Malformed JSON data.".to_string()))?;

    if payload.rx.len() != RX_CHANNELS {
        return Err(HttpServerError::BadRequest(
            "Invalid 'rx' array format or length (expected 7).".to_string(),
        ));
    }

    let mut rx = [0.0; RX_CHANNELS];
    rx.copy_from_slice(&payload.rx);

    match state
        .controller
        .ingest(Sample::new(payload.time, payload.tx, rx))
    {
        IngestOutcome::Stored => Ok(MessageResponse::new("Data received successfully.")),
        IngestOutcome::Discarded => Ok(MessageResponse::new("Data collection not active.")),
    }
}

pub async fn download_all(
    State(state): State<AppState>,
) -> Result<Response, HttpServerError> {
    serve_file(
        state.exporter.all_csv_path(),
        "text/csv",
        Some("all_sensor_data.csv"),
        "All Data CSV not found. Please ensure a test has run successfully.",
    )
    .await
}

pub async fn download_touch(
    State(state): State<AppState>,
) -> Result<Response, HttpServerError> {
    serve_file(
        state.exporter.touch_csv_path(),
        "text/csv",
        Some("touch_sensor_data.csv"),
        "Touch Data CSV not found. Please ensure a test has run successfully.",
    )
    .await
}

pub async fn download_untouch(
    State(state): State<AppState>,
) -> Result<Response, HttpServerError> {
    serve_file(
        state.exporter.untouch_csv_path(),
        "text/csv",
        Some("untouch_sensor_data.csv"),
        "Untouch Data CSV not found. Please ensure a test has run successfully.",
    )
    .await
}

pub async fn plot(State(state): State<AppState>) -> Result<Response, HttpServerError> {
    serve_file(
        state.exporter.plot_path(),
        "image/png",
        None,
        "Plot not found. Please ensure a test has run successfully.",
    )
    .await
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        run_active: state.controller.is_active(),
        uptime_ms: state.controller.uptime_ms(),
        discarded_samples: state.controller.discarded_samples(),
    })
}

async fn serve_file(
    path: PathBuf,
    content_type: &'static str,
    download_name: Option<&'static str>,
    missing_message: &'static str,
) -> Result<Response, HttpServerError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| HttpServerError::NotFound(missing_message))?;

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        bytes,
    )
        .into_response();

    if let Some(name) = download_name {
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name))
            .map_err(|err| HttpServerError::Internal(err.to_string()))?;
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}
