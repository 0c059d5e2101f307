use axum::{
    Router,
    body::Bytes,
    extract::Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tokio::{io::AsyncReadExt, net::TcpListener};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::{BatchRequest, BatchResult, CalcError, compute, parse_request};

pub const DEFAULT_LOG_FILTER: &str = "homecalc=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "homecalc",
    about = "Home purchase cost and resale projections for Spain and Denmark"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_FILTER,
        help = "tracing filter used when RUST_LOG is not set"
    )]
    pub log_filter: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
    #[command(about = "Compute one batch request and print the result as JSON")]
    Compute {
        #[arg(help = "Path to a batch request JSON file, or - for stdin")]
        input: String,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        match err {
            CalcError::Internal(msg) => ApiError::Internal(msg),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Io(_) | ApiError::Json(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, &self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct PingResponse {
    message: &'static str,
}

pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ping", get(ping_handler))
        .route("/api/calculate", post(calculate_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(host: &str, port: u16) -> Result<(), ApiError> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!("homecalc HTTP API listening on http://{addr}");

    axum::serve(listener, router()).await?;
    Ok(())
}

pub async fn run_compute(input: &str, pretty: bool) -> Result<String, ApiError> {
    let json = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(Path::new(input)).await?
    };
    let result = compute_batch(parse_request(&json)?).await?;
    let out = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    Ok(out)
}

async fn compute_batch(request: BatchRequest) -> Result<BatchResult, ApiError> {
    let result = tokio::task::spawn_blocking(move || compute(&request))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let failures = result
        .scenarios
        .iter()
        .filter(|s| s.error().is_some())
        .count();
    info!(
        scenarios = result.scenarios.len(),
        failures, "batch computed"
    );
    Ok(result)
}

async fn ping_handler() -> Response {
    json_response(
        StatusCode::OK,
        PingResponse {
            message: "Backend is running",
        },
    )
}

async fn calculate_handler(body: Bytes) -> Result<Response, ApiError> {
    let json = std::str::from_utf8(&body)
        .map_err(|e| ApiError::BadRequest(format!("request body is not valid UTF-8: {e}")))?;
    let request =
        parse_request(json).inspect_err(|err| warn!(error = %err, "rejected batch request"))?;
    let result = compute_batch(request).await?;
    Ok(json_response(StatusCode::OK, result))
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
