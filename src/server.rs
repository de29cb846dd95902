//! HTTP surface for the document Q&A pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload` | Multipart document upload: extract, embed, index |
//! | `GET`  | `/search` | Semantic search (`query`, optional `min_score`) |
//! | `GET`  | `/chat` | Answer a question from retrieved documents |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "unsupported_file_type", "message": "..." } }
//! ```
//!
//! Codes: `unsupported_file_type` (400), `extraction_failed` (400),
//! `bad_request` (400), `service_unavailable` (503),
//! `invalid_upstream_response` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::store::SearchMatch;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server. Runs until the process is terminated.
pub async fn run_server(bind: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let app = router(pipeline);

    tracing::info!(bind, "docqa listening");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the route table. Split out from [`run_server`] for tests.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(handle_upload))
        .route("/search", get(handle_search))
        .route("/chat", get(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (status, code) = match &err {
            PipelineError::UnsupportedFileType { .. } => {
                (StatusCode::BAD_REQUEST, "unsupported_file_type")
            }
            PipelineError::ExtractionFailed { .. } => {
                (StatusCode::BAD_REQUEST, "extraction_failed")
            }
            PipelineError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            PipelineError::InvalidResponse { .. } => {
                (StatusCode::BAD_GATEWAY, "invalid_upstream_response")
            }
            PipelineError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

/// Handler for `POST /upload`.
///
/// Reads the multipart field named `file`, persists and indexes its
/// content, and acknowledges. The filename becomes the index record id.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.to_string()))?;

        state.pipeline.ingest(&filename, &bytes).await?;

        return Ok(Json(UploadResponse {
            message: "Document processed and indexed!".to_string(),
        }));
    }

    Err(bad_request("multipart field 'file' is required"))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    min_score: Option<f32>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchMatch>,
}

/// Handler for `GET /search`.
///
/// Returns top-k matches at or above `min_score` (default from config, 0.60)
/// in descending similarity order.
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let min_score = params
        .min_score
        .unwrap_or_else(|| state.pipeline.default_min_score());

    let results = state.pipeline.search(&params.query, min_score).await?;
    Ok(Json(SearchResponse { results }))
}

// ============ GET /chat ============

#[derive(Deserialize)]
struct ChatParams {
    query: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

/// Handler for `GET /chat`.
async fn handle_chat(
    State(state): State<AppState>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatResponse>, AppError> {
    let answer = state.pipeline.chat(&params.query).await?;
    Ok(Json(ChatResponse { answer }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_file_type_maps_to_400() {
        let err = AppError::from(PipelineError::UnsupportedFileType {
            extension: "csv".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "unsupported_file_type");
    }

    #[test]
    fn extraction_failure_maps_to_400() {
        let err = AppError::from(PipelineError::ExtractionFailed {
            filename: "broken.pdf".to_string(),
            message: "bad xref".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "extraction_failed");
    }

    #[test]
    fn service_failure_maps_to_503() {
        let err = AppError::from(PipelineError::unavailable("embedding", "connection refused"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "service_unavailable");
        assert!(err.message.contains("connection refused"));
    }
}
