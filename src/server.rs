//! HTTP API.
//!
//! Serves the same pipeline as the CLI: one upload per `POST /ingest`,
//! and a request/response pair per question.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/ingest` | Raw document bytes; `Content-Type` picks the extractor |
//! | `POST` | `/search` | `{ "query", "k"? }` → ranked evidence |
//! | `POST` | `/ask` | `{ "question", "k"? }` → answer plus evidence |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "empty_query", "message": "question must not be empty" } }
//! ```
//!
//! `code` is the pipeline's error kind. Configuration and input problems
//! are 400, an empty document is 422, and collaborator failures
//! (embedding, index, LLM) are 502. A failed `/ask` whose retrieval
//! succeeded also carries the `evidence` array.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_core::models::{Answer, ScoredCandidate};
use docqa_core::{ErrorKind, QaPipeline, RagError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::extract::MIME_TEXT;
use crate::ingest::ingest_bytes;
use crate::pipeline::build_pipeline;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pipeline: Arc<QaPipeline>,
}

/// Build the pipeline and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pipeline = build_pipeline(config).await?;
    let app = router(Arc::new(config.clone()), Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind = %bind_addr, "server listening");
    println!("docqa server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(config: Arc<Config>, pipeline: Arc<QaPipeline>) -> Router {
    let body_limit = usize::try_from(config.index.max_document_bytes).unwrap_or(usize::MAX);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ingest", post(handle_ingest))
        .route("/search", post(handle_search))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(AppState { config, pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    evidence: Option<Vec<ScoredCandidate>>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    evidence: Option<Vec<ScoredCandidate>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
            evidence: self.evidence,
        };
        (self.status, Json(body)).into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ConfigurationMissing | ErrorKind::InvalidConfig | ErrorKind::EmptyQuery => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::DocumentEmpty | ErrorKind::ExtractionFailure => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::EmbeddingFailure | ErrorKind::IndexFailure | ErrorKind::SynthesisFailure => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            warn!(code = kind.as_str(), error = %err, "request failed");
        }
        AppError {
            status,
            code: kind.as_str().to_string(),
            message: err.to_string(),
            evidence: err.evidence().map(|e| e.to_vec()),
        }
    }
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

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestParams {
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    document_id: String,
    chunks: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(MIME_TEXT)
        .to_string();
    let source = params.source.unwrap_or_else(|| "http".to_string());

    let report = ingest_bytes(&state.pipeline, &state.config, &source, &content_type, &body).await?;
    Ok(Json(IngestResponse {
        document_id: report.document_id,
        chunks: report.chunks,
    }))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ScoredCandidate>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(RagError::EmptyQuery.into());
    }
    let k = req.k.unwrap_or(state.config.retrieval.k);
    let results = state.pipeline.retrieve_k(&req.query, k).await?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    k: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, AppError> {
    let k = req.k.unwrap_or(state.config.retrieval.k);
    let answer = state.pipeline.answer_k(&req.question, k).await?;
    Ok(Json(answer))
}
