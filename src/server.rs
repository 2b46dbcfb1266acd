//! JSON HTTP API for the response engine.
//!
//! # Endpoints
//!
//! | Method   | Path              | Description |
//! |----------|-------------------|-------------|
//! | `POST`   | `/chat`           | Generate a reply for a message |
//! | `POST`   | `/corpus/refresh` | Force an immediate corpus reload |
//! | `GET`    | `/stats/matches`  | Top intents by lexical match count |
//! | `POST`   | `/documents`      | Ingest documents into the knowledge base |
//! | `DELETE` | `/documents`      | Clear the knowledge base |
//! | `GET`    | `/documents/stats`| Knowledge base document count |
//! | `GET`    | `/health`         | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embeddings_disabled` (400),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! chat clients.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::cascade::ResponseEngine;
use crate::config::Config;
use crate::error::InputError;
use crate::models::{ChatContext, ChatMessage, Document, DocumentMetadata, EngineReply};
use crate::stats::IntentMatchStats;
use crate::vector_store::StoreStats;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    engine: Arc<ResponseEngine>,
}

/// Starts the HTTP server.
///
/// Builds the engine from configuration, binds to `[server].bind`, and
/// serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(ResponseEngine::from_config(config)?);
    run_server_with_engine(&config.server.bind, engine).await
}

/// Starts the HTTP server around an already-built engine. Useful for
/// embedding the API in a larger binary with a custom classifier or
/// embedding provider.
pub async fn run_server_with_engine(
    bind_addr: &str,
    engine: Arc<ResponseEngine>,
) -> anyhow::Result<()> {
    let state = AppState { engine };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(handle_chat))
        .route("/corpus/refresh", post(handle_corpus_refresh))
        .route("/stats/matches", get(handle_match_stats))
        .route("/documents", post(handle_ingest).delete(handle_clear))
        .route("/documents/stats", get(handle_store_stats))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!(addr = bind_addr, "server listening");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
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
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<InputError> for AppError {
    fn from(e: InputError) -> Self {
        bad_request(e.to_string())
    }
}

/// Maps management-operation failures to the most appropriate status.
/// Missing-embedding ingests are a client problem, not a server fault.
fn classify_engine_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("no embedding provider") {
        let mut e = bad_request(msg);
        e.code = "embeddings_disabled".to_string();
        e
    } else {
        internal(msg)
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

/// JSON request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    /// Caller profile (goal, plan_type, dietary preference, ...).
    #[serde(default)]
    profile: HashMap<String, String>,
    /// Prior turns, oldest first.
    #[serde(default)]
    history: Vec<ChatMessage>,
}

/// Handler for `POST /chat`.
///
/// Returns `400` for invalid input (empty, too long, unsafe content);
/// every other failure is absorbed by the cascade and still yields a
/// `200` with a fallback reply.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<EngineReply>, AppError> {
    let mut ctx = ChatContext {
        user_id: req.user_id,
        session_id: req.session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        profile: req.profile,
    };
    ctx.profile.retain(|_, v| !v.is_empty());

    let reply = state
        .engine
        .generate_response(&req.message, &ctx, &req.history)
        .await?;

    Ok(Json(reply))
}

// ============ POST /corpus/refresh ============

/// JSON response body for `POST /corpus/refresh`.
#[derive(Serialize)]
struct RefreshResponse {
    intents: usize,
}

/// Handler for `POST /corpus/refresh`. Fails with `500` when the
/// corpus source cannot be read; the cached snapshot is left in place.
async fn handle_corpus_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let corpus = state
        .engine
        .refresh_corpus_cache()
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(RefreshResponse {
        intents: corpus.intents.len(),
    }))
}

// ============ GET /stats/matches ============

/// JSON response body for `GET /stats/matches`.
#[derive(Serialize)]
struct MatchStatsResponse {
    intents: Vec<IntentMatchStats>,
}

async fn handle_match_stats(State(state): State<AppState>) -> Json<MatchStatsResponse> {
    Json(MatchStatsResponse {
        intents: state.engine.match_statistics(),
    })
}

// ============ POST /documents ============

/// One document in a `POST /documents` request. The embedding is
/// optional; missing embeddings are computed server-side when an
/// embedding provider is configured.
#[derive(Deserialize)]
struct DocumentPayload {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(default)]
    metadata: DocumentMetadata,
    #[serde(default)]
    embedding: Vec<f32>,
}

/// JSON request body for `POST /documents`.
#[derive(Deserialize)]
struct IngestRequest {
    documents: Vec<DocumentPayload>,
}

/// JSON response body for `POST /documents`.
#[derive(Serialize)]
struct IngestResponse {
    stored: usize,
}

/// Handler for `POST /documents`.
///
/// Returns `400` when the batch is empty, a document text is empty, or
/// embeddings are required but disabled.
async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    if req.documents.is_empty() {
        return Err(bad_request("documents must not be empty"));
    }
    if req.documents.iter().any(|d| d.text.trim().is_empty()) {
        return Err(bad_request("document text must not be empty"));
    }

    let docs: Vec<Document> = req
        .documents
        .into_iter()
        .map(|d| Document {
            id: d.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text: d.text,
            metadata: d.metadata,
            embedding: d.embedding,
        })
        .collect();

    let stored = state
        .engine
        .ingest(docs)
        .await
        .map_err(classify_engine_error)?;

    Ok(Json(IngestResponse { stored }))
}

// ============ DELETE /documents ============

/// JSON response body for `DELETE /documents`.
#[derive(Serialize)]
struct ClearResponse {
    cleared: bool,
}

async fn handle_clear(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    state
        .engine
        .clear_knowledge_base()
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(ClearResponse { cleared: true }))
}

// ============ GET /documents/stats ============

async fn handle_store_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.engine.store_stats())
}
