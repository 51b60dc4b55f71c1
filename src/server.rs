//! HTTP front-end: upload documents, then chat against them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::pipeline::Pipeline;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const NO_DOCUMENTS: &str = "Please upload documents first.";

pub struct AppState {
    pub pipeline: Pipeline,
    pub upload_dir: PathBuf,
    documents_loaded: AtomicBool,
}

impl AppState {
    pub fn new(pipeline: Pipeline, upload_dir: PathBuf) -> Self {
        Self {
            pipeline,
            upload_dir,
            documents_loaded: AtomicBool::new(false),
        }
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    files: Vec<String>,
    documents: usize,
    chunks_stored: usize,
    skipped: Vec<String>,
    failures: Vec<String>,
}

/// Errors leave handlers as `{"status": "error", "message": ...}`.
struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: anyhow::anyhow!(message.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "status": "error",
                "message": format!("{:#}", self.error),
            })),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: e.into(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/chat", post(chat))
        .route("/session", delete(clear_session))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<AppState>) -> Result<()> {
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", state.upload_dir.display()))?;
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Server running on http://{bind}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().and_then(sanitize_file_name) else {
            continue;
        };
        let data = field.bytes().await?;
        tokio::fs::write(state.upload_dir.join(&name), &data).await?;
        files.push(name);
    }
    if files.is_empty() {
        return Err(AppError::bad_request("no files in upload"));
    }

    let report = state.pipeline.ingest(&state.upload_dir).await?;
    state.documents_loaded.store(true, Ordering::SeqCst);
    Ok(Json(UploadResponse {
        status: "success",
        files,
        documents: report.documents,
        chunks_stored: report.chunks_stored,
        skipped: report.skipped.iter().map(|p| p.display().to_string()).collect(),
        failures: report
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.path.display(), f.error))
            .collect(),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if !state.documents_loaded.load(Ordering::SeqCst) {
        return Ok(Json(ChatResponse {
            answer: NO_DOCUMENTS.to_string(),
        }));
    }
    let answer = state.pipeline.answer(&payload.query).await?;
    Ok(Json(ChatResponse { answer }))
}

/// Removes uploaded files. Vectors already stored stay in the collection.
async fn clear_session(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, AppError> {
    let mut removed = 0;
    if state.upload_dir.is_dir() {
        let mut entries = tokio::fs::read_dir(&state.upload_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
    }
    state.documents_loaded.store(false, Ordering::SeqCst);
    Ok(Json(serde_json::json!({ "status": "success", "removed": removed })))
}

/// Keeps only the final path component so uploads cannot escape the upload directory.
fn sanitize_file_name(name: &str) -> Option<String> {
    let name = Path::new(name).file_name()?.to_str()?;
    (!name.starts_with('.')).then(|| name.to_string())
}
