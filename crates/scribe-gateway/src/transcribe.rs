//! Transcription endpoint: multipart upload → STT provider → optional archive.
//!
//! POST /api/transcribe accepts one multipart file field named "audio" and responds `{"text": ...}`.
//! POST /api/upload is the legacy alias with the `{"success": true, "transcription": {...}}` envelope.
//! GET /api/transcripts lists archived records, newest first.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use scribe_stt::NO_SPEECH_PLACEHOLDER;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::transcripts::TranscriptRow;
use crate::AppState;

/// Request-flow failures surfaced to the client. Archive failures are not
/// listed: those are logged and the request still succeeds (see `archive`).
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("No audio file uploaded (multipart field \"audio\" is required)")]
    MissingUpload,

    #[error("Transcription provider failed: {0}")]
    Provider(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl TranscribeError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingUpload => StatusCode::BAD_REQUEST,
            Self::Provider(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcome of one upload: final transcript text plus the archived row when
/// persistence is on and the write succeeded.
struct TranscribeOutcome {
    text: String,
    record: Option<TranscriptRow>,
}

/// POST /api/transcribe: multipart field "audio"; responds `{"text": ...}`.
pub async fn transcribe_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    match run_transcription(&state, &mut multipart).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({ "text": outcome.text })),
        ),
        Err(e) => {
            tracing::warn!(target: "scribe::gateway", "Transcription request failed: {}", e);
            (
                e.status(),
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}

/// POST /api/upload: same flow, response envelope kept for older clients:
/// `{"success": true, "transcription": {"id", "filename", "text", "created_at_ms"}}`.
pub async fn upload_post(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    match run_transcription(&state, &mut multipart).await {
        Ok(outcome) => {
            let transcription = match outcome.record {
                Some(row) => serde_json::json!({
                    "id": row.id,
                    "filename": row.filename,
                    "text": row.text,
                    "created_at_ms": row.created_at_ms,
                }),
                None => serde_json::json!({ "text": outcome.text }),
            };
            (
                StatusCode::OK,
                Json(serde_json::json!({ "success": true, "transcription": transcription })),
            )
        }
        Err(e) => {
            tracing::warn!(target: "scribe::gateway", "Upload request failed: {}", e);
            (
                e.status(),
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

/// The request flow: Received → temp artifact → Transcribing → {Persisting} →
/// outcome. The temp artifact is removed on success and failure paths alike.
async fn run_transcription(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<TranscribeOutcome, TranscribeError> {
    let (filename, bytes) = read_audio_field(multipart).await?;
    tracing::info!(target: "scribe::gateway", "Received {} ({} bytes)", filename, bytes.len());

    let temp_path = write_temp_upload(&state.config.uploads_dir(), &filename, &bytes)?;
    let result = state.stt.transcribe(bytes, &filename).await;
    remove_temp_upload(&temp_path);

    let transcript = result.map_err(|e| TranscribeError::Provider(e.to_string()))?;
    let text = if transcript.trim().is_empty() {
        NO_SPEECH_PLACEHOLDER.to_string()
    } else {
        transcript
    };

    let record = archive(state, &filename, &text).await;
    Ok(TranscribeOutcome { text, record })
}

/// Pull the "audio" file field out of the multipart body.
async fn read_audio_field(
    multipart: &mut Multipart,
) -> Result<(String, Vec<u8>), TranscribeError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TranscribeError::Unexpected(format!("multipart read: {}", e)))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "recording.webm".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| TranscribeError::Unexpected(format!("multipart read: {}", e)))?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(TranscribeError::MissingUpload)
}

/// Write the upload to `<storage>/uploads/<uuid>-<filename>`.
fn write_temp_upload(
    uploads_dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, TranscribeError> {
    std::fs::create_dir_all(uploads_dir)
        .map_err(|e| TranscribeError::Unexpected(format!("uploads dir: {}", e)))?;
    // Client-supplied names must not escape the uploads dir.
    let safe_name = filename.replace(['/', '\\'], "_");
    let path = uploads_dir.join(format!("{}-{}", uuid::Uuid::new_v4(), safe_name));
    std::fs::write(&path, bytes)
        .map_err(|e| TranscribeError::Unexpected(format!("temp write: {}", e)))?;
    Ok(path)
}

fn remove_temp_upload(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(target: "scribe::gateway", "Temp upload cleanup failed for {}: {}", path.display(), e);
    }
}

/// Best-effort archive write; failure is logged and the transcript still
/// returns to the caller.
async fn archive(state: &AppState, filename: &str, text: &str) -> Option<TranscriptRow> {
    let store = Arc::clone(state.transcripts.as_ref()?);
    let filename = filename.to_string();
    let text = text.to_string();
    match tokio::task::spawn_blocking(move || store.insert(&filename, &text)).await {
        Ok(Ok(row)) => Some(row),
        Ok(Err(e)) => {
            tracing::warn!(target: "scribe::gateway", "Transcript archive write failed: {}", e);
            None
        }
        Err(e) => {
            tracing::warn!(target: "scribe::gateway", "Transcript archive task failed: {}", e);
            None
        }
    }
}

#[derive(serde::Deserialize)]
pub struct TranscriptsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/transcripts?limit=N: archived records, newest first. Empty list
/// when persistence is disabled.
pub async fn transcripts_list_get(
    State(state): State<AppState>,
    Query(q): Query<TranscriptsQuery>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(store) = state.transcripts.as_ref() else {
        return (
            StatusCode::OK,
            Json(serde_json::json!({ "transcripts": [] })),
        );
    };
    let store = Arc::clone(store);
    let limit = q.limit.unwrap_or(50).min(500);
    match tokio::task::spawn_blocking(move || store.list(limit)).await {
        Ok(Ok(rows)) => {
            let rows: Vec<serde_json::Value> = rows.iter().map(row_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "transcripts": rows })),
            )
        }
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Archive read: {}", e) })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": format!("Archive task: {}", e) })),
        ),
    }
}

/// Row as API JSON: raw millis plus an RFC 3339 `created_at` for the UI.
fn row_json(row: &TranscriptRow) -> serde_json::Value {
    let created_at = chrono::DateTime::from_timestamp_millis(row.created_at_ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    serde_json::json!({
        "id": row.id,
        "filename": row.filename,
        "text": row.text,
        "created_at_ms": row.created_at_ms,
        "created_at": created_at,
    })
}
