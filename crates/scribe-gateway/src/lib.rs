//! scribe-gateway: axum HTTP surface for browser speech-to-text.
//!
//! One synchronous request/response cycle per transcription attempt: the UI
//! posts a multipart upload, the gateway forwards the bytes to the injected
//! `SttBackend`, optionally archives the transcript, and returns JSON. All
//! clients are constructed at startup and passed in through `AppState`;
//! no module-level singletons.

pub mod config;
pub mod transcribe;
pub mod transcripts;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use scribe_stt::SttBackend;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

pub use config::GatewayConfig;
pub use transcripts::TranscriptStore;

/// Gateway version from Cargo.toml.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared request context: explicitly constructed, dependency-injected
/// clients. Requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Speech-to-text provider client (placeholder when unconfigured).
    pub stt: Arc<dyn SttBackend>,
    /// Transcript archive; None when persistence is disabled.
    pub transcripts: Option<Arc<TranscriptStore>>,
}

/// GET /api/v1/health – liveness check.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": GATEWAY_VERSION,
    }))
}

/// Root directory for the static UI. Prefer a working-directory relative
/// path for local development (run from workspace root); fall back to the
/// workspace-root-relative path from crates/scribe-gateway.
fn frontend_root_dir() -> std::path::PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let from_cwd = cwd.join("frontend");
    if from_cwd.exists() {
        return from_cwd;
    }

    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("frontend")
}

pub fn build_app(state: AppState) -> Router {
    let frontend_enabled = state.config.frontend_enabled;

    // CORS: allow localhost UI dev ports so a separately-served frontend can
    // reach the API during development.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &axum::http::HeaderValue, _| {
            let s = origin.to_str().unwrap_or("");
            if s == "http://localhost:3000" || s == "http://127.0.0.1:3000" {
                return true;
            }
            let port = s
                .split(':')
                .last()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(0);
            (3000..=3099).contains(&port) || (5173..=5180).contains(&port)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    let mut app = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/transcribe", post(transcribe::transcribe_post))
        .route("/api/upload", post(transcribe::upload_post))
        .route("/api/transcripts", get(transcribe::transcripts_list_get))
        // MediaRecorder clips routinely exceed axum's 2 MB default body cap.
        .layer(axum::extract::DefaultBodyLimit::max(25 * 1024 * 1024))
        .with_state(state);

    if frontend_enabled {
        let frontend_dir = frontend_root_dir();
        let index_file = frontend_dir.join("index.html");

        // Map `/` -> `frontend/index.html`, `/ui/*` -> `frontend/*`.
        app = app.route_service("/", ServeFile::new(index_file));
        app = app.nest_service("/ui", ServeDir::new(frontend_dir));
    }

    app.layer(cors)
}
