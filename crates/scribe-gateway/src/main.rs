//! Axum transcription gateway entry point. Config-driven via GatewayConfig;
//! the STT client and the transcript archive are constructed here and
//! injected through AppState.

use scribe_gateway::{build_app, AppState, GatewayConfig, TranscriptStore, GATEWAY_VERSION};
use scribe_stt::{create_best_stt, SttBackend};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pre-flight check: verify the transcript DB opens and the port is free.
fn run_verify() -> Result<(), String> {
    let config = GatewayConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking transcript DB... ");
    let store = TranscriptStore::new(config.transcripts_db_path())
        .map_err(|e| format!("Transcript DB inaccessible: {}", e))?;
    drop(store);
    println!("OK");

    print!("Checking port {}... ", config.port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} blocked: {}", config.port, e));
        }
    }

    println!("\nAll checks passed. Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env first. The provider API key stays in the backend only; the
    // frontend is a stateless client and never receives it.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!(
            "[scribe-gateway] .env not loaded: {} (using system environment)",
            e
        );
    }
    if std::env::var("STT_API_KEY").is_err() {
        eprintln!("[scribe-gateway] Hint: set STT_API_KEY in .env for real transcription; without it uploads get placeholder text.");
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("Pre-flight failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match GatewayConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Config load failed: {}", e);
            std::process::exit(1);
        }
    };

    let stt: Arc<dyn SttBackend> = match create_best_stt() {
        Ok(b) => Arc::from(b),
        Err(e) => {
            tracing::error!("STT init failed: {}", e);
            std::process::exit(1);
        }
    };

    let transcripts = if config.persistence_enabled {
        match TranscriptStore::new(config.transcripts_db_path()) {
            Ok(s) => Some(Arc::new(s)),
            Err(e) => {
                tracing::warn!(
                    "Transcript archive unavailable, continuing without persistence: {}",
                    e
                );
                None
            }
        }
    } else {
        None
    };

    let app = build_app(AppState {
        config: Arc::clone(&config),
        stt,
        transcripts,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("{} v{} listening on {}", config.app_name, GATEWAY_VERSION, addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown initiated (Ctrl+C received)");
        }
    }
}
