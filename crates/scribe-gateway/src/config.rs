//! Gateway configuration: defaults, optional TOML file, `SCRIBE__*` env
//! overrides. Read once at process start and injected via AppState.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Global gateway configuration. Load from TOML or env.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Application identity used in startup logs.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for the upload scratch space and the transcript DB.
    pub storage_path: String,
    /// If true, serve the static UI from `frontend/`. (Config alias: `ui_enabled`)
    #[serde(default, alias = "ui_enabled")]
    pub frontend_enabled: bool,
    /// If true, archive transcripts to SQLite under storage_path.
    #[serde(default = "default_true")]
    pub persistence_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl GatewayConfig {
    /// Load config from file and environment. Precedence: env `SCRIBE_CONFIG`
    /// path > `config/gateway.toml` > defaults; `SCRIBE__*` env vars win overall.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SCRIBE_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Scribe Gateway")?
            .set_default("port", 4000_i64)?
            .set_default("storage_path", "./data")?
            .set_default("frontend_enabled", true)?
            .set_default("persistence_enabled", true)?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("SCRIBE").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// Scratch directory for temporary upload artifacts.
    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage_path).join("uploads")
    }

    /// Path of the transcript archive DB.
    pub fn transcripts_db_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_path)
            .join("scribe_transcripts")
            .join("transcripts.sqlite")
    }
}
