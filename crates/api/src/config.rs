use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use genesis_fal::FalConfig;
use genesis_pipeline::OrchestratorConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root that generated artifacts are written to.
    pub output_dir: PathBuf,
    /// Upload directory, created at startup.
    pub uploads_dir: PathBuf,
    /// Static frontend served for non-API paths.
    pub static_dir: PathBuf,
    pub database_url: String,
    pub fal_key: Option<String>,
    pub fal_model_id: String,
    pub fal_queue_url: String,
    pub fal_poll_interval_ms: u64,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Deadline on the remote generation call, in seconds.
    pub generation_timeout_secs: u64,
    /// Generation requests allowed per client IP per window.
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                                |
    /// |---------------------------|----------------------------------------|
    /// | `HOST`                    | `0.0.0.0`                              |
    /// | `PORT`                    | `3000`                                 |
    /// | `CORS_ORIGINS`            | `http://localhost:3000`                |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                                   |
    /// | `OUTPUT_DIR`              | `./generated`                          |
    /// | `UPLOADS_DIR`             | `./uploads`                            |
    /// | `STATIC_DIR`              | `../frontend/public`                   |
    /// | `DATABASE_URL`            | `sqlite://generated/jobs.db?mode=rwc`  |
    /// | `FAL_KEY`                 | unset                                  |
    /// | `FAL_MODEL_ID`            | `fal-ai/ltx-video`                     |
    /// | `FAL_QUEUE_URL`           | `https://queue.fal.run`                |
    /// | `FAL_POLL_INTERVAL_MS`    | `1000`                                 |
    /// | `OPENAI_API_KEY`          | unset                                  |
    /// | `OPENAI_MODEL`            | `gpt-3.5-turbo`                        |
    /// | `GENERATION_TIMEOUT_SECS` | `900`                                  |
    /// | `RATE_LIMIT_MAX`          | `10`                                   |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `900`                                  |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            output_dir: env_or("OUTPUT_DIR", "./generated").into(),
            uploads_dir: env_or("UPLOADS_DIR", "./uploads").into(),
            static_dir: env_or("STATIC_DIR", "../frontend/public").into(),
            database_url: env_or("DATABASE_URL", "sqlite://generated/jobs.db?mode=rwc"),
            fal_key: env_opt("FAL_KEY"),
            fal_model_id: env_or("FAL_MODEL_ID", genesis_fal::api::DEFAULT_MODEL_ID),
            fal_queue_url: env_or("FAL_QUEUE_URL", genesis_fal::api::DEFAULT_QUEUE_URL),
            fal_poll_interval_ms: env_parse("FAL_POLL_INTERVAL_MS", 1000),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", genesis_pipeline::enhance::DEFAULT_OPENAI_MODEL),
            generation_timeout_secs: env_parse("GENERATION_TIMEOUT_SECS", 900),
            rate_limit_max: env_parse("RATE_LIMIT_MAX", 10),
            rate_limit_window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", 900),
        }
    }

    pub fn fal_config(&self) -> FalConfig {
        FalConfig {
            api_key: self.fal_key.clone(),
            model_id: self.fal_model_id.clone(),
            queue_url: self.fal_queue_url.clone(),
            poll_interval: Duration::from_millis(self.fal_poll_interval_ms),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            ..OrchestratorConfig::default()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values are both `None`.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a numeric variable, panicking at startup on garbage.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
