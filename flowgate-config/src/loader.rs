use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Config, ConfigMetadata, PlanCatalogSource};

/// Failures while loading configuration from the environment. Distinct from
/// `AdmissionError` in `flowgate-core`: these are startup-time failures, not
/// per-request refusals.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigLoadError>;

/// Loads configuration from `.env` (if present) plus `FLOWGATE_`-prefixed
/// environment variables, falling back to `Config::default()` for anything
/// unset. Uses a `dotenvy` + manual-parse loader: no external format crate,
/// every field has an explicit documented default.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load() -> Result<Config> {
        let env_file_loaded = dotenvy::dotenv().is_ok();
        if env_file_loaded {
            debug!("loaded .env file");
        }

        let mut config = Config::default();

        if let Some(host) = env::var("FLOWGATE_HOST").ok() {
            config.server.host = host;
        }
        if let Some(port) = parse_env("FLOWGATE_PORT")? {
            config.server.port = port;
        }
        if let Ok(url) = env::var("FLOWGATE_REDIS_URL") {
            config.redis.url = url;
        }
        if let Some(bytes) = parse_env("FLOWGATE_ABSOLUTE_MAX_BYTES")? {
            config.envelope.absolute_max_bytes = bytes;
        }
        if let Some(pct) = parse_env("FLOWGATE_RESOURCE_CPU_MAX_PCT")? {
            config.resource_guard.cpu_max_pct = pct;
        }
        if let Some(pct) = parse_env("FLOWGATE_RESOURCE_MEM_MAX_PCT")? {
            config.resource_guard.mem_max_pct = pct;
        }
        if let Some(tasks) = parse_env("FLOWGATE_RESOURCE_TASKS_MAX")? {
            config.resource_guard.tasks_max = tasks;
        }
        if let Some(n) = parse_env("FLOWGATE_PROTECTOR_ENTER_SAMPLES")? {
            config.resource_guard.protector_enter_samples = n;
        }
        if let Some(n) = parse_env("FLOWGATE_PROTECTOR_LEAVE_SAMPLES")? {
            config.resource_guard.protector_leave_samples = n;
        }
        if let Some(d) = parse_duration_env("FLOWGATE_RATE_WINDOW")? {
            config.rate_limiter.window = d;
        }
        if let Some(n) = parse_env("FLOWGATE_ABUSE_THRESHOLD")? {
            config.rate_limiter.abuse_threshold = n;
        }
        if let Some(d) = parse_duration_env("FLOWGATE_RATE_BACKEND_TIMEOUT")? {
            config.rate_limiter.backend_timeout = d;
        }
        if let Some(d) = parse_duration_env("FLOWGATE_RESCORE_INTERVAL")? {
            config.scorer.rescore_interval = d;
        }
        if let Some(d) = parse_duration_env("FLOWGATE_BATCH_TIMEOUT")? {
            config.dispatcher.batch_timeout = d;
        }
        if let Some(n) = parse_env("FLOWGATE_LEDGER_RETRIES")? {
            config.ledger.retries = n;
        }
        if let Ok(level) = env::var("RUST_LOG") {
            config.log_level = level;
        }

        config.metadata = ConfigMetadata {
            config_path: env::var("FLOWGATE_CONFIG").ok().map(PathBuf::from),
            env_file_loaded,
            plan_catalog_source: PlanCatalogSource::BuiltinDefaults,
        };

        for warning in crate::validation::validate(&config) {
            warn!(%warning, "configuration warning");
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigLoadError::InvalidValue {
                var,
                reason: format!("could not parse '{raw}'"),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_duration_env(var: &'static str) -> Result<Option<Duration>> {
    match env::var(var) {
        Ok(raw) => humantime::parse_duration(&raw).map(Some).map_err(|e| {
            ConfigLoadError::InvalidValue {
                var,
                reason: e.to_string(),
            }
        }),
        Err(_) => Ok(None),
    }
}
