use std::path::PathBuf;

use clap::Parser;

/// Command-line overrides for `flowgate-server`. Anything left unset here
/// falls through to the `FLOWGATE_`-prefixed environment variables and
/// finally to `Config::default()`, in that precedence order.
#[derive(Parser, Debug)]
#[command(name = "flowgate-server", about = "Multi-tenant document-processing admission control plane")]
pub struct Cli {
    /// Path to a `.env` file to load before reading the environment.
    #[arg(long, env = "FLOWGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address, e.g. 0.0.0.0:8080.
    #[arg(long, env = "FLOWGATE_BIND")]
    pub bind: Option<String>,

    #[arg(long, env = "FLOWGATE_REDIS_URL")]
    pub redis_url: Option<String>,

    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Applies the parsed overrides onto an already-loaded `Config`.
    pub fn apply(&self, config: &mut crate::models::Config) {
        if let Some(bind) = &self.bind {
            if let Some((host, port)) = bind.rsplit_once(':') {
                config.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    config.server.port = port;
                }
            }
        }
        if let Some(url) = &self.redis_url {
            config.redis.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.config.is_some() {
            config.metadata.config_path = self.config.clone();
        }
    }
}
