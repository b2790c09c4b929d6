pub mod cli;
pub mod loader;
pub mod models;
pub mod validation;

pub use cli::Cli;
pub use loader::{ConfigLoadError, ConfigLoader};
pub use models::{
    Config, ConfigMetadata, DispatcherConfig, EnvelopeConfig, LedgerConfig, PlanCatalogSource,
    RateLimiterConfig, RedisConfig, ResourceGuardConfig, ScorerConfig, ServerConfig,
    default_plan_catalog,
};
pub use validation::{validate, ConfigWarning};
