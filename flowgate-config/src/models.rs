use std::path::PathBuf;
use std::time::Duration;

use flowgate_model::plan::{Plan, PlanFeatures, PlanName};

/// Top-level configuration for a `flowgate` process. Constructed once at
/// startup by `ConfigLoader::load` and shared read-only thereafter, handed
/// to `AppState` for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub envelope: EnvelopeConfig,
    pub resource_guard: ResourceGuardConfig,
    pub rate_limiter: RateLimiterConfig,
    pub scorer: ScorerConfig,
    pub dispatcher: DispatcherConfig,
    pub ledger: LedgerConfig,
    pub plan_catalog: Vec<Plan>,
    pub log_level: String,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Looks up a plan by name in the loaded catalog. Panics are never
    /// appropriate here in request-handling code; callers treat `None` as
    /// an `Unauthenticated`/misconfiguration condition.
    pub fn plan(&self, name: PlanName) -> Option<&Plan> {
        self.plan_catalog.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Absolute envelope cap, independent of plan.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeConfig {
    pub absolute_max_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceGuardConfig {
    pub sample_interval: Duration,
    pub cpu_max_pct: f32,
    pub mem_max_pct: f32,
    pub tasks_max: u64,
    pub protector_enter_samples: u32,
    pub protector_leave_samples: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub window: Duration,
    pub abuse_threshold: u32,
    pub abuse_window: Duration,
    pub abuse_penalty_multiplier: f32,
    pub abuse_mark_duration: Duration,
    pub backend_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    pub rescore_interval: Duration,
    pub promote_wait_any: Duration,
    pub promote_wait_lowprio: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub batch_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    pub retries: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
    pub plan_catalog_source: PlanCatalogSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanCatalogSource {
    #[default]
    BuiltinDefaults,
    EnvironmentOverride,
}

/// Built-in plan catalog: free `max_ops_day=10`, premium
/// `max_concurrent=3`, free `rate=30/min`, etc.
pub fn default_plan_catalog() -> Vec<Plan> {
    vec![
        Plan {
            name: PlanName::Free,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_concurrent: 2,
            max_ops_day: 10,
            max_ops_month: 200,
            max_pages_day: 50,
            max_pages_month: 1_000,
            rate_limit_per_min: 30,
            burst_allowance: 0,
            batch_fanout: 3,
            features: PlanFeatures {
                ai_ocr: false,
                watermark: true,
                office_conversion: false,
            },
        },
        Plan {
            name: PlanName::Premium,
            max_file_size_bytes: 50 * 1024 * 1024,
            max_concurrent: 3,
            max_ops_day: 200,
            max_ops_month: 4_000,
            max_pages_day: 1_000,
            max_pages_month: 20_000,
            rate_limit_per_min: 120,
            burst_allowance: 10,
            batch_fanout: 5,
            features: PlanFeatures {
                ai_ocr: true,
                watermark: false,
                office_conversion: true,
            },
        },
        Plan {
            name: PlanName::Pro,
            max_file_size_bytes: 150 * 1024 * 1024,
            max_concurrent: 10,
            max_ops_day: 2_000,
            max_ops_month: 40_000,
            max_pages_day: 10_000,
            max_pages_month: 200_000,
            rate_limit_per_min: 300,
            burst_allowance: 30,
            batch_fanout: 10,
            features: PlanFeatures {
                ai_ocr: true,
                watermark: false,
                office_conversion: true,
            },
        },
        Plan {
            name: PlanName::Corporate,
            max_file_size_bytes: 350 * 1024 * 1024,
            max_concurrent: 25,
            max_ops_day: 20_000,
            max_ops_month: 400_000,
            max_pages_day: 100_000,
            max_pages_month: 2_000_000,
            rate_limit_per_min: 1_000,
            burst_allowance: 100,
            batch_fanout: 10,
            features: PlanFeatures {
                ai_ocr: true,
                watermark: false,
                office_conversion: true,
            },
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            envelope: EnvelopeConfig {
                absolute_max_bytes: 350 * 1024 * 1024,
            },
            resource_guard: ResourceGuardConfig {
                sample_interval: Duration::from_secs(10),
                cpu_max_pct: 85.0,
                mem_max_pct: 80.0,
                tasks_max: 10_000,
                protector_enter_samples: 3,
                protector_leave_samples: 6,
            },
            rate_limiter: RateLimiterConfig {
                window: Duration::from_secs(60),
                abuse_threshold: 10,
                abuse_window: Duration::from_secs(5 * 60),
                abuse_penalty_multiplier: 0.5,
                abuse_mark_duration: Duration::from_secs(15 * 60),
                backend_timeout: Duration::from_secs(2),
            },
            scorer: ScorerConfig {
                rescore_interval: Duration::from_secs(60),
                promote_wait_any: Duration::from_secs(30 * 60),
                promote_wait_lowprio: Duration::from_secs(15 * 60),
            },
            dispatcher: DispatcherConfig {
                batch_timeout: Duration::from_secs(10 * 60),
            },
            ledger: LedgerConfig { retries: 3 },
            plan_catalog: default_plan_catalog(),
            log_level: "info".to_string(),
            metadata: ConfigMetadata::default(),
        }
    }
}
