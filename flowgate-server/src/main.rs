//! # Flowgate Server
//!
//! Multi-tenant document-processing control plane: admission, quota
//! enforcement, priority scheduling, and job dispatch exposed over HTTP.
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - Redis as the shared key-value store for usage ledgers, rate windows,
//!   concurrency slots, and the priority queue
//! - `sysinfo` for process-local resource sampling
//! - `tokio` multi-threaded runtime throughout

use std::net::SocketAddr;
use std::sync::Arc;

use flowgate_config::{Cli, ConfigLoader};
use flowgate_core::{
    AdmissionController, JobDispatcher, LocalResourceGuard, PlanCatalog, PriorityRescorer,
    RedisPendingOperationStore, RedisQueueService, UsageTracker,
};
use flowgate_server::AppState;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ConfigLoader::load()?;
    let cli = Cli::parse_args();
    cli.apply(&mut config);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("flowgate-server starting up");
    if config.metadata.env_file_loaded {
        info!("loaded configuration from .env");
    }

    let guard = Arc::new(LocalResourceGuard::spawn(config.resource_guard));

    let ledger = Arc::new(
        flowgate_core::usage_ledger::RedisUsageLedger::connect(
            &config.redis.url,
            config.ledger.retries,
        )
        .await?,
    );
    let rate_limiter = Arc::new(
        flowgate_core::rate_limiter::RedisRateLimiter::connect(&config.redis.url).await?,
    );
    let concurrency = Arc::new(
        flowgate_core::concurrency::RedisConcurrencyGate::connect(&config.redis.url).await?,
    );
    let queue = Arc::new(RedisQueueService::connect(&config.redis.url).await?);
    let pending_store = Arc::new(RedisPendingOperationStore::connect(&config.redis.url).await?);

    let plans = PlanCatalog::new(config.plan_catalog.clone());

    let admission = Arc::new(AdmissionController::new(
        guard,
        ledger.clone(),
        rate_limiter,
        concurrency.clone(),
        pending_store.clone(),
        plans.clone(),
        config.envelope.absolute_max_bytes,
        config.rate_limiter.window,
    ));
    let dispatcher = Arc::new(JobDispatcher::new(Arc::clone(&queue), config.dispatcher.batch_timeout));
    let usage_tracker = Arc::new(UsageTracker::new(ledger, concurrency, pending_store));

    PriorityRescorer::spawn(queue, config.scorer.rescore_interval);

    let state = AppState {
        admission,
        dispatcher,
        usage_tracker,
        plans: Arc::new(plans),
    };

    let router = flowgate_server::app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;

    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    warn!("shutdown signal received, draining in-flight requests");
}
