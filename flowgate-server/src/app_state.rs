use std::fmt;
use std::sync::Arc;

use flowgate_core::{AdmissionController, JobDispatcher, PlanCatalog, UsageTracker};

/// Shared, read-only-from-the-handlers application state. Every service here
/// is wrapped in `Arc` so cloning `AppState` into each request is cheap;
/// mutable state lives behind the backends the services talk to, never in
/// this struct directly: no in-process mutable state is authoritative.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub dispatcher: Arc<JobDispatcher>,
    pub usage_tracker: Arc<UsageTracker>,
    pub plans: Arc<PlanCatalog>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
