pub mod v1;

use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;
use crate::handlers::health;

/// Assembles the whole router: versioned API under `/v1`, unversioned
/// health endpoints alongside it.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .nest("/v1", v1::create_v1_router())
}
