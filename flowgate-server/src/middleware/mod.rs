use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Layers applied to the whole router, outer to inner: CORS first so a
/// rejected preflight never reaches tracing, tracing second so every
/// request that does get processed is logged.
pub fn apply(router: Router<AppState>) -> Router<AppState> {
    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
