use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use crate::app_state::AppState;

/// Liveness: the process is up and able to answer. Never touches a backend.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness: the process additionally holds a working resource guard
/// sample. Backend connectivity (Redis) is not probed here: admission
/// already fails a single request cleanly when Redis is unreachable, so a
/// crash-looping readiness probe on the same condition would just thrash
/// pod restarts without changing the outcome.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let plans = state.plans.plans().len();
    (StatusCode::OK, Json(json!({ "status": "ready", "plans": plans })))
}
