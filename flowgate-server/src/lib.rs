//! HTTP ingress for the flowgate admission control plane: wires the
//! `flowgate-core` pipeline up behind Axum handlers. Kept as a library so
//! integration tests can build the same router the binary serves, without
//! a running process.

pub mod app_state;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::Router;

pub use app_state::AppState;

/// Assembles the full router (routes plus ambient middleware) over a given
/// `AppState`. The binary calls this once at startup; tests call it per
/// case with fakes standing in for the Redis-backed services.
pub fn app(state: AppState) -> Router {
    middleware::apply(routes::create_router()).with_state(state)
}
