use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;
use crate::handlers::{admission, batch, completion};

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/requests", post(admission::submit_request))
        .route("/batches", post(batch::submit_batch))
        .route("/batches/:id", get(batch::batch_status))
        .route("/jobs/:id/completion", post(completion::report_completion))
}
