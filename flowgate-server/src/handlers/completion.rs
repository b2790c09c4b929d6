use axum::extract::{Path, State};
use axum::Json;
use flowgate_core::JobOutcome;
use flowgate_model::job::JobId;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ReportCompletionRequest {
    pub actual_bytes: u64,
    pub actual_pages: u64,
    pub actual_ai_pages: u64,
    pub succeeded: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportCompletionResponse {
    pub job_id: String,
}

/// Worker-side intake for a job's terminal outcome. Loads the
/// `PendingOperation` staged at admission time and applies the corrected
/// usage delta, releasing the identity's concurrency slot regardless of
/// whether the job succeeded. A job id with nothing staged, because it was
/// already reported or never admitted, is a no-op, so this is safe to call
/// more than once for the same job.
pub async fn report_completion(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(body): Json<ReportCompletionRequest>,
) -> AppResult<Json<ReportCompletionResponse>> {
    let job_id = JobId(
        job_id
            .parse()
            .map_err(|_| AppError::internal("invalid job id"))?,
    );

    state
        .usage_tracker
        .record_completion(
            job_id,
            JobOutcome {
                job_id,
                actual_bytes: body.actual_bytes,
                actual_pages: body.actual_pages,
                actual_ai_pages: body.actual_ai_pages,
                succeeded: body.succeeded,
            },
        )
        .await;

    Ok(Json(ReportCompletionResponse {
        job_id: job_id.to_string(),
    }))
}
