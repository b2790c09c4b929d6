use std::str::FromStr;

use axum::extract::{Path, State};
use axum::Json;
use flowgate_core::BatchItemRequest;
use flowgate_model::batch::BatchId;
use flowgate_model::identity::{Identity, IdentityId};
use flowgate_model::job::JobState;
use flowgate_model::plan::PlanName;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SubmitBatchItem {
    pub operation_kind: String,
    pub blob_id: String,
    pub declared_bytes: u64,
    pub declared_pages: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBatchRequest {
    pub identity_id: String,
    pub plan: String,
    pub items: Vec<SubmitBatchItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemOutcomeView {
    pub job_id: Option<String>,
    pub error_kind: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitBatchResponse {
    pub batch_id: String,
    pub total: usize,
    pub queued: usize,
    pub failed: usize,
    pub outcomes: Vec<BatchItemOutcomeView>,
}

pub async fn submit_batch(
    State(state): State<AppState>,
    Json(body): Json<SubmitBatchRequest>,
) -> AppResult<Json<SubmitBatchResponse>> {
    let plan_name = PlanName::from_str(&body.plan)
        .map_err(|e| AppError::internal(format!("invalid plan: {e}")))?;
    let plan = state
        .plans
        .get(plan_name)
        .cloned()
        .ok_or_else(|| AppError::internal("unknown plan"))?;

    let items = body
        .items
        .into_iter()
        .map(|item| BatchItemRequest {
            kind: item.operation_kind,
            blob_id: item.blob_id,
            declared_bytes: item.declared_bytes,
            declared_pages: item.declared_pages,
        })
        .collect();

    let identity = Identity::new(IdentityId::new(body.identity_id), plan_name);

    let receipt = state
        .dispatcher
        .enqueue_batch(identity, plan, items, state.admission.clone())
        .await;

    let outcomes = receipt
        .outcomes
        .into_iter()
        .map(|outcome| match outcome {
            flowgate_model::batch::BatchItemOutcome::Queued { job_id } => BatchItemOutcomeView {
                job_id: Some(job_id.to_string()),
                error_kind: None,
                message: None,
            },
            flowgate_model::batch::BatchItemOutcome::Failed { error_kind, message } => {
                BatchItemOutcomeView {
                    job_id: None,
                    error_kind: Some(error_kind),
                    message: Some(message),
                }
            }
        })
        .collect();

    Ok(Json(SubmitBatchResponse {
        batch_id: receipt.batch_id.to_string(),
        total: receipt.summary.total,
        queued: receipt.summary.queued,
        failed: receipt.summary.failed,
        outcomes,
    }))
}

#[derive(Debug, Serialize)]
pub struct BatchJobView {
    pub job_id: String,
    pub lane: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub batch_id: String,
    pub still_queued: usize,
    pub jobs: Vec<BatchJobView>,
}

/// Reconstructs aggregate batch status by querying jobs carrying this
/// batch id rather than an owning pointer from batch to job. Only
/// jobs the queue backend still has a record of are reported; a job that
/// has progressed to a terminal state tracked by the worker side is no
/// longer visible here.
pub async fn batch_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> AppResult<Json<BatchStatusResponse>> {
    let batch_id: BatchId = BatchId(
        batch_id
            .parse()
            .map_err(|_| AppError::internal("invalid batch id"))?,
    );

    let jobs = state
        .dispatcher
        .jobs_by_batch(batch_id)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;

    let still_queued = jobs.iter().filter(|j| j.state == JobState::Queued).count();
    let jobs = jobs
        .into_iter()
        .map(|job| BatchJobView {
            job_id: job.id.to_string(),
            lane: job.lane().to_string(),
            state: format!("{:?}", job.state),
        })
        .collect();

    Ok(Json(BatchStatusResponse {
        batch_id: batch_id.to_string(),
        still_queued,
        jobs,
    }))
}
