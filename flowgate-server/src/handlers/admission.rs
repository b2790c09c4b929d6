use std::str::FromStr;

use axum::extract::State;
use axum::Json;
use flowgate_core::AdmissionRequest;
use flowgate_model::identity::{Identity, IdentityId};
use flowgate_model::job::{Job, JobId};
use flowgate_model::operation::OperationKind;
use flowgate_model::plan::PlanName;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub identity_id: String,
    pub plan: String,
    pub operation_kind: String,
    pub declared_bytes: u64,
    pub declared_pages: Option<u64>,
    pub blob_id: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub lane: String,
    pub estimated_wait_secs: u64,
}

pub async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let plan = PlanName::from_str(&body.plan)
        .map_err(|e| AppError::internal(format!("invalid plan: {e}")))?;
    let kind = OperationKind::from_str(&body.operation_kind)
        .map_err(|e| AppError::internal(format!("invalid operation kind: {e}")))?;

    let identity = Identity::new(IdentityId::new(body.identity_id), plan);
    let job_id = JobId::new();

    let admitted = state
        .admission
        .admit(AdmissionRequest {
            job_id,
            identity: identity.clone(),
            kind,
            declared_bytes: body.declared_bytes,
            declared_pages: body.declared_pages,
        })
        .await?;

    let job = Job::new_with_id(
        job_id,
        identity.id,
        admitted.pending.plan,
        kind,
        body.blob_id,
    );

    match state.dispatcher.enqueue(job).await {
        Ok(ack) => Ok(Json(SubmitResponse {
            job_id: ack.job_id.to_string(),
            lane: ack.lane.to_string(),
            estimated_wait_secs: ack.estimated_wait.as_secs(),
        })),
        Err(err) => {
            let _ = state
                .admission
                .release_on_dispatch_failure(job_id, admitted.permit)
                .await;
            Err(AppError::internal(err.to_string()))
        }
    }
}
