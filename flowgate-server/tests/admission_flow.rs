//! End-to-end tests driving the assembled router with `tower::ServiceExt::oneshot`
//! against in-memory fakes, so these never need a live Redis instance.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use flowgate_core::testing::{
    FixedResourceGuard, InMemoryConcurrencyGate, InMemoryLedger, InMemoryPendingOperationStore,
    InMemoryQueue, InMemoryRateLimiter,
};
use flowgate_core::{AdmissionController, JobDispatcher, PlanCatalog, UsageTracker};
use flowgate_server::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> AppState {
    let guard = Arc::new(FixedResourceGuard::new());
    let ledger = Arc::new(InMemoryLedger::new());
    let rate_limiter = Arc::new(InMemoryRateLimiter::new());
    let concurrency = Arc::new(InMemoryConcurrencyGate::new());
    let queue = Arc::new(InMemoryQueue::new());
    let pending_store = Arc::new(InMemoryPendingOperationStore::new());
    let plans = PlanCatalog::new(flowgate_config::default_plan_catalog());

    let admission = Arc::new(AdmissionController::new(
        guard,
        ledger.clone(),
        rate_limiter,
        concurrency.clone(),
        pending_store.clone(),
        plans.clone(),
        200 * 1024 * 1024,
        Duration::from_secs(60),
    ));
    let dispatcher = Arc::new(JobDispatcher::new(queue, Duration::from_secs(600)));
    let usage_tracker = Arc::new(UsageTracker::new(ledger, concurrency, pending_store));

    AppState {
        admission,
        dispatcher,
        usage_tracker,
        plans: Arc::new(plans),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_request_admits_and_enqueues_a_free_plan_job() {
    let app = flowgate_server::app(test_state());

    let body = json!({
        "identity_id": "acme-corp",
        "plan": "free",
        "operation_kind": "pdf",
        "declared_bytes": 1024,
        "declared_pages": 3,
        "blob_id": "blob-1",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/v1/requests")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert!(payload["job_id"].is_string());
    assert_eq!(payload["lane"], "default");
}

#[tokio::test]
async fn submit_request_over_plan_size_cap_returns_413() {
    let app = flowgate_server::app(test_state());

    let body = json!({
        "identity_id": "acme-corp",
        "plan": "free",
        "operation_kind": "pdf",
        "declared_bytes": 50 * 1024 * 1024,
        "declared_pages": 3,
        "blob_id": "blob-1",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/v1/requests")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let payload = body_json(response).await;
    assert_eq!(payload["code"], "plan_size_exceeded");
    assert!(payload["required_plan"].is_string());
}

#[tokio::test]
async fn submit_request_with_feature_gated_operation_returns_403() {
    let app = flowgate_server::app(test_state());

    // Free plan does not carry office_conversion; requesting one is
    // refused before any quota or rate check runs.
    let body = json!({
        "identity_id": "acme-corp",
        "plan": "free",
        "operation_kind": "office",
        "declared_bytes": 1024,
        "declared_pages": 1,
        "blob_id": "blob-1",
    });

    let request = Request::builder()
        .method("POST")
        .uri("/v1/requests")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let payload = body_json(response).await;
    assert_eq!(payload["code"], "feature_not_allowed");
}

#[tokio::test]
async fn batch_submit_reports_partial_failure_and_status_reflects_queued_jobs() {
    let app = flowgate_server::app(test_state());

    let body = json!({
        "identity_id": "acme-corp",
        "plan": "pro",
        "items": [
            { "operation_kind": "pdf", "blob_id": "b1", "declared_bytes": 1024, "declared_pages": 3 },
            { "operation_kind": "not-a-kind", "blob_id": "b2", "declared_bytes": 1024, "declared_pages": 3 },
            { "operation_kind": "ocr", "blob_id": "b3", "declared_bytes": 1024, "declared_pages": 3 },
        ],
    });

    let request = Request::builder()
        .method("POST")
        .uri("/v1/batches")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["total"], 3);
    assert_eq!(payload["queued"], 2);
    assert_eq!(payload["failed"], 1);

    let batch_id = payload["batch_id"].as_str().unwrap();
    let status_request = Request::builder()
        .method("GET")
        .uri(format!("/v1/batches/{batch_id}"))
        .body(Body::empty())
        .unwrap();
    let status_response = app.oneshot(status_request).await.unwrap();
    assert_eq!(status_response.status(), StatusCode::OK);
    let status_payload = body_json(status_response).await;
    assert_eq!(status_payload["jobs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn batch_items_beyond_plan_concurrency_are_refused_not_silently_queued() {
    let app = flowgate_server::app(test_state());

    // Free plan allows only 2 concurrent jobs; 4 valid items in one batch
    // must leave exactly 2 refused with `concurrency_exceeded`, proving
    // batch submissions go through the same admission gate as single
    // requests instead of bypassing it.
    let body = json!({
        "identity_id": "acme-corp",
        "plan": "free",
        "items": [
            { "operation_kind": "pdf", "blob_id": "b1", "declared_bytes": 1024, "declared_pages": 1 },
            { "operation_kind": "pdf", "blob_id": "b2", "declared_bytes": 1024, "declared_pages": 1 },
            { "operation_kind": "pdf", "blob_id": "b3", "declared_bytes": 1024, "declared_pages": 1 },
            { "operation_kind": "pdf", "blob_id": "b4", "declared_bytes": 1024, "declared_pages": 1 },
        ],
    });

    let request = Request::builder()
        .method("POST")
        .uri("/v1/batches")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    assert_eq!(payload["total"], 4);
    assert_eq!(payload["queued"], 2);
    assert_eq!(payload["failed"], 2);

    let failed_kinds: Vec<&str> = payload["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|o| o["error_kind"].as_str())
        .collect();
    assert!(failed_kinds.iter().all(|k| *k == "concurrency_exceeded"));
}

#[tokio::test]
async fn healthz_and_readyz_respond_ok() {
    let app = flowgate_server::app(test_state());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
