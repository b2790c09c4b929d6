use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use flowgate_core::AdmissionError;
use serde_json::json;
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

/// Transport-layer error: wraps an `AdmissionError` (or any other failure)
/// into the structured refusal payload: `{ code, message,
/// type, required_plan?, current_usage?, limits?, reset_time? }`.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error_type: &'static str,
    pub message: String,
    pub required_plan: Option<String>,
    pub current_usage: Option<u64>,
    pub limit: Option<u64>,
    pub reset_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, error_type: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            error_type,
            message,
            required_plan: None,
            current_usage: None,
            limit: None,
            reset_time: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal_limit",
            message.into(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
            "type": self.error_type,
            "required_plan": self.required_plan,
            "current_usage": self.current_usage,
            "limits": self.limit,
            "reset_time": self.reset_time,
        }));
        (self.status, body).into_response()
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::InternalOverload { .. } => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "internal_overload",
                "internal_limit",
                err.to_string(),
            ),
            AdmissionError::AbsoluteSizeExceeded { .. } => AppError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "absolute_size_exceeded",
                "plan_limit",
                err.to_string(),
            ),
            AdmissionError::PlanSizeExceeded { plan, .. } => {
                let mut e = AppError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "plan_size_exceeded",
                    "plan_limit",
                    err.to_string(),
                );
                e.required_plan = Some(plan.to_string());
                e
            }
            AdmissionError::FeatureNotAllowed { plan } => {
                let mut e = AppError::new(
                    StatusCode::FORBIDDEN,
                    "feature_not_allowed",
                    "feature",
                    err.to_string(),
                );
                e.required_plan = Some(plan.to_string());
                e
            }
            AdmissionError::QuotaExceeded {
                dimension,
                current,
                limit,
                reset_time,
            } => {
                let mut e = AppError::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "quota_exceeded",
                    "plan_limit",
                    format!("{dimension} quota exceeded"),
                );
                e.current_usage = Some(current);
                e.limit = Some(limit);
                e.reset_time = Some(reset_time);
                e
            }
            AdmissionError::ConcurrencyExceeded => AppError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "concurrency_exceeded",
                "plan_limit",
                err.to_string(),
            ),
            AdmissionError::RateLimited { retry_after } => {
                let mut e = AppError::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "rate_limited",
                    "plan_limit",
                    err.to_string(),
                );
                e.reset_time = Some(chrono::Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default());
                e
            }
            AdmissionError::Unauthenticated => AppError::new(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "auth",
                err.to_string(),
            ),
            AdmissionError::BackendTransient(_) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "backend_transient",
                "internal_limit",
                err.to_string(),
            ),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
