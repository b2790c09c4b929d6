use thiserror::Error;

/// Errors surfaced while constructing or validating model values.
///
/// Kept separate from the admission-pipeline error taxonomy in
/// `flowgate-core`: this crate only ever rejects structurally invalid data,
/// never business-rule refusals.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid plan name: {0}")]
    InvalidPlanName(String),

    #[error("invalid operation kind: {0}")]
    InvalidOperationKind(String),

    #[error("invalid lane: {0}")]
    InvalidLane(String),

    #[error("{field} must be non-empty")]
    EmptyField { field: &'static str },
}

pub type Result<T> = std::result::Result<T, ModelError>;
