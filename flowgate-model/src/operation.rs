use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::plan::PlanFeatures;

/// Tagged operation kind. The admission controller and the size estimator
/// dispatch on this tag exclusively, never on string matching.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Pdf,
    Ocr,
    AiOcr,
    Office,
    Upload,
    Other,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Pdf => "pdf",
            OperationKind::Ocr => "ocr",
            OperationKind::AiOcr => "ocr-ai",
            OperationKind::Office => "office",
            OperationKind::Upload => "upload",
            OperationKind::Other => "other",
        }
    }

    /// Average bytes per page used to estimate a page count when the caller
    /// doesn't supply one. Chosen per operation kind, not a single
    /// global constant.
    pub fn bytes_per_page_heuristic(&self) -> u64 {
        match self {
            OperationKind::Pdf => 100 * 1024,
            OperationKind::Office => 50 * 1024,
            OperationKind::Ocr | OperationKind::AiOcr => 500 * 1024,
            OperationKind::Upload | OperationKind::Other => 100 * 1024,
        }
    }

    /// `true` if admitting this operation requires a specific plan feature
    /// flag. A pure function of (kind, features).
    pub fn required_feature(&self, features: &PlanFeatures) -> FeatureCheck {
        match self {
            OperationKind::AiOcr => FeatureCheck::Required(features.ai_ocr),
            OperationKind::Office => {
                FeatureCheck::Required(features.office_conversion)
            }
            _ => FeatureCheck::NotApplicable,
        }
    }
}

/// Result of checking an operation kind against plan features.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeatureCheck {
    /// This operation kind gates on a feature flag; `bool` is whether the
    /// plan has it enabled.
    Required(bool),
    /// This operation kind has no feature gate.
    NotApplicable,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OperationKind::Pdf),
            "ocr" => Ok(OperationKind::Ocr),
            "ocr-ai" | "ai-ocr" | "ai_ocr" => Ok(OperationKind::AiOcr),
            "office" => Ok(OperationKind::Office),
            "upload" => Ok(OperationKind::Upload),
            "other" => Ok(OperationKind::Other),
            other => Err(ModelError::InvalidOperationKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_ocr_requires_feature_flag() {
        let features = PlanFeatures {
            ai_ocr: false,
            watermark: true,
            office_conversion: true,
        };
        assert_eq!(
            OperationKind::AiOcr.required_feature(&features),
            FeatureCheck::Required(false)
        );
        assert_eq!(
            OperationKind::Pdf.required_feature(&features),
            FeatureCheck::NotApplicable
        );
    }

    #[test]
    fn unknown_operation_kind_is_rejected() {
        assert!("xml".parse::<OperationKind>().is_err());
    }
}
