use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::PlanName;

/// Stable opaque identifier for a principal. Anonymous callers are mapped to
/// a synthetic id derived from their source address (see `Identity::anonymous`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub String);

impl IdentityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Synthetic id for an anonymous caller, stable for a given source
    /// address so rate limiting and quotas still apply per-source.
    pub fn anonymous(source_addr: &str) -> Self {
        Self(format!("anon:{source_addr}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A principal with a stable id and a plan binding.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub plan: PlanName,
}

impl Identity {
    pub fn new(id: IdentityId, plan: PlanName) -> Self {
        Self { id, plan }
    }

    pub fn anonymous(source_addr: &str) -> Self {
        Self {
            id: IdentityId::anonymous(source_addr),
            plan: PlanName::Free,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_identity_is_stable_per_source() {
        let a = Identity::anonymous("203.0.113.7");
        let b = Identity::anonymous("203.0.113.7");
        assert_eq!(a, b);
        assert_eq!(a.plan, PlanName::Free);
    }

    #[test]
    fn anonymous_identity_differs_per_source() {
        let a = Identity::anonymous("203.0.113.7");
        let b = Identity::anonymous("203.0.113.8");
        assert_ne!(a.id, b.id);
    }
}
