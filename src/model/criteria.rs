//! Selection criteria for locating a client identity in a credential store

/// Criteria for selecting a client identity from the credential store
///
/// The common name is matched exactly against the certificate subject.
/// Expiry enforcement defaults to on; it can be disabled for test setups
/// where an intentionally expired certificate must be selectable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Subject common name the certificate must carry (exact match)
    pub common_name: String,

    /// Only consider identities whose key can produce signatures
    pub require_signing: bool,

    /// Skip candidates whose certificate has expired
    pub enforce_expiry: bool,
}

impl SelectionCriteria {
    /// Create criteria for the given subject common name.
    ///
    /// Signing capability and expiry enforcement are both required by
    /// default.
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            require_signing: true,
            enforce_expiry: true,
        }
    }

    /// Set whether expired certificates are skipped during selection.
    #[must_use]
    pub fn enforce_expiry(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }

    /// Set whether candidates must support signing.
    #[must_use]
    pub fn require_signing(mut self, require: bool) -> Self {
        self.require_signing = require;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_defaults() {
        let criteria = SelectionCriteria::new("svc-client");
        assert_eq!(criteria.common_name, "svc-client");
        assert!(criteria.require_signing);
        assert!(criteria.enforce_expiry);
    }

    #[test]
    fn test_criteria_builder() {
        let criteria = SelectionCriteria::new("svc-client")
            .enforce_expiry(false)
            .require_signing(false);
        assert!(!criteria.enforce_expiry);
        assert!(!criteria.require_signing);
    }
}
