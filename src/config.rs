//! Merge engine tunables.

use serde::{Deserialize, Serialize};

use crate::error::{RosterError, RosterResult, ValidationError};
use crate::matching::{MatchCategory, MatchWeights};

/// Configuration for a `MergeOrchestrator`.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use rostermerge::MergeConfig;
///
/// let config = MergeConfig::from_json(r#"{ "merge_threshold": 7 }"#).unwrap();
/// assert_eq!(config.merge_threshold, 7);
/// assert_eq!(config.max_finalize_iterations, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Batches larger than this run the prep phase and id migration on the rayon pool.
    pub parallel_threshold: usize,
    /// Per-category match weights.
    pub weights: MatchWeights,
    /// Weight strictly above which a match merges without corroboration.
    pub merge_threshold: u32,
    /// Passes `merge_known` may run before giving up on convergence.
    pub max_finalize_iterations: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            weights: MatchWeights::default(),
            merge_threshold: 5,
            max_finalize_iterations: 10,
        }
    }
}

impl MergeConfig {
    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Snapshot` for malformed JSON and
    /// `RosterError::Validation` for values `validate` rejects.
    pub fn from_json(json: &str) -> RosterResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RosterError::snapshot(format!("invalid merge config: {e}")))?;
        Ok(config.validate()?)
    }

    /// Checks the configuration for values that make the engine unusable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the iteration cap is zero or
    /// if no single category weighs more than the merge threshold.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.max_finalize_iterations == 0 {
            return Err(ValidationError::InvalidConfig {
                field: "max_finalize_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let strongest = MatchCategory::ALL
            .into_iter()
            .map(|c| self.weights.get(c))
            .max()
            .unwrap_or(0);
        if strongest <= self.merge_threshold {
            return Err(ValidationError::InvalidConfig {
                field: "weights".to_string(),
                reason: format!(
                    "no category weighs more than merge_threshold {} (max {strongest})",
                    self.merge_threshold
                ),
            });
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MergeConfig::default().validate().unwrap();
        assert_eq!(config.parallel_threshold, 64);
        assert_eq!(config.merge_threshold, 5);
        assert_eq!(config.weights, MatchWeights::default());
    }

    #[test]
    fn test_zero_iteration_cap_rejected() {
        let config = MergeConfig {
            max_finalize_iterations: 0,
            ..MergeConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig { ref field, .. } if field == "max_finalize_iterations"));
    }

    #[test]
    fn test_unreachable_threshold_rejected() {
        let config = MergeConfig {
            merge_threshold: 1_000,
            ..MergeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial_weights() {
        let config = MergeConfig::from_json(r#"{ "weights": { "name": 4 }, "parallel_threshold": 8 }"#).unwrap();
        assert_eq!(config.weights.name, 4);
        assert_eq!(config.weights.chat_id, 50);
        assert_eq!(config.parallel_threshold, 8);
    }

    #[test]
    fn test_from_json_errors() {
        let err = MergeConfig::from_json("{ not json").unwrap_err();
        assert!(!err.is_validation());
        let err = MergeConfig::from_json(r#"{ "max_finalize_iterations": 0 }"#).unwrap_err();
        assert!(err.is_validation());
    }
}
