//! Typed errors raised by the segmentation pipeline.
//!
//! These travel inside `anyhow::Error` through the crate-wide [`crate::Result`];
//! callers that need to branch on a specific failure use `downcast_ref::<RiskError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    /// Derived features required for clustering are absent from the record set.
    /// Every missing name is listed, in the order the clustering expects them.
    #[error("missing features for clustering: [{}]; run feature derivation first", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// Raw payment-history columns are absent, so features cannot be derived.
    #[error("missing input columns: [{}]", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column '{column}' contains {count} null values")]
    NullValues { column: String, count: usize },

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid clustering configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot fit {clusters} clusters on {samples} samples")]
    TooFewSamples { samples: usize, clusters: usize },

    #[error("record set is empty")]
    EmptyRecordSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_features_message_lists_all_names() {
        let err = RiskError::MissingFeatures(vec![
            "severity_score".to_string(),
            "limit_utilization".to_string(),
        ]);
        let message = err.to_string();
        assert!(message.contains("severity_score, limit_utilization"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = RiskError::EmptyRecordSet.into();
        assert_eq!(err.downcast_ref::<RiskError>(), Some(&RiskError::EmptyRecordSet));
    }
}
