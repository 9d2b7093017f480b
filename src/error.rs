//! Error types for the segmentation rule core

use pyo3::exceptions::{PyConnectionError, PyRuntimeError, PyValueError};
use pyo3::PyErr;
use thiserror::Error;

use crate::rule::Comparator;

/// Field a leaf condition is missing before it can be assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Key,
    Comparator,
    Value,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingField::Key => write!(f, "condition key"),
            MissingField::Comparator => write!(f, "comparator"),
            MissingField::Value => write!(f, "numeric value"),
        }
    }
}

fn expected_operators(conditions: &usize) -> usize {
    conditions.saturating_sub(1)
}

/// Main error type for the segmentation rule core
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("No conditions to convert")]
    EmptyRuleSet,

    #[error("Malformed operator sequence: {conditions} conditions need {expected} operators, got {operators}", expected = expected_operators(.conditions))]
    MalformedOperatorSequence { conditions: usize, operators: usize },

    #[error("Condition {index} is incomplete: missing {missing}")]
    IncompleteCondition { index: usize, missing: MissingField },

    #[error("Condition {index} has a value that does not fit comparator '{comparator}'")]
    PayloadMismatch { index: usize, comparator: Comparator },

    #[error("Condition {index} has a range whose minimum exceeds its maximum")]
    InvalidRange { index: usize },

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SegmentError {
    /// Whether the error comes from the rule model rather than the transport
    pub fn is_rule_error(&self) -> bool {
        matches!(
            self,
            SegmentError::EmptyRuleSet
                | SegmentError::MalformedOperatorSequence { .. }
                | SegmentError::IncompleteCondition { .. }
                | SegmentError::PayloadMismatch { .. }
                | SegmentError::InvalidRange { .. }
        )
    }
}

impl From<SegmentError> for PyErr {
    fn from(err: SegmentError) -> PyErr {
        let message = err.to_string();
        match err {
            SegmentError::EmptyRuleSet
            | SegmentError::MalformedOperatorSequence { .. }
            | SegmentError::IncompleteCondition { .. }
            | SegmentError::PayloadMismatch { .. }
            | SegmentError::InvalidRange { .. }
            | SegmentError::InvalidEdit(_)
            | SegmentError::Deserialization(_)
            | SegmentError::Json(_) => PyValueError::new_err(message),
            SegmentError::Http(_) => PyConnectionError::new_err(message),
            SegmentError::Config(_)
            | SegmentError::Api { .. }
            | SegmentError::InvalidResponse(_) => PyRuntimeError::new_err(message),
        }
    }
}

/// Result type alias for the segmentation rule core
pub type Result<T> = std::result::Result<T, SegmentError>;
