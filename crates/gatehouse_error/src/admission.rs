//! Admission error types.

use crate::{ConfigError, StoreError};

/// Specific admission error conditions.
#[derive(Debug, Clone, derive_more::Display)]
pub enum AdmissionErrorKind {
    /// Both allow and deny requested for one node in a single call
    #[display("Ambiguous auth node '{}': allow and deny cannot both be set", node)]
    AmbiguousNode {
        /// Node that was being set
        node: String,
    },

    /// Node string is not a dotted identifier
    #[display("Invalid auth node '{}': {}", node, reason)]
    InvalidNode {
        /// Offending node string
        node: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration rejected
    #[display("Configuration error: {}", _0)]
    Configuration(String),

    /// The persistent store failed
    #[display("Store unavailable: {}", _0)]
    StoreUnavailable(StoreError),
}

/// Admission error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Admission Error: {} at line {} in {}", kind, line, file)]
pub struct AdmissionError {
    /// The specific error kind
    pub kind: AdmissionErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl AdmissionError {
    /// Create a new admission error with location tracking.
    #[track_caller]
    pub fn new(kind: AdmissionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AdmissionErrorKind {
        &self.kind
    }
}

impl From<StoreError> for AdmissionError {
    #[track_caller]
    fn from(err: StoreError) -> Self {
        AdmissionError::new(AdmissionErrorKind::StoreUnavailable(err))
    }
}

impl From<ConfigError> for AdmissionError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        AdmissionError::new(AdmissionErrorKind::Configuration(err.message))
    }
}

/// Result type for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;
