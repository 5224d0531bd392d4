//! Top-level error wrapper types.

use crate::{AdmissionError, ConfigError, StoreError};

/// Foundation error enum covering the shared error conditions.
///
/// # Examples
///
/// ```
/// use gatehouse_error::{GatehouseError, ConfigError};
///
/// let err: GatehouseError = ConfigError::new("missing field").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum GatehouseErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Persistent store error
    #[from(StoreError)]
    Store(StoreError),
    /// Admission control error
    #[from(AdmissionError)]
    Admission(AdmissionError),
}

/// Gatehouse error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Gatehouse Error: {}", _0)]
pub struct GatehouseError(Box<GatehouseErrorKind>);

impl GatehouseError {
    /// Create a new error from a kind.
    pub fn new(kind: GatehouseErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GatehouseErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to GatehouseErrorKind
impl<T> From<T> for GatehouseError
where
    T: Into<GatehouseErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Gatehouse operations.
pub type GatehouseResult<T> = std::result::Result<T, GatehouseError>;
