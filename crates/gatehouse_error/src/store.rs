//! Persistent store error types.

/// Kinds of store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// The store could not be reached or refused the call
    #[display("Store unavailable: {}", _0)]
    Unavailable(String),
    /// The store call did not complete in time
    #[display("Store call timed out: {}", _0)]
    Timeout(String),
    /// The store returned a record that could not be interpreted
    #[display("Corrupt record: {}", _0)]
    Corrupt(String),
}

/// Store error with location tracking.
///
/// # Examples
///
/// ```
/// use gatehouse_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::Timeout("get_cooldown".to_string()));
/// assert!(format!("{}", err).contains("timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The kind of error that occurred
    pub kind: StoreErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
