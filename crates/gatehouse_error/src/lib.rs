//! Error types for the Gatehouse library.
//!
//! This crate provides the foundation error types shared by every Gatehouse crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use gatehouse_error::{GatehouseResult, StoreError, StoreErrorKind};
//!
//! fn load_entity() -> GatehouseResult<String> {
//!     Err(StoreError::new(StoreErrorKind::Unavailable("connection refused".into())))?
//! }
//!
//! assert!(load_entity().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admission;
mod config;
mod error;
mod store;

pub use admission::{AdmissionError, AdmissionErrorKind, AdmissionResult};
pub use config::ConfigError;
pub use error::{GatehouseError, GatehouseErrorKind, GatehouseResult};
pub use store::{StoreError, StoreErrorKind, StoreResult};
