//! Persistent store seam for Gatehouse.
//!
//! Admission control reads and writes three kinds of records: entity settings,
//! auth-node overrides and cooldown windows. This crate defines the
//! [`AdmissionStore`] trait those reads and writes go through, so the pipeline
//! stays independent of the database that actually holds them.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local maps, for single-process deployments and tests
//!
//! Every trait method is one short, independent operation. Implementations
//! must make each write atomic on its own; no operation spans several calls.
//!
//! # Example
//!
//! ```rust
//! use gatehouse_core::{CooldownEvent, CooldownKey};
//! use gatehouse_store::{AdmissionStore, MemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let key = CooldownKey::global_user("42");
//!
//! store
//!     .upsert_cooldown(CooldownEvent {
//!         key: key.clone(),
//!         expires_at: chrono::Utc::now(),
//!         description: "manual ban".to_string(),
//!     })
//!     .await?;
//!
//! assert!(store.get_cooldown(&key).await?.is_some());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod store;

pub use gatehouse_error::{StoreError, StoreErrorKind, StoreResult};
pub use memory::MemoryStore;
pub use store::AdmissionStore;
