//! Gatehouse - admission control for chat bots
//!
//! Gatehouse decides, for every inbound chat event, whether a plugin handler
//! may run. It combines a per-entity enable switch, hierarchical permission
//! levels, explicit allow/deny auth nodes, multi-tier cooldowns and a flood
//! detector that escalates into a temporary ban.
//!
//! # Quick Start
//!
//! ```rust
//! use gatehouse::{AdmissionConfig, AdmissionPipeline, InboundEvent, MemoryStore, PluginPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = AdmissionPipeline::new(AdmissionConfig::load()?, Arc::new(MemoryStore::new()))?;
//!
//! let event = InboundEvent::group("bot1", "10001", "20001", chrono::Utc::now());
//! let policy = PluginPolicy::new("pixiv").with_cooldown_group_secs(60);
//!
//! let decision = pipeline.admit(&event, &policy).await;
//! if !decision.accepted {
//!     if let Some(message) = decision.user_message() {
//!         println!("{message}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `gatehouse_error` - Error types
//! - `gatehouse_core` - Entities, cooldown keys, events, decisions, clock, tracing setup
//! - `gatehouse_store` - Persistent store trait and in-memory backend
//! - `gatehouse_admission` - Gates, pipeline, operator surface, metrics and reaper
//!
//! This crate (`gatehouse`) re-exports everything for convenience.

pub use gatehouse_admission::*;
pub use gatehouse_core::*;
pub use gatehouse_error::*;
pub use gatehouse_store::{AdmissionStore, MemoryStore};
