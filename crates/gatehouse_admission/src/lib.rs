//! Admission control for chat bot events.
//!
//! Every inbound event passes through [`AdmissionPipeline::admit`] before a
//! plugin handler runs:
//!
//! 1. **PluginEnabledCheck**: a disabled plugin rejects silently
//! 2. **[`PermissionGate`]**: entity switch, explicit auth nodes, permission levels
//! 3. **[`CooldownGate`]**: global bans, skip-cooldown nodes, plugin cooldowns
//! 4. **[`FloodGuard`]**: burst detection escalating into a global ban
//!
//! Each stage returns a [`Decision`](gatehouse_core::Decision); the first
//! rejection wins. Rejections carry a typed
//! [`RejectReason`](gatehouse_core::RejectReason) and only cooldown, flood and
//! store rejections produce a user-visible message.
//!
//! # Example
//!
//! ```rust
//! use gatehouse_admission::{AdmissionConfig, AdmissionPipeline, PluginPolicy};
//! use gatehouse_core::InboundEvent;
//! use gatehouse_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = AdmissionPipeline::new(AdmissionConfig::default(), Arc::new(MemoryStore::new()))?;
//! let policy = PluginPolicy::new("pixiv")
//!     .with_required_level(20)
//!     .with_required_node("pixiv.basic")
//!     .with_cooldown_user_secs(30);
//!
//! let event = InboundEvent::private("bot1", "42", chrono::Utc::now());
//! let decision = pipeline.admit(&event, &policy).await;
//! if let Some(message) = decision.user_message() {
//!     println!("{message}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth_node;
mod config;
mod conversation;
mod cooldown_gate;
mod cooldown_ledger;
mod flood;
mod metrics;
mod operator;
mod permission;
mod pipeline;
mod plugin;
mod reaper;

pub use gatehouse_error::{AdmissionError, AdmissionErrorKind, AdmissionResult};

pub use auth_node::{AuthNodeResolver, SKIP_COOLDOWN_SUFFIX, skip_cooldown_node, validate_node};
pub use config::{AdmissionConfig, ConversationConfig, FloodConfig, ReaperConfig, Superusers};
pub use conversation::{ConversationGuard, ConversationRegistry};
pub use cooldown_gate::CooldownGate;
pub use cooldown_ledger::CooldownLedger;
pub use flood::FloodGuard;
pub use metrics::{
    AdmissionMetrics, DEFAULT_HISTORY_CAPACITY, DecisionRecord, MetricsSnapshot, PluginCounts,
};
pub use operator::{BanScope, Operator};
pub use permission::{EntityDirectory, PermissionGate};
pub use pipeline::AdmissionPipeline;
pub use plugin::PluginPolicy;
pub use reaper::{CooldownReaper, ReapReport, ReaperHandle, ReaperMessage};
