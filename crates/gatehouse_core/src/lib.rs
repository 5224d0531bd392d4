//! Core domain types for Gatehouse.
//!
//! This crate defines the vocabulary shared by the store and the admission
//! pipeline:
//!
//! - [`EntityRef`] / [`Entity`]: a user or group identity scoped to one bot connection
//! - [`NodeDecision`] / [`AuthNodeRecord`]: explicit allow/deny overrides on dotted nodes
//! - [`CooldownKey`] / [`CooldownEvent`]: persisted "blocked until T" windows
//! - [`InboundEvent`]: the transport-agnostic view of an incoming chat message
//! - [`Decision`] / [`RejectReason`]: the typed outcome of admission
//! - [`Clock`]: the source of `now()` for cooldown expiry

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod clock;
mod cooldown;
mod decision;
mod entity;
mod event;
mod telemetry;

pub use auth::{AuthNodeRecord, NodeDecision, NodeSetting};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{CooldownEvent, CooldownKey, CooldownKind};
pub use decision::{Decision, RejectReason, format_remaining};
pub use entity::{Entity, EntityKind, EntityRef};
pub use event::InboundEvent;
pub use telemetry::{LogFormat, init_tracing};
