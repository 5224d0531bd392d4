//! Inbound chat events.

use crate::EntityRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_event_id() -> u64 {
    NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Transport-agnostic view of an incoming message.
///
/// `timestamp` is the time reported by the transport for the message, not the
/// host's receive time, so flood detection stays correct under delivery delay.
///
/// `event_id` identifies the message itself. Constructors assign a
/// process-unique id and clones share it, so one message offered to several
/// plugins is still a single event to the flood guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Identity of this message
    #[serde(default = "next_event_id")]
    pub event_id: u64,
    /// Bot connection that received the event
    pub bot_id: String,
    /// Sender's external id
    pub user_id: String,
    /// Group the message was posted in, `None` for private messages
    pub group_id: Option<String>,
    /// Transport-reported send time
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// Private message event.
    pub fn private(
        bot_id: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: next_event_id(),
            bot_id: bot_id.into(),
            user_id: user_id.into(),
            group_id: None,
            timestamp,
        }
    }

    /// Group message event.
    pub fn group(
        bot_id: impl Into<String>,
        user_id: impl Into<String>,
        group_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: next_event_id(),
            bot_id: bot_id.into(),
            user_id: user_id.into(),
            group_id: Some(group_id.into()),
            timestamp,
        }
    }

    /// Replace the generated id with one supplied by the transport.
    pub fn with_event_id(mut self, event_id: u64) -> Self {
        self.event_id = event_id;
        self
    }

    /// Reference to the sender.
    pub fn user_ref(&self) -> EntityRef {
        EntityRef::user(self.bot_id.clone(), self.user_id.clone())
    }

    /// Reference to the group, if any.
    pub fn group_ref(&self) -> Option<EntityRef> {
        self.group_id
            .as_ref()
            .map(|id| EntityRef::group(self.bot_id.clone(), id.clone()))
    }
}
