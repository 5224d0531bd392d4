//! Admission outcomes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Typed reason attached to every rejection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Entity or plugin switched off
    Disabled,
    /// Permission level below the plugin minimum
    InsufficientLevel,
    /// Explicit deny on the required node
    DeniedNode,
    /// User is globally banned
    CooldownGlobalUser,
    /// Group is globally banned
    CooldownGlobalGroup,
    /// Plugin cooldown running for the user
    CooldownPluginUser,
    /// Plugin cooldown running for the group
    CooldownPluginGroup,
    /// Flood detector just banned the user
    FloodBanned,
    /// The persistent store failed; admission fails closed
    StoreError,
}

impl RejectReason {
    /// Whether the sender should be told about this rejection.
    ///
    /// Permission rejections stay silent so unauthorized entities cannot
    /// discover which features exist.
    pub fn is_user_visible(self) -> bool {
        !matches!(
            self,
            RejectReason::Disabled | RejectReason::InsufficientLevel | RejectReason::DeniedNode
        )
    }
}

/// Result of running an event through admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the handler may run
    pub accepted: bool,
    /// Set on every rejection
    pub reason: Option<RejectReason>,
    /// How long until the blocking window ends, when known
    pub retry_after: Option<Duration>,
}

impl Decision {
    /// Admit the event.
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            retry_after: None,
        }
    }

    /// Reject without a known retry time.
    pub fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            retry_after: None,
        }
    }

    /// Reject with the time remaining on the blocking window.
    pub fn reject_for(reason: RejectReason, retry_after: Duration) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            retry_after: Some(retry_after),
        }
    }

    /// Whether the handler may run.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Human-readable message for the sender, `None` for silent rejections.
    pub fn user_message(&self) -> Option<String> {
        let reason = self.reason?;
        if !reason.is_user_visible() {
            return None;
        }

        let wait = self
            .retry_after
            .map(|d| format!(", try again in {}", format_remaining(d)))
            .unwrap_or_default();

        let message = match reason {
            RejectReason::CooldownGlobalUser => format!("You are temporarily banned{wait}."),
            RejectReason::CooldownGlobalGroup => {
                format!("This group is temporarily banned{wait}.")
            }
            RejectReason::CooldownPluginUser => format!("This command is cooling down{wait}."),
            RejectReason::CooldownPluginGroup => {
                format!("This command is cooling down in this group{wait}.")
            }
            RejectReason::FloodBanned => {
                format!("Too many messages; you have been temporarily banned{wait}.")
            }
            RejectReason::StoreError => {
                "Something went wrong, please try again later.".to_string()
            }
            RejectReason::Disabled | RejectReason::InsufficientLevel | RejectReason::DeniedNode => {
                return None;
            }
        };
        Some(message)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.reason, self.retry_after) {
            (None, _) => write!(f, "ACCEPT"),
            (Some(reason), None) => write!(f, "REJECT({})", reason),
            (Some(reason), Some(wait)) => {
                write!(f, "REJECT({}, retry in {})", reason, format_remaining(wait))
            }
        }
    }
}

/// Render a duration as `"1h 2m 3s"`, dropping leading zero units.
///
/// Partial seconds round up so a window never reads as over while it is still open.
pub fn format_remaining(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs += 1;
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
