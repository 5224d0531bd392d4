//! Per-plugin admission requirements.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a plugin demands of an event before its handler runs.
///
/// Handlers build one inline:
///
/// ```
/// use gatehouse_admission::PluginPolicy;
///
/// let policy = PluginPolicy::new("pixiv")
///     .with_required_level(20)
///     .with_required_node("pixiv.basic")
///     .with_cooldown_group_secs(60)
///     .with_cooldown_user_secs(30);
///
/// assert_eq!(policy.name(), "pixiv");
/// assert_eq!(policy.group_cooldown(), Some(std::time::Duration::from_secs(60)));
/// ```
///
/// or declare it under `[plugins.<name>]` in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PluginPolicy {
    /// Plugin name; filled from the table key when loaded from configuration
    #[serde(default)]
    #[setters(skip)]
    name: String,

    /// A disabled plugin rejects every event
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// Minimum permission level
    #[serde(default)]
    #[setters(strip_option)]
    required_level: Option<i32>,

    /// Auth node whose explicit decision overrides the level check
    #[serde(default)]
    #[setters(strip_option, into)]
    required_node: Option<String>,

    /// Per-user cooldown in seconds
    #[serde(default)]
    #[setters(strip_option)]
    #[getter(skip)]
    cooldown_user_secs: Option<u64>,

    /// Per-group cooldown in seconds
    #[serde(default)]
    #[setters(strip_option)]
    #[getter(skip)]
    cooldown_group_secs: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl PluginPolicy {
    /// Unrestricted, enabled policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            required_level: None,
            required_node: None,
            cooldown_user_secs: None,
            cooldown_group_secs: None,
        }
    }

    /// Same policy under another name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Per-user cooldown window.
    pub fn user_cooldown(&self) -> Option<Duration> {
        self.cooldown_user_secs.map(Duration::from_secs)
    }

    /// Per-group cooldown window.
    pub fn group_cooldown(&self) -> Option<Duration> {
        self.cooldown_group_secs.map(Duration::from_secs)
    }

    pub(crate) fn cooldown_secs(&self) -> (Option<u64>, Option<u64>) {
        (self.cooldown_user_secs, self.cooldown_group_secs)
    }
}
