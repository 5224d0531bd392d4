//! Cooldown windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scope of a cooldown window.
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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CooldownKind {
    /// Ban on a user across every plugin
    GlobalUser,
    /// Ban on a group across every plugin
    GlobalGroup,
    /// Per-plugin window for one user
    PluginUser,
    /// Per-plugin window for one group
    PluginGroup,
}

impl CooldownKind {
    /// Whether keys of this kind carry a plugin name.
    pub fn is_plugin_scoped(self) -> bool {
        matches!(self, CooldownKind::PluginUser | CooldownKind::PluginGroup)
    }
}

/// Key of a cooldown row: `(kind, target, plugin?)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CooldownKey {
    /// Scope of the window
    pub kind: CooldownKind,
    /// External id of the user or group
    pub target: String,
    /// Plugin name for plugin-scoped kinds
    pub plugin: Option<String>,
}

impl CooldownKey {
    /// Global ban on a user.
    pub fn global_user(target: impl Into<String>) -> Self {
        Self {
            kind: CooldownKind::GlobalUser,
            target: target.into(),
            plugin: None,
        }
    }

    /// Global ban on a group.
    pub fn global_group(target: impl Into<String>) -> Self {
        Self {
            kind: CooldownKind::GlobalGroup,
            target: target.into(),
            plugin: None,
        }
    }

    /// Plugin cooldown for a user.
    pub fn plugin_user(target: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            kind: CooldownKind::PluginUser,
            target: target.into(),
            plugin: Some(plugin.into()),
        }
    }

    /// Plugin cooldown for a group.
    pub fn plugin_group(target: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            kind: CooldownKind::PluginGroup,
            target: target.into(),
            plugin: Some(plugin.into()),
        }
    }
}

impl std::fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.plugin {
            Some(plugin) => write!(f, "{}:{}:{}", self.kind, self.target, plugin),
            None => write!(f, "{}:{}", self.kind, self.target),
        }
    }
}

/// A persisted cooldown row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEvent {
    /// Row key
    pub key: CooldownKey,
    /// Instant at which the window ends
    pub expires_at: DateTime<Utc>,
    /// Why the window was opened
    pub description: String,
}

impl CooldownEvent {
    /// A window is active strictly before its expiry; `now >= expires_at` is expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left in the window, `None` once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        if !self.is_active(now) {
            return None;
        }
        (self.expires_at - now).to_std().ok()
    }
}
