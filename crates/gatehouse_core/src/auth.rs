//! Authorization node values.

use serde::{Deserialize, Serialize};

/// Resolved decision for an `(entity, node)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum NodeDecision {
    /// Explicitly granted
    Allow,
    /// Explicitly revoked
    Deny,
    /// No explicit override
    Unset,
}

impl NodeDecision {
    /// Whether this is an explicit override (allow or deny).
    pub fn is_explicit(self) -> bool {
        !matches!(self, NodeDecision::Unset)
    }
}

/// Operator-facing setting for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeSetting {
    /// Grant the node
    Allow,
    /// Revoke the node
    Deny,
    /// Remove any override
    Unset,
}

/// Stored two-column form of an auth node.
///
/// `allow` and `deny` are never both true; both false means unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthNodeRecord {
    /// Grant flag
    pub allow: bool,
    /// Revoke flag
    pub deny: bool,
    /// Free-form note left by the operator
    pub info: Option<String>,
}

impl AuthNodeRecord {
    /// Collapse the two columns into a decision.
    ///
    /// Deny wins should a corrupt row ever carry both flags.
    pub fn decision(&self) -> NodeDecision {
        match (self.allow, self.deny) {
            (_, true) => NodeDecision::Deny,
            (true, false) => NodeDecision::Allow,
            (false, false) => NodeDecision::Unset,
        }
    }
}
