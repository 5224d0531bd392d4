//! User and group identities.

use serde::{Deserialize, Serialize};

/// Which side of a chat an entity sits on.
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
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// An individual account
    User,
    /// A group chat / channel
    Group,
}

/// Identity of an entity: `(bot_id, kind, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display)]
#[display("{}:{}:{}", bot_id, kind, id)]
pub struct EntityRef {
    /// Bot connection the entity is scoped to
    pub bot_id: String,
    /// User or group
    pub kind: EntityKind,
    /// Identifier assigned by the chat platform
    pub id: String,
}

impl EntityRef {
    /// Create a reference of any kind.
    pub fn new(bot_id: impl Into<String>, kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            kind,
            id: id.into(),
        }
    }

    /// Reference to a user.
    pub fn user(bot_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(bot_id, EntityKind::User, id)
    }

    /// Reference to a group.
    pub fn group(bot_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(bot_id, EntityKind::Group, id)
    }

    /// Whether this reference names a user.
    pub fn is_user(&self) -> bool {
        self.kind == EntityKind::User
    }
}

/// Persisted entity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Identity of the entity
    pub reference: EntityRef,
    /// Integer trust tier compared against per-command minimums
    pub permission_level: i32,
    /// Master switch; a disabled entity is rejected before anything else
    pub global_enabled: bool,
}

impl Entity {
    /// Fresh entity as created on first interaction.
    pub fn new(reference: EntityRef, permission_level: i32) -> Self {
        Self {
            reference,
            permission_level,
            global_enabled: true,
        }
    }
}
