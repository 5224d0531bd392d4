//! Store trait definition.

use chrono::{DateTime, Utc};
use gatehouse_core::{AuthNodeRecord, CooldownEvent, CooldownKey, Entity, EntityRef};
use gatehouse_error::StoreResult;

/// Trait for persistent admission-state backends.
///
/// The two-column allow/deny representation of auth nodes is a detail of
/// this trait; callers outside the resolver never see it.
#[async_trait::async_trait]
pub trait AdmissionStore: Send + Sync {
    /// Load an entity's settings, `None` if it has never been seen.
    async fn get_entity(&self, entity: &EntityRef) -> StoreResult<Option<Entity>>;

    /// Create or overwrite an entity's settings.
    async fn upsert_entity(&self, entity: &Entity) -> StoreResult<()>;

    /// Insert `entity` only if no row exists for its reference.
    ///
    /// Must be a single atomic operation: a concurrent writer's row is never
    /// replaced.
    ///
    /// # Returns
    ///
    /// The row stored after the call, either `entity` or the one already present
    async fn create_entity_if_absent(&self, entity: &Entity) -> StoreResult<Entity>;

    /// Load the raw override for `(entity, node)`.
    async fn get_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
    ) -> StoreResult<Option<AuthNodeRecord>>;

    /// Create or overwrite the override for `(entity, node)`.
    async fn set_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
        record: AuthNodeRecord,
    ) -> StoreResult<()>;

    /// Remove the override for `(entity, node)`.
    ///
    /// # Returns
    ///
    /// `true` if a row was removed
    async fn delete_auth_node(&self, entity: &EntityRef, node: &str) -> StoreResult<bool>;

    /// Load the cooldown row for a key, expired or not.
    async fn get_cooldown(&self, key: &CooldownKey) -> StoreResult<Option<CooldownEvent>>;

    /// Write a cooldown row, fully replacing any prior row with the same key.
    async fn upsert_cooldown(&self, event: CooldownEvent) -> StoreResult<()>;

    /// Remove the cooldown row for a key.
    ///
    /// # Returns
    ///
    /// `true` if a row was removed
    async fn delete_cooldown(&self, key: &CooldownKey) -> StoreResult<bool>;

    /// Physically delete rows whose window ended at or before `now`.
    ///
    /// Housekeeping only; expiry is always computed from `expires_at`.
    ///
    /// # Returns
    ///
    /// Number of rows removed
    async fn purge_expired_cooldowns(&self, now: DateTime<Utc>) -> StoreResult<usize>;
}
