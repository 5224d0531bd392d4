//! In-memory store implementation.
//!
//! Each table lives behind its own lock, held only for the duration of a
//! single map operation and never across an `.await`.

use crate::AdmissionStore;
use chrono::{DateTime, Utc};
use gatehouse_core::{AuthNodeRecord, CooldownEvent, CooldownKey, Entity, EntityRef};
use gatehouse_error::StoreResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local admission store.
///
/// State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<HashMap<EntityRef, Entity>>,
    auth_nodes: RwLock<HashMap<(EntityRef, String), AuthNodeRecord>>,
    cooldowns: RwLock<HashMap<CooldownKey, CooldownEvent>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cooldown rows currently held, expired ones included.
    pub fn cooldown_count(&self) -> usize {
        self.cooldowns.read().len()
    }
}

#[async_trait::async_trait]
impl AdmissionStore for MemoryStore {
    async fn get_entity(&self, entity: &EntityRef) -> StoreResult<Option<Entity>> {
        Ok(self.entities.read().get(entity).cloned())
    }

    #[tracing::instrument(skip(self, entity), fields(entity = %entity.reference))]
    async fn upsert_entity(&self, entity: &Entity) -> StoreResult<()> {
        self.entities
            .write()
            .insert(entity.reference.clone(), entity.clone());
        tracing::trace!("Entity stored");
        Ok(())
    }

    #[tracing::instrument(skip(self, entity), fields(entity = %entity.reference))]
    async fn create_entity_if_absent(&self, entity: &Entity) -> StoreResult<Entity> {
        let stored = self
            .entities
            .write()
            .entry(entity.reference.clone())
            .or_insert_with(|| entity.clone())
            .clone();
        tracing::trace!(created = stored == *entity, "Entity ensured");
        Ok(stored)
    }

    async fn get_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
    ) -> StoreResult<Option<AuthNodeRecord>> {
        Ok(self
            .auth_nodes
            .read()
            .get(&(entity.clone(), node.to_string()))
            .cloned())
    }

    #[tracing::instrument(skip(self, record), fields(entity = %entity))]
    async fn set_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
        record: AuthNodeRecord,
    ) -> StoreResult<()> {
        self.auth_nodes
            .write()
            .insert((entity.clone(), node.to_string()), record);
        tracing::trace!("Auth node stored");
        Ok(())
    }

    async fn delete_auth_node(&self, entity: &EntityRef, node: &str) -> StoreResult<bool> {
        Ok(self
            .auth_nodes
            .write()
            .remove(&(entity.clone(), node.to_string()))
            .is_some())
    }

    async fn get_cooldown(&self, key: &CooldownKey) -> StoreResult<Option<CooldownEvent>> {
        Ok(self.cooldowns.read().get(key).cloned())
    }

    #[tracing::instrument(skip(self, event), fields(key = %event.key, expires_at = %event.expires_at))]
    async fn upsert_cooldown(&self, event: CooldownEvent) -> StoreResult<()> {
        self.cooldowns.write().insert(event.key.clone(), event);
        tracing::trace!("Cooldown stored");
        Ok(())
    }

    async fn delete_cooldown(&self, key: &CooldownKey) -> StoreResult<bool> {
        Ok(self.cooldowns.write().remove(key).is_some())
    }

    #[tracing::instrument(skip(self))]
    async fn purge_expired_cooldowns(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut cooldowns = self.cooldowns.write();
        let before = cooldowns.len();
        cooldowns.retain(|_, event| event.is_active(now));
        let removed = before - cooldowns.len();
        tracing::debug!(removed, "Purged expired cooldowns");
        Ok(removed)
    }
}
