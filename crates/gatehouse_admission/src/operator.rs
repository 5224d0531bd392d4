//! Operator surface: bans, levels, switches and node overrides.

use crate::{AdmissionResult, AuthNodeResolver, CooldownLedger, EntityDirectory};
use chrono::{DateTime, Utc};
use gatehouse_core::{CooldownKey, Entity, EntityRef, NodeSetting};
use gatehouse_store::AdmissionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Target of a global ban.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BanScope {
    /// Ban a user everywhere
    User,
    /// Ban a whole group
    Group,
}

impl BanScope {
    /// Ledger key of the global ban on `target`.
    pub fn key(self, target: impl Into<String>) -> CooldownKey {
        match self {
            BanScope::User => CooldownKey::global_user(target),
            BanScope::Group => CooldownKey::global_group(target),
        }
    }
}

/// Administrative mutations used by operator tooling.
///
/// Every mutation goes through the same resolver and ledger the pipeline
/// reads, and takes effect on the next event.
#[derive(Clone)]
pub struct Operator {
    store: Arc<dyn AdmissionStore>,
    resolver: AuthNodeResolver,
    ledger: CooldownLedger,
    directory: EntityDirectory,
}

impl Operator {
    /// Create an operator handle.
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        resolver: AuthNodeResolver,
        ledger: CooldownLedger,
        directory: EntityDirectory,
    ) -> Self {
        Self {
            store,
            resolver,
            ledger,
            directory,
        }
    }

    /// Create an entity with default settings, or return the existing one.
    #[instrument(skip(self), fields(entity = %reference))]
    pub async fn init_entity(&self, reference: &EntityRef) -> AdmissionResult<Entity> {
        Ok(self.directory.load_or_init(reference).await?)
    }

    /// Load an entity's settings.
    pub async fn get_entity(&self, reference: &EntityRef) -> AdmissionResult<Option<Entity>> {
        Ok(self.store.get_entity(reference).await?)
    }

    /// Set an entity's permission level, creating the entity if needed.
    #[instrument(skip(self), fields(entity = %reference))]
    pub async fn set_permission_level(
        &self,
        reference: &EntityRef,
        level: i32,
    ) -> AdmissionResult<Entity> {
        let mut entity = self.init_entity(reference).await?;
        entity.permission_level = level;
        self.store.upsert_entity(&entity).await?;
        info!("Permission level set");
        Ok(entity)
    }

    /// Flip an entity's master switch, creating the entity if needed.
    #[instrument(skip(self), fields(entity = %reference))]
    pub async fn set_global_enabled(
        &self,
        reference: &EntityRef,
        enabled: bool,
    ) -> AdmissionResult<Entity> {
        let mut entity = self.init_entity(reference).await?;
        entity.global_enabled = enabled;
        self.store.upsert_entity(&entity).await?;
        info!("Global switch set");
        Ok(entity)
    }

    /// Allow, deny or unset a node for an entity.
    pub async fn set_auth_node(
        &self,
        reference: &EntityRef,
        node: &str,
        setting: NodeSetting,
        info: Option<String>,
    ) -> AdmissionResult<()> {
        self.resolver.apply(reference, node, setting, info).await
    }

    /// Ban `target` for `duration`, replacing any current ban.
    ///
    /// # Returns
    ///
    /// When the ban ends
    #[instrument(skip(self, reason))]
    pub async fn set_global_ban(
        &self,
        scope: BanScope,
        target: &str,
        duration: Duration,
        reason: impl Into<String>,
    ) -> AdmissionResult<DateTime<Utc>> {
        let expires_at = self.ledger.upsert(scope.key(target), duration, reason).await?;
        info!(%expires_at, "Global ban set");
        Ok(expires_at)
    }

    /// Lift a global ban.
    ///
    /// # Returns
    ///
    /// `true` if a ban row existed
    #[instrument(skip(self))]
    pub async fn clear_ban(&self, scope: BanScope, target: &str) -> AdmissionResult<bool> {
        let removed = self.ledger.clear(&scope.key(target)).await?;
        info!(removed, "Global ban cleared");
        Ok(removed)
    }

    /// Time left on a global ban, `None` when not banned.
    pub async fn ban_status(
        &self,
        scope: BanScope,
        target: &str,
    ) -> AdmissionResult<Option<Duration>> {
        Ok(self.ledger.remaining(&scope.key(target)).await?)
    }

    /// Remove any cooldown window, including plugin-scoped ones.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn clear_cooldown(&self, key: &CooldownKey) -> AdmissionResult<bool> {
        let removed = self.ledger.clear(key).await?;
        info!(removed, "Cooldown cleared");
        Ok(removed)
    }
}
