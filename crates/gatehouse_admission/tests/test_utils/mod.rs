//! Shared helpers for admission tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use gatehouse_admission::{AdmissionConfig, AdmissionPipeline};
use gatehouse_core::{AuthNodeRecord, CooldownEvent, CooldownKey, Entity, EntityRef, ManualClock};
use gatehouse_error::{StoreError, StoreErrorKind, StoreResult};
use gatehouse_store::{AdmissionStore, MemoryStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed start instant so expiry arithmetic is reproducible.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Memory store that can be told to fail reads or writes.
///
/// `stale_entity_reads` makes `get_entity` report a miss, as if the read ran
/// just before a concurrent writer created the row.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    stale_entity_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn stale_entity_reads(&self, stale: bool) {
        self.stale_entity_reads.store(stale, Ordering::SeqCst);
    }

    /// Backing store, bypassing failure injection.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn read(&self, op: &str) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(StoreError::new(StoreErrorKind::Unavailable(op.to_string())))
        } else {
            Ok(())
        }
    }

    fn write(&self, op: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::new(StoreErrorKind::Timeout(op.to_string())))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl AdmissionStore for FlakyStore {
    async fn get_entity(&self, entity: &EntityRef) -> StoreResult<Option<Entity>> {
        self.read("get_entity")?;
        if self.stale_entity_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_entity(entity).await
    }

    async fn upsert_entity(&self, entity: &Entity) -> StoreResult<()> {
        self.write("upsert_entity")?;
        self.inner.upsert_entity(entity).await
    }

    async fn create_entity_if_absent(&self, entity: &Entity) -> StoreResult<Entity> {
        self.write("create_entity_if_absent")?;
        self.inner.create_entity_if_absent(entity).await
    }

    async fn get_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
    ) -> StoreResult<Option<AuthNodeRecord>> {
        self.read("get_auth_node")?;
        self.inner.get_auth_node(entity, node).await
    }

    async fn set_auth_node(
        &self,
        entity: &EntityRef,
        node: &str,
        record: AuthNodeRecord,
    ) -> StoreResult<()> {
        self.write("set_auth_node")?;
        self.inner.set_auth_node(entity, node, record).await
    }

    async fn delete_auth_node(&self, entity: &EntityRef, node: &str) -> StoreResult<bool> {
        self.write("delete_auth_node")?;
        self.inner.delete_auth_node(entity, node).await
    }

    async fn get_cooldown(&self, key: &CooldownKey) -> StoreResult<Option<CooldownEvent>> {
        self.read("get_cooldown")?;
        self.inner.get_cooldown(key).await
    }

    async fn upsert_cooldown(&self, event: CooldownEvent) -> StoreResult<()> {
        self.write("upsert_cooldown")?;
        self.inner.upsert_cooldown(event).await
    }

    async fn delete_cooldown(&self, key: &CooldownKey) -> StoreResult<bool> {
        self.write("delete_cooldown")?;
        self.inner.delete_cooldown(key).await
    }

    async fn purge_expired_cooldowns(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        self.write("purge_expired_cooldowns")?;
        self.inner.purge_expired_cooldowns(now).await
    }
}

/// Pipeline over a memory store with a manual clock starting at [`epoch`].
pub fn pipeline(config: AdmissionConfig) -> (AdmissionPipeline, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let pipeline = AdmissionPipeline::with_clock(config, store.clone(), clock.clone())
        .expect("Valid test configuration");
    (pipeline, store, clock)
}

/// Pipeline over a [`FlakyStore`].
pub fn flaky_pipeline(config: AdmissionConfig) -> (AdmissionPipeline, Arc<FlakyStore>, Arc<ManualClock>) {
    let store = Arc::new(FlakyStore::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let pipeline = AdmissionPipeline::with_clock(config, store.clone(), clock.clone())
        .expect("Valid test configuration");
    (pipeline, store, clock)
}
