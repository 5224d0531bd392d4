//! Persisted cooldown windows.

use chrono::{DateTime, TimeDelta, Utc};
use gatehouse_core::{Clock, CooldownEvent, CooldownKey};
use gatehouse_error::StoreResult;
use gatehouse_store::AdmissionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Reads and writes `(kind, target, plugin?) -> expires_at` windows.
///
/// Every write replaces the prior row for the key outright; there is no
/// stacking or extension. Whether a window is open is always computed from
/// `expires_at` against the ledger's clock, never from row presence.
#[derive(Clone)]
pub struct CooldownLedger {
    store: Arc<dyn AdmissionStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownLedger {
    /// Create a ledger over a store, reading time from `clock`.
    pub fn new(store: Arc<dyn AdmissionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time according to the ledger's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Expiry of the stored window, expired or not.
    pub async fn get(&self, key: &CooldownKey) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.store.get_cooldown(key).await?.map(|event| event.expires_at))
    }

    /// Time left on the window, `None` if there is none or it has ended.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remaining(&self, key: &CooldownKey) -> StoreResult<Option<Duration>> {
        let now = self.now();
        let remaining = self
            .store
            .get_cooldown(key)
            .await?
            .and_then(|event| event.remaining(now));
        debug!(active = remaining.is_some(), "Checked cooldown");
        Ok(remaining)
    }

    /// Open a window of `duration` starting now, replacing any prior row.
    ///
    /// # Returns
    ///
    /// The new expiry
    #[instrument(skip(self, description), fields(key = %key))]
    pub async fn upsert(
        &self,
        key: CooldownKey,
        duration: Duration,
        description: impl Into<String>,
    ) -> StoreResult<DateTime<Utc>> {
        let expires_at = expiry_after(self.now(), duration);
        self.store
            .upsert_cooldown(CooldownEvent {
                key,
                expires_at,
                description: description.into(),
            })
            .await?;
        debug!(%expires_at, "Cooldown started");
        Ok(expires_at)
    }

    /// Remove the window for a key.
    pub async fn clear(&self, key: &CooldownKey) -> StoreResult<bool> {
        self.store.delete_cooldown(key).await
    }

    /// Physically delete rows that have already expired.
    pub async fn purge_expired(&self) -> StoreResult<usize> {
        self.store.purge_expired_cooldowns(self.now()).await
    }
}

/// `now + duration`, saturating at the latest representable instant.
fn expiry_after(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::ManualClock;
    use gatehouse_store::MemoryStore;

    fn ledger() -> (CooldownLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (
            CooldownLedger::new(Arc::new(MemoryStore::new()), clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_window_expires_at_boundary() {
        let (ledger, clock) = ledger();
        let key = CooldownKey::plugin_user("42", "pixiv");

        ledger
            .upsert(key.clone(), Duration::from_secs(30), "test")
            .await
            .unwrap();
        assert_eq!(
            ledger.remaining(&key).await.unwrap(),
            Some(Duration::from_secs(30))
        );

        clock.advance(Duration::from_secs(30));
        assert_eq!(ledger.remaining(&key).await.unwrap(), None);
        // The row outlives its window until purged.
        assert!(ledger.get(&key).await.unwrap().is_some());
        assert_eq!(ledger.purge_expired().await.unwrap(), 1);
        assert!(ledger.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_later_write_replaces_not_extends() {
        let (ledger, _) = ledger();
        let key = CooldownKey::global_user("42");

        ledger
            .upsert(key.clone(), Duration::from_secs(1800), "flood")
            .await
            .unwrap();
        let expires = ledger
            .upsert(key.clone(), Duration::from_secs(10), "manual")
            .await
            .unwrap();
        assert_eq!(ledger.get(&key).await.unwrap(), Some(expires));
        assert_eq!(
            ledger.remaining(&key).await.unwrap(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(
            expiry_after(now, Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
    }
}
