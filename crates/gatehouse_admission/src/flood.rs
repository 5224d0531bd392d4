//! In-memory flood detection.

use crate::{CooldownLedger, FloodConfig, Superusers};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use gatehouse_core::{CooldownKey, Decision, InboundEvent, RejectReason};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Event ids remembered per user for deduplication.
const RECENT_EVENTS: usize = 8;

/// Per-user burst state. Volatile: lost on restart.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FloodCounter {
    last_seen: DateTime<Utc>,
    fast_count: u32,
    recent: VecDeque<u64>,
}

impl FloodCounter {
    fn new(event_id: u64, timestamp: DateTime<Utc>) -> Self {
        let mut recent = VecDeque::with_capacity(RECENT_EVENTS);
        recent.push_back(event_id);
        Self {
            last_seen: timestamp,
            fast_count: 0,
            recent,
        }
    }

    /// Remember `event_id`; `false` if it was already counted.
    fn remember(&mut self, event_id: u64) -> bool {
        if self.recent.contains(&event_id) {
            return false;
        }
        if self.recent.len() == RECENT_EVENTS {
            self.recent.pop_front();
        }
        self.recent.push_back(event_id);
        true
    }
}

/// Tracks message bursts per user and escalates them into a global-user ban.
///
/// Gaps are measured between the transport-reported timestamps of consecutive
/// messages. A burst of `threshold` fast messages after the first bans the
/// sender for `ban_secs` and resets the counter; later messages are then
/// rejected by the cooldown gate, not by the counter.
///
/// Each event is counted once, however many plugins it is offered to: a
/// repeated `event_id` is accepted without touching the counter.
pub struct FloodGuard {
    counters: DashMap<String, FloodCounter>,
    config: FloodConfig,
    superusers: Superusers,
    ledger: CooldownLedger,
}

impl FloodGuard {
    /// Create a guard with no history.
    pub fn new(config: FloodConfig, superusers: Superusers, ledger: CooldownLedger) -> Self {
        Self {
            counters: DashMap::new(),
            config,
            superusers,
            ledger,
        }
    }

    /// Account for one inbound message from its sender.
    #[instrument(skip(self, event), fields(user = %event.user_id, event_id = event.event_id))]
    pub async fn observe(&self, event: &InboundEvent) -> Decision {
        if !*self.config.enabled() || self.superusers.contains(&event.user_id) {
            return Decision::accept();
        }

        if !self.record(&event.user_id, event.event_id, event.timestamp) {
            return Decision::accept();
        }

        let ban = self.config.ban();
        warn!(ban_secs = ban.as_secs(), "Flood detected, banning user");
        if let Err(e) = self
            .ledger
            .upsert(CooldownKey::global_user(&event.user_id), ban, "flood")
            .await
        {
            error!(error = %e, "Failed to persist flood ban");
        }
        Decision::reject_for(RejectReason::FloodBanned, ban)
    }

    /// Update the counter; `true` when this message crosses the threshold.
    ///
    /// The map guard is released before returning, so no shard lock is held
    /// across the ban write.
    fn record(&self, user_id: &str, event_id: u64, timestamp: DateTime<Utc>) -> bool {
        let window = TimeDelta::from_std(self.config.window()).unwrap_or(TimeDelta::MAX);
        let threshold = *self.config.threshold();

        match self.counters.entry(user_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(FloodCounter::new(event_id, timestamp));
                false
            }
            Entry::Occupied(mut slot) => {
                let counter = slot.get_mut();
                if !counter.remember(event_id) {
                    debug!("Event already counted");
                    return false;
                }
                let gap = timestamp - counter.last_seen;
                counter.last_seen = timestamp;

                // Reordered deliveries have a negative gap and count as fast.
                if gap < window {
                    counter.fast_count = counter.fast_count.saturating_add(1);
                } else {
                    counter.fast_count = 0;
                }
                debug!(fast_count = counter.fast_count, "Flood counter updated");

                if counter.fast_count >= threshold {
                    counter.fast_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop counters whose last message is older than `idle` before `now`.
    ///
    /// # Returns
    ///
    /// Number of counters removed
    pub fn prune_idle(&self, now: DateTime<Utc>, idle: Duration) -> usize {
        let idle = TimeDelta::from_std(idle).unwrap_or(TimeDelta::MAX);
        let before = self.counters.len();
        self.counters
            .retain(|_, counter| now.signed_duration_since(counter.last_seen) <= idle);
        before.saturating_sub(self.counters.len())
    }

    /// Number of users with a live counter.
    pub fn tracked_users(&self) -> usize {
        self.counters.len()
    }

    /// Consecutive fast messages currently counted for a user.
    pub fn fast_count(&self, user_id: &str) -> Option<u32> {
        self.counters.get(user_id).map(|counter| counter.fast_count)
    }
}
