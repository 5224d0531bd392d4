//! Post-decision statistics and history.

use chrono::{DateTime, Utc};
use gatehouse_core::{Decision, InboundEvent, RejectReason};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of decisions kept in the recent history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Statistics sink fed after each decision is made.
///
/// Recording never influences a decision and never touches the store.
#[derive(Debug, Clone)]
pub struct AdmissionMetrics {
    inner: Arc<AdmissionMetricsInner>,
}

#[derive(Debug)]
struct AdmissionMetricsInner {
    admitted: AtomicU64,
    rejected: AtomicU64,
    follow_ups: AtomicU64,
    per_reason: parking_lot::Mutex<BTreeMap<RejectReason, u64>>,
    per_plugin: parking_lot::Mutex<BTreeMap<String, PluginCounts>>,
    history: parking_lot::Mutex<VecDeque<DecisionRecord>>,
    history_capacity: usize,
}

impl Default for AdmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionMetrics {
    /// Creates a sink with the default history size.
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Creates a sink keeping the last `capacity` decisions.
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(AdmissionMetricsInner {
                admitted: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
                follow_ups: AtomicU64::new(0),
                per_reason: parking_lot::Mutex::new(BTreeMap::new()),
                per_plugin: parking_lot::Mutex::new(BTreeMap::new()),
                history: parking_lot::Mutex::new(VecDeque::with_capacity(capacity)),
                history_capacity: capacity,
            }),
        }
    }

    /// Records the outcome of a full admission run.
    pub fn record(&self, plugin: &str, event: &InboundEvent, decision: &Decision, at: DateTime<Utc>) {
        if decision.accepted {
            self.inner.admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.rejected.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(reason) = decision.reason {
            *self.inner.per_reason.lock().entry(reason).or_default() += 1;
        }

        {
            let mut per_plugin = self.inner.per_plugin.lock();
            let counts = per_plugin.entry(plugin.to_string()).or_default();
            if decision.accepted {
                counts.admitted += 1;
            } else {
                counts.rejected += 1;
            }
        }

        if self.inner.history_capacity == 0 {
            return;
        }
        let mut history = self.inner.history.lock();
        if history.len() == self.inner.history_capacity {
            history.pop_front();
        }
        history.push_back(DecisionRecord {
            at,
            plugin: plugin.to_string(),
            bot_id: event.bot_id.clone(),
            user_id: event.user_id.clone(),
            group_id: event.group_id.clone(),
            accepted: decision.accepted,
            reason: decision.reason,
        });
    }

    /// Records a conversation follow-up admitted without running the pipeline.
    pub fn record_follow_up(&self) {
        self.inner.follow_ups.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the number of admitted events.
    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::Relaxed)
    }

    /// Gets the number of rejected events.
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Gets the number of conversation follow-ups.
    pub fn follow_ups(&self) -> u64 {
        self.inner.follow_ups.load(Ordering::Relaxed)
    }

    /// Gets the rejection count for one reason.
    pub fn rejections(&self, reason: RejectReason) -> u64 {
        self.inner
            .per_reason
            .lock()
            .get(&reason)
            .copied()
            .unwrap_or(0)
    }

    /// Creates a serializable snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted(),
            rejected: self.rejected(),
            follow_ups: self.follow_ups(),
            per_reason: self.inner.per_reason.lock().clone(),
            per_plugin: self.inner.per_plugin.lock().clone(),
            recent: self.inner.history.lock().iter().cloned().collect(),
        }
    }
}

/// Admitted / rejected totals for one plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PluginCounts {
    /// Events admitted
    pub admitted: u64,
    /// Events rejected
    pub rejected: u64,
}

/// One entry of the recent-decision history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionRecord {
    /// When the decision was made
    pub at: DateTime<Utc>,
    /// Plugin the event was addressed to
    pub plugin: String,
    /// Bot connection
    pub bot_id: String,
    /// Sender
    pub user_id: String,
    /// Group, if any
    pub group_id: Option<String>,
    /// Outcome
    pub accepted: bool,
    /// Rejection reason
    pub reason: Option<RejectReason>,
}

/// Serializable snapshot of admission metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Events admitted by the pipeline
    pub admitted: u64,
    /// Events rejected by the pipeline
    pub rejected: u64,
    /// Follow-ups admitted through open conversations
    pub follow_ups: u64,
    /// Rejections by reason
    pub per_reason: BTreeMap<RejectReason, u64>,
    /// Totals by plugin
    pub per_plugin: BTreeMap<String, PluginCounts>,
    /// Most recent decisions, oldest first
    pub recent: Vec<DecisionRecord>,
}
