//! Periodic housekeeping for expired state.
//!
//! The reaper only deletes state that is already dead: expired cooldown rows,
//! idle flood counters and lapsed conversations. Admission decisions never
//! depend on it having run.

use crate::{ConversationRegistry, CooldownLedger, FloodGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

/// Message types for the reaper.
#[derive(Debug)]
pub enum ReaperMessage {
    /// Run one sweep
    Reap,
    /// Stop the reaper
    Shutdown,
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Expired cooldown rows deleted from the store
    pub cooldowns: usize,
    /// Idle flood counters dropped
    pub flood_counters: usize,
    /// Lapsed conversations dropped
    pub conversations: usize,
}

/// Actor that sweeps expired state whenever it receives [`ReaperMessage::Reap`].
pub struct CooldownReaper {
    ledger: CooldownLedger,
    flood: Arc<FloodGuard>,
    conversations: ConversationRegistry,
    idle_horizon: Duration,
    rx: mpsc::Receiver<ReaperMessage>,
}

impl CooldownReaper {
    /// Creates a new reaper.
    pub fn new(
        ledger: CooldownLedger,
        flood: Arc<FloodGuard>,
        conversations: ConversationRegistry,
        idle_horizon: Duration,
        rx: mpsc::Receiver<ReaperMessage>,
    ) -> Self {
        Self {
            ledger,
            flood,
            conversations,
            idle_horizon,
            rx,
        }
    }

    /// Runs the reaper loop until shutdown or until every sender is gone.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Cooldown reaper started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                ReaperMessage::Reap => {
                    self.reap_once().await;
                }
                ReaperMessage::Shutdown => {
                    info!("Cooldown reaper shutting down");
                    break;
                }
            }
        }
    }

    /// Runs one sweep.
    ///
    /// A store failure is logged and leaves the rows for the next sweep.
    pub async fn reap_once(&self) -> ReapReport {
        let cooldowns = match self.ledger.purge_expired().await {
            Ok(purged) => purged,
            Err(e) => {
                error!(error = %e, "Failed to purge expired cooldowns");
                0
            }
        };
        let report = ReapReport {
            cooldowns,
            flood_counters: self.flood.prune_idle(self.ledger.now(), self.idle_horizon),
            conversations: self.conversations.prune_expired(),
        };
        debug!(?report, "Reap complete");
        report
    }
}

/// Handle to a running reaper and its ticker.
#[derive(Debug)]
pub struct ReaperHandle {
    tx: mpsc::Sender<ReaperMessage>,
    ticker: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl ReaperHandle {
    /// Spawns the reaper with a ticker requesting a sweep every `every`.
    pub fn spawn(
        ledger: CooldownLedger,
        flood: Arc<FloodGuard>,
        conversations: ConversationRegistry,
        idle_horizon: Duration,
        every: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let reaper = CooldownReaper::new(ledger, flood, conversations, idle_horizon, rx);

        let worker = tokio::spawn(async move {
            reaper.run().await;
        });

        let ticker_tx = tx.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = interval(every);
            // First tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if ticker_tx.send(ReaperMessage::Reap).await.is_err() {
                    debug!("Reaper channel closed");
                    break;
                }
            }
        });

        Self { tx, ticker, worker }
    }

    /// Requests an immediate sweep.
    pub async fn reap_now(&self) -> bool {
        self.tx.send(ReaperMessage::Reap).await.is_ok()
    }

    /// Stops the ticker and waits for the reaper to finish queued sweeps.
    pub async fn shutdown(self) {
        self.ticker.abort();
        if self.tx.send(ReaperMessage::Shutdown).await.is_err() {
            debug!("Reaper already stopped");
        }
        if let Err(e) = self.worker.await {
            error!(error = %e, "Reaper task failed");
        }
    }
}
