//! Multi-turn conversations admitted once.
//!
//! A handler that needs more input from the sender opens a conversation and
//! keeps the returned [`ConversationGuard`] alive while it waits. Follow-up
//! messages from the same sender in the same place skip the pipeline. The
//! conversation ends when the guard is dropped or its TTL lapses.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use gatehouse_core::{Clock, InboundEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConversationKey {
    bot_id: String,
    user_id: String,
    group_id: Option<String>,
}

impl From<&InboundEvent> for ConversationKey {
    fn from(event: &InboundEvent) -> Self {
        Self {
            bot_id: event.bot_id.clone(),
            user_id: event.user_id.clone(),
            group_id: event.group_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    plugin: String,
    ttl: TimeDelta,
    expires_at: DateTime<Utc>,
    token: u64,
}

/// Open conversations keyed by `(bot, user, group?)`.
#[derive(Clone)]
pub struct ConversationRegistry {
    sessions: Arc<DashMap<ConversationKey, Session>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    next_token: Arc<AtomicU64>,
}

impl ConversationRegistry {
    /// Create an empty registry.
    pub fn new(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            clock,
            default_ttl,
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Open a conversation for the sender of `event`, replacing any open one.
    #[instrument(skip(self, event), fields(user = %event.user_id))]
    pub fn begin(
        &self,
        event: &InboundEvent,
        plugin: &str,
        ttl: Option<Duration>,
    ) -> ConversationGuard {
        let key = ConversationKey::from(event);
        let ttl = TimeDelta::from_std(ttl.unwrap_or(self.default_ttl)).unwrap_or(TimeDelta::MAX);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let expires_at = expiry(self.clock.now(), ttl);

        self.sessions.insert(
            key.clone(),
            Session {
                plugin: plugin.to_string(),
                ttl,
                expires_at,
                token,
            },
        );
        debug!(%expires_at, "Conversation started");

        ConversationGuard {
            sessions: Arc::clone(&self.sessions),
            key,
            token,
        }
    }

    /// Plugin owning the sender's open conversation, if any.
    pub fn active(&self, event: &InboundEvent) -> Option<String> {
        let now = self.clock.now();
        self.sessions
            .get(&ConversationKey::from(event))
            .filter(|session| now < session.expires_at)
            .map(|session| session.plugin.clone())
    }

    /// Admit a follow-up for `plugin`, sliding the conversation's expiry.
    ///
    /// # Returns
    ///
    /// `true` if the sender has an open conversation with that plugin
    pub fn continue_session(&self, event: &InboundEvent, plugin: &str) -> bool {
        let now = self.clock.now();
        match self.sessions.get_mut(&ConversationKey::from(event)) {
            Some(mut session) if session.plugin == plugin && now < session.expires_at => {
                session.expires_at = expiry(now, session.ttl);
                true
            }
            _ => false,
        }
    }

    /// Forget conversations whose TTL has lapsed.
    ///
    /// # Returns
    ///
    /// Number of conversations removed
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now < session.expires_at);
        before.saturating_sub(self.sessions.len())
    }

    /// Number of open conversations, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no conversation is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn expiry(now: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Keeps a conversation open; dropping it ends the conversation.
///
/// A guard only removes its own session, so a conversation that was replaced
/// by a newer one survives the older guard's drop.
#[derive(Debug)]
pub struct ConversationGuard {
    sessions: Arc<DashMap<ConversationKey, Session>>,
    key: ConversationKey,
    token: u64,
}

impl ConversationGuard {
    /// End the conversation now.
    pub fn end(self) {}
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        let token = self.token;
        if self
            .sessions
            .remove_if(&self.key, |_, session| session.token == token)
            .is_some()
        {
            debug!(user = %self.key.user_id, "Conversation ended");
        }
    }
}
