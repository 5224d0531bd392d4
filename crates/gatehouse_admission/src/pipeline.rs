//! The admission pipeline.

use crate::{
    AdmissionConfig, AdmissionMetrics, AdmissionResult, AuthNodeResolver, ConversationGuard,
    ConversationRegistry, CooldownGate, CooldownLedger, EntityDirectory, FloodGuard, Operator,
    PermissionGate, PluginPolicy, ReaperHandle,
};
use gatehouse_core::{Clock, Decision, InboundEvent, RejectReason, SystemClock};
use gatehouse_error::{StoreError, StoreResult};
use gatehouse_store::AdmissionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Sequences the gates every inbound event passes before a handler runs.
///
/// ```text
/// PluginEnabledCheck -> PermissionGate -> CooldownGate -> FloodGuard -> ACCEPT
/// ```
///
/// The first rejection short-circuits the remaining stages. A store failure
/// in any stage rejects with [`RejectReason::StoreError`]; admission never
/// admits blind.
///
/// The pipeline holds no lock across store calls and is cheap to share
/// between tasks behind an `Arc`.
pub struct AdmissionPipeline {
    config: AdmissionConfig,
    store: Arc<dyn AdmissionStore>,
    clock: Arc<dyn Clock>,
    resolver: AuthNodeResolver,
    ledger: CooldownLedger,
    directory: EntityDirectory,
    permissions: PermissionGate,
    cooldowns: CooldownGate,
    flood: Arc<FloodGuard>,
    conversations: ConversationRegistry,
    metrics: AdmissionMetrics,
}

impl AdmissionPipeline {
    /// Create a pipeline reading time from the host clock.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: AdmissionConfig, store: Arc<dyn AdmissionStore>) -> AdmissionResult<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create a pipeline with an explicit clock for cooldown expiry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` does not validate.
    pub fn with_clock(
        config: AdmissionConfig,
        store: Arc<dyn AdmissionStore>,
        clock: Arc<dyn Clock>,
    ) -> AdmissionResult<Self> {
        config.validate()?;

        let superusers = config.superuser_set();
        let resolver = AuthNodeResolver::new(Arc::clone(&store));
        let ledger = CooldownLedger::new(Arc::clone(&store), Arc::clone(&clock));

        let pipeline = Self {
            directory: EntityDirectory::new(Arc::clone(&store), *config.default_permission_level()),
            permissions: PermissionGate::new(resolver.clone()),
            cooldowns: CooldownGate::new(ledger.clone(), resolver.clone(), superusers.clone()),
            flood: Arc::new(FloodGuard::new(
                config.flood().clone(),
                superusers,
                ledger.clone(),
            )),
            conversations: ConversationRegistry::new(
                Arc::clone(&clock),
                config.conversation().ttl(),
            ),
            metrics: AdmissionMetrics::new(),
            resolver,
            ledger,
            store,
            clock,
            config,
        };
        info!(
            plugins = pipeline.config.plugins().len(),
            "Admission pipeline ready"
        );
        Ok(pipeline)
    }

    /// Decide whether `event` may reach the handler described by `policy`.
    ///
    /// Follow-ups in an open conversation with the same plugin are admitted
    /// without re-entering the gates, as long as the plugin and both
    /// entities are still enabled.
    #[instrument(
        skip(self, event, policy),
        fields(plugin = %policy.name(), user = %event.user_id, group = ?event.group_id)
    )]
    pub async fn admit(&self, event: &InboundEvent, policy: &PluginPolicy) -> Decision {
        let decision = if !*policy.enabled() {
            debug!("Plugin disabled");
            Decision::reject(RejectReason::Disabled)
        } else if self.conversations.continue_session(event, policy.name()) {
            match self.entities_enabled(event).await {
                Ok(true) => {
                    debug!("Conversation follow-up admitted");
                    self.metrics.record_follow_up();
                    return Decision::accept();
                }
                Ok(false) => {
                    debug!("Conversation follow-up from disabled entity");
                    Decision::reject(RejectReason::Disabled)
                }
                Err(e) => fail_closed(e),
            }
        } else {
            match self.run_gates(event, policy).await {
                Ok(decision) => decision,
                Err(e) => fail_closed(e),
            }
        };

        debug!(%decision, "Admission decided");
        self.metrics
            .record(policy.name(), event, &decision, self.clock.now());
        decision
    }

    /// Admit against the configured policy for `plugin`.
    ///
    /// Plugins without a configured policy are unrestricted.
    pub async fn admit_plugin(&self, event: &InboundEvent, plugin: &str) -> Decision {
        let policy = self.config.plugin_policy(plugin);
        self.admit(event, &policy).await
    }

    async fn entities_enabled(&self, event: &InboundEvent) -> StoreResult<bool> {
        if !self.directory.load_or_init(&event.user_ref()).await?.global_enabled {
            return Ok(false);
        }
        match event.group_ref() {
            Some(reference) => Ok(self.directory.load_or_init(&reference).await?.global_enabled),
            None => Ok(true),
        }
    }

    async fn run_gates(&self, event: &InboundEvent, policy: &PluginPolicy) -> StoreResult<Decision> {
        let user = self.directory.load_or_init(&event.user_ref()).await?;
        let group = match event.group_ref() {
            Some(reference) => Some(self.directory.load_or_init(&reference).await?),
            None => None,
        };

        let decision = self
            .permissions
            .check_event(
                &user,
                group.as_ref(),
                *policy.required_level(),
                policy.required_node().as_deref(),
            )
            .await?;
        if !decision.accepted {
            return Ok(decision);
        }

        let decision = self
            .cooldowns
            .check(
                &user.reference,
                group.as_ref().map(|g| &g.reference),
                policy.name(),
                policy.user_cooldown(),
                policy.group_cooldown(),
            )
            .await?;
        if !decision.accepted {
            return Ok(decision);
        }

        Ok(self.flood.observe(event).await)
    }

    /// Open a multi-turn conversation for the sender of an admitted event.
    ///
    /// Uses the configured TTL when `ttl` is `None`.
    pub fn begin_conversation(
        &self,
        event: &InboundEvent,
        plugin: &str,
        ttl: Option<Duration>,
    ) -> ConversationGuard {
        self.conversations.begin(event, plugin, ttl)
    }

    /// Plugin owning the sender's open conversation, if any.
    pub fn active_conversation(&self, event: &InboundEvent) -> Option<String> {
        self.conversations.active(event)
    }

    /// Operator handle sharing this pipeline's store and clock.
    pub fn operator(&self) -> Operator {
        Operator::new(
            Arc::clone(&self.store),
            self.resolver.clone(),
            self.ledger.clone(),
            self.directory.clone(),
        )
    }

    /// Start the housekeeping task on the current tokio runtime.
    pub fn spawn_reaper(&self) -> ReaperHandle {
        let reaper = self.config.reaper();
        ReaperHandle::spawn(
            self.ledger.clone(),
            Arc::clone(&self.flood),
            self.conversations.clone(),
            reaper.idle_counter(),
            reaper.interval(),
        )
    }

    /// Statistics sink.
    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }

    /// Flood detector.
    pub fn flood_guard(&self) -> &FloodGuard {
        &self.flood
    }

    /// Open conversations.
    pub fn conversations(&self) -> &ConversationRegistry {
        &self.conversations
    }

    /// Cooldown ledger.
    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    /// Auth node resolver.
    pub fn resolver(&self) -> &AuthNodeResolver {
        &self.resolver
    }

    /// Configuration the pipeline was built with.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }
}

fn fail_closed(error: StoreError) -> Decision {
    error!(error = %error, "Store failure during admission, rejecting");
    Decision::reject(RejectReason::StoreError)
}
