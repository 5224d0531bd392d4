//! Multi-tier cooldown resolution.

use crate::{AuthNodeResolver, CooldownLedger, Superusers, skip_cooldown_node};
use gatehouse_core::{CooldownKey, Decision, EntityRef, RejectReason};
use gatehouse_error::StoreResult;
use std::time::Duration;
use tracing::{debug, instrument};

/// Checks and starts cooldown windows for one event.
///
/// Resolution order, first match wins:
///
/// 1. active global-user ban
/// 2. active global-group ban
/// 3. `<plugin>.skip_cd` allowed on the user or the group: accept
/// 4. plugin-group window (checked, or freshly started)
/// 5. plugin-user window, unless step 4 freshly started the group window
///
/// One event is never charged against both the group and the user window.
/// Steps 4 and 5 key off "freshly started", not "active": an active group
/// window rejects in step 4 and never reaches step 5.
#[derive(Clone)]
pub struct CooldownGate {
    ledger: CooldownLedger,
    resolver: AuthNodeResolver,
    superusers: Superusers,
}

impl CooldownGate {
    /// Create a gate.
    pub fn new(ledger: CooldownLedger, resolver: AuthNodeResolver, superusers: Superusers) -> Self {
        Self {
            ledger,
            resolver,
            superusers,
        }
    }

    /// Run the cooldown checks for `user` (in `group`, if any) invoking `plugin`.
    #[instrument(
        skip(self, user, group),
        fields(user = %user.id, group = ?group.map(|g| g.id.as_str()))
    )]
    pub async fn check(
        &self,
        user: &EntityRef,
        group: Option<&EntityRef>,
        plugin: &str,
        user_cooldown: Option<Duration>,
        group_cooldown: Option<Duration>,
    ) -> StoreResult<Decision> {
        if self.superusers.contains(&user.id) {
            debug!("Superuser bypasses cooldowns");
            return Ok(Decision::accept());
        }

        if let Some(left) = self
            .ledger
            .remaining(&CooldownKey::global_user(&user.id))
            .await?
        {
            return Ok(Decision::reject_for(RejectReason::CooldownGlobalUser, left));
        }

        if let Some(group) = group {
            if let Some(left) = self
                .ledger
                .remaining(&CooldownKey::global_group(&group.id))
                .await?
            {
                return Ok(Decision::reject_for(RejectReason::CooldownGlobalGroup, left));
            }
        }

        let holders: Vec<&EntityRef> = std::iter::once(user).chain(group).collect();
        if self
            .resolver
            .any_allows(&holders, &skip_cooldown_node(plugin))
            .await?
        {
            debug!("Skip-cooldown node allowed");
            return Ok(Decision::accept());
        }

        let mut group_started = false;
        if let (Some(duration), Some(group)) = (group_cooldown, group) {
            let key = CooldownKey::plugin_group(&group.id, plugin);
            if let Some(left) = self.ledger.remaining(&key).await? {
                return Ok(Decision::reject_for(RejectReason::CooldownPluginGroup, left));
            }
            self.ledger
                .upsert(key, duration, format!("{} group cooldown", plugin))
                .await?;
            group_started = true;
        }

        if let (Some(duration), false) = (user_cooldown, group_started) {
            let key = CooldownKey::plugin_user(&user.id, plugin);
            if let Some(left) = self.ledger.remaining(&key).await? {
                return Ok(Decision::reject_for(RejectReason::CooldownPluginUser, left));
            }
            self.ledger
                .upsert(key, duration, format!("{} user cooldown", plugin))
                .await?;
        }

        Ok(Decision::accept())
    }
}
