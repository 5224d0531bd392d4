//! Enable switch, auth nodes and permission levels.

use crate::AuthNodeResolver;
use gatehouse_core::{Decision, Entity, EntityRef, NodeDecision, RejectReason};
use gatehouse_error::StoreResult;
use gatehouse_store::AdmissionStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Loads entity settings, creating them on first interaction.
#[derive(Clone)]
pub struct EntityDirectory {
    store: Arc<dyn AdmissionStore>,
    default_level: i32,
}

impl EntityDirectory {
    /// Create a directory; new entities start at `default_level`.
    pub fn new(store: Arc<dyn AdmissionStore>, default_level: i32) -> Self {
        Self {
            store,
            default_level,
        }
    }

    /// Load an entity, persisting a fresh enabled one if it does not exist.
    ///
    /// Creation is insert-if-absent, so a row written concurrently by an
    /// operator wins over the defaults.
    #[instrument(skip(self), fields(entity = %reference))]
    pub async fn load_or_init(&self, reference: &EntityRef) -> StoreResult<Entity> {
        if let Some(entity) = self.store.get_entity(reference).await? {
            return Ok(entity);
        }

        let fresh = Entity::new(reference.clone(), self.default_level);
        let stored = self.store.create_entity_if_absent(&fresh).await?;
        if stored == fresh {
            info!(level = self.default_level, "Entity created on first interaction");
        }
        Ok(stored)
    }
}

/// Computes the enable / node / level decision.
///
/// Explicit node decisions strictly dominate levels: an `Allow` admits a
/// level-0 entity, a `Deny` rejects one at any level. The enable switch is
/// evaluated first and no node decision overrides it.
#[derive(Clone)]
pub struct PermissionGate {
    resolver: AuthNodeResolver,
}

impl PermissionGate {
    /// Create a gate using the given resolver.
    pub fn new(resolver: AuthNodeResolver) -> Self {
        Self { resolver }
    }

    /// Decision for a single entity.
    #[instrument(skip(self, entity), fields(entity = %entity.reference))]
    pub async fn check(
        &self,
        entity: &Entity,
        required_level: Option<i32>,
        required_node: Option<&str>,
    ) -> StoreResult<Decision> {
        if !entity.global_enabled {
            debug!("Entity disabled");
            return Ok(Decision::reject(RejectReason::Disabled));
        }

        let node_decision = match required_node {
            Some(node) => self.resolver.check(&entity.reference, node).await?,
            None => NodeDecision::Unset,
        };

        Ok(Self::decide(entity, node_decision, required_level))
    }

    /// Decision for an event: the sender, plus the group it was posted in.
    ///
    /// A disabled group rejects like a disabled user. When the user has no
    /// explicit decision on the node, the group's explicit decision applies.
    /// The level comparison always uses the user's level.
    #[instrument(skip_all, fields(user = %user.reference, group = ?group.map(|g| g.reference.id.as_str())))]
    pub async fn check_event(
        &self,
        user: &Entity,
        group: Option<&Entity>,
        required_level: Option<i32>,
        required_node: Option<&str>,
    ) -> StoreResult<Decision> {
        if !user.global_enabled || group.is_some_and(|g| !g.global_enabled) {
            debug!("User or group disabled");
            return Ok(Decision::reject(RejectReason::Disabled));
        }

        let node_decision = match required_node {
            Some(node) => {
                let from_user = self.resolver.check(&user.reference, node).await?;
                match (from_user, group) {
                    (NodeDecision::Unset, Some(group)) => {
                        self.resolver.check(&group.reference, node).await?
                    }
                    (decision, _) => decision,
                }
            }
            None => NodeDecision::Unset,
        };

        Ok(Self::decide(user, node_decision, required_level))
    }

    fn decide(entity: &Entity, node_decision: NodeDecision, required_level: Option<i32>) -> Decision {
        match node_decision {
            NodeDecision::Deny => {
                debug!("Explicit deny on node");
                return Decision::reject(RejectReason::DeniedNode);
            }
            NodeDecision::Allow => {
                debug!("Explicit allow on node");
                return Decision::accept();
            }
            NodeDecision::Unset => {}
        }

        match required_level {
            Some(required) if entity.permission_level < required => {
                debug!(
                    level = entity.permission_level,
                    required, "Permission level too low"
                );
                Decision::reject(RejectReason::InsufficientLevel)
            }
            _ => Decision::accept(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_store::MemoryStore;

    fn setup() -> (PermissionGate, AuthNodeResolver) {
        let resolver = AuthNodeResolver::new(Arc::new(MemoryStore::new()));
        (PermissionGate::new(resolver.clone()), resolver)
    }

    fn user(level: i32) -> Entity {
        Entity::new(EntityRef::user("bot1", "42"), level)
    }

    #[tokio::test]
    async fn test_no_requirements_accepts() {
        let (gate, _) = setup();
        assert!(gate.check(&user(0), None, None).await.unwrap().accepted);
    }

    #[tokio::test]
    async fn test_level_comparison_is_inclusive() {
        let (gate, _) = setup();
        assert!(gate.check(&user(20), Some(20), None).await.unwrap().accepted);
        assert_eq!(
            gate.check(&user(19), Some(20), None).await.unwrap().reason,
            Some(RejectReason::InsufficientLevel)
        );
    }

    #[tokio::test]
    async fn test_deny_beats_max_level() {
        let (gate, resolver) = setup();
        let entity = user(i32::MAX);
        resolver
            .set(&entity.reference, "pixiv.basic", false, true, None)
            .await
            .unwrap();
        let decision = gate
            .check(&entity, Some(0), Some("pixiv.basic"))
            .await
            .unwrap();
        assert_eq!(decision.reason, Some(RejectReason::DeniedNode));
    }

    #[tokio::test]
    async fn test_allow_beats_level_but_not_disable() {
        let (gate, resolver) = setup();
        let mut entity = user(0);
        resolver
            .set(&entity.reference, "pixiv.basic", true, false, None)
            .await
            .unwrap();
        assert!(
            gate.check(&entity, Some(100), Some("pixiv.basic"))
                .await
                .unwrap()
                .accepted
        );

        entity.global_enabled = false;
        assert_eq!(
            gate.check(&entity, Some(100), Some("pixiv.basic"))
                .await
                .unwrap()
                .reason,
            Some(RejectReason::Disabled)
        );
    }

    #[tokio::test]
    async fn test_event_group_fallback_and_precedence() {
        let (gate, resolver) = setup();
        let sender = user(0);
        let group = Entity::new(EntityRef::group("bot1", "7"), 0);

        resolver
            .set(&group.reference, "echo", true, false, None)
            .await
            .unwrap();
        assert!(
            gate.check_event(&sender, Some(&group), Some(10), Some("echo"))
                .await
                .unwrap()
                .accepted
        );

        // The user's own decision wins over the group's.
        resolver
            .set(&sender.reference, "echo", false, true, None)
            .await
            .unwrap();
        assert_eq!(
            gate.check_event(&sender, Some(&group), Some(10), Some("echo"))
                .await
                .unwrap()
                .reason,
            Some(RejectReason::DeniedNode)
        );
    }

    #[tokio::test]
    async fn test_event_disabled_group() {
        let (gate, _) = setup();
        let sender = user(100);
        let mut group = Entity::new(EntityRef::group("bot1", "7"), 0);
        group.global_enabled = false;
        assert_eq!(
            gate.check_event(&sender, Some(&group), None, None)
                .await
                .unwrap()
                .reason,
            Some(RejectReason::Disabled)
        );
    }

    #[tokio::test]
    async fn test_directory_creates_once() {
        let store = Arc::new(MemoryStore::new());
        let directory = EntityDirectory::new(store.clone(), 3);
        let reference = EntityRef::user("bot1", "42");

        let created = directory.load_or_init(&reference).await.unwrap();
        assert_eq!(created.permission_level, 3);
        assert!(created.global_enabled);

        let mut changed = created.clone();
        changed.permission_level = 9;
        store.upsert_entity(&changed).await.unwrap();
        assert_eq!(
            directory.load_or_init(&reference).await.unwrap().permission_level,
            9
        );
    }
}
