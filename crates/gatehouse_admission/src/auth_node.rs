//! Auth node resolution.
//!
//! The resolver is the only component that reads auth-node rows. Everything
//! else sees the three-valued [`NodeDecision`].

use crate::{AdmissionError, AdmissionErrorKind, AdmissionResult};
use gatehouse_core::{AuthNodeRecord, EntityRef, NodeDecision, NodeSetting};
use gatehouse_error::StoreResult;
use gatehouse_store::AdmissionStore;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};

static NODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+)*$").expect("Valid node regex")
});

/// Suffix of the node that exempts an entity from a plugin's cooldowns.
pub const SKIP_COOLDOWN_SUFFIX: &str = "skip_cd";

/// Node that exempts an entity from a plugin's cooldowns, e.g. `pixiv.skip_cd`.
pub fn skip_cooldown_node(plugin: &str) -> String {
    format!("{}.{}", plugin, SKIP_COOLDOWN_SUFFIX)
}

/// Check that a node is a dotted identifier such as `pixiv.allow_r18`.
///
/// # Errors
///
/// Returns `InvalidNode` for empty nodes, empty segments or characters
/// outside `[A-Za-z0-9_-]`.
pub fn validate_node(node: &str) -> AdmissionResult<()> {
    if NODE_PATTERN.is_match(node) {
        Ok(())
    } else {
        Err(AdmissionError::new(AdmissionErrorKind::InvalidNode {
            node: node.to_string(),
            reason: "expected dot-separated segments of letters, digits, '_' or '-'".to_string(),
        }))
    }
}

/// Resolves and edits explicit allow/deny overrides.
#[derive(Clone)]
pub struct AuthNodeResolver {
    store: Arc<dyn AdmissionStore>,
}

impl AuthNodeResolver {
    /// Create a resolver over a store.
    pub fn new(store: Arc<dyn AdmissionStore>) -> Self {
        Self { store }
    }

    /// Decision for `(entity, node)`; a missing row is `Unset`.
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn check(&self, entity: &EntityRef, node: &str) -> StoreResult<NodeDecision> {
        let decision = self
            .store
            .get_auth_node(entity, node)
            .await?
            .map(|record| record.decision())
            .unwrap_or(NodeDecision::Unset);
        debug!(%decision, "Resolved auth node");
        Ok(decision)
    }

    /// Whether any of the entities holds an explicit allow on the node.
    pub async fn any_allows(&self, entities: &[&EntityRef], node: &str) -> StoreResult<bool> {
        for entity in entities {
            if self.check(entity, node).await? == NodeDecision::Allow {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Upsert an override from its two flags.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousNode` when both `allow` and `deny` are true, before
    /// anything is written, and `InvalidNode` for malformed nodes.
    #[instrument(skip(self, info), fields(entity = %entity))]
    pub async fn set(
        &self,
        entity: &EntityRef,
        node: &str,
        allow: bool,
        deny: bool,
        info: Option<String>,
    ) -> AdmissionResult<()> {
        if allow && deny {
            return Err(AdmissionError::new(AdmissionErrorKind::AmbiguousNode {
                node: node.to_string(),
            }));
        }
        validate_node(node)?;

        self.store
            .set_auth_node(entity, node, AuthNodeRecord { allow, deny, info })
            .await?;
        info!(allow, deny, "Auth node set");
        Ok(())
    }

    /// Apply an operator setting; `Unset` deletes the override.
    pub async fn apply(
        &self,
        entity: &EntityRef,
        node: &str,
        setting: NodeSetting,
        info: Option<String>,
    ) -> AdmissionResult<()> {
        match setting {
            NodeSetting::Allow => self.set(entity, node, true, false, info).await,
            NodeSetting::Deny => self.set(entity, node, false, true, info).await,
            NodeSetting::Unset => self.delete(entity, node).await.map(|_| ()),
        }
    }

    /// Remove an override, reverting the node to `Unset`.
    ///
    /// # Returns
    ///
    /// `true` if an override existed
    #[instrument(skip(self), fields(entity = %entity))]
    pub async fn delete(&self, entity: &EntityRef, node: &str) -> AdmissionResult<bool> {
        let removed = self.store.delete_auth_node(entity, node).await?;
        info!(removed, "Auth node cleared");
        Ok(removed)
    }
}
