//! Tests for multi-tier cooldown resolution.

mod test_utils;

use gatehouse_admission::{AuthNodeResolver, CooldownGate, CooldownLedger, Superusers};
use gatehouse_core::{CooldownKey, EntityRef, ManualClock, RejectReason};
use gatehouse_store::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use test_utils::epoch;

const PLUGIN: &str = "pixiv";
const GROUP_CD: Option<Duration> = Some(Duration::from_secs(60));
const USER_CD: Option<Duration> = Some(Duration::from_secs(30));

struct Fixture {
    gate: CooldownGate,
    ledger: CooldownLedger,
    resolver: AuthNodeResolver,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let ledger = CooldownLedger::new(store.clone(), clock.clone());
    let resolver = AuthNodeResolver::new(store);
    Fixture {
        gate: CooldownGate::new(ledger.clone(), resolver.clone(), Superusers::default()),
        ledger,
        resolver,
        clock,
    }
}

fn alice() -> EntityRef {
    EntityRef::user("bot1", "alice")
}

fn bob() -> EntityRef {
    EntityRef::user("bot1", "bob")
}

fn group() -> EntityRef {
    EntityRef::group("bot1", "g1")
}

#[tokio::test]
async fn test_fresh_group_cooldown_skips_user_write() {
    let f = fixture();
    let group = group();

    let decision = f
        .gate
        .check(&alice(), Some(&group), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();
    assert!(decision.accepted);

    assert!(
        f.ledger
            .get(&CooldownKey::plugin_group("g1", PLUGIN))
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        f.ledger
            .get(&CooldownKey::plugin_user("alice", PLUGIN))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_active_group_cooldown_rejects_other_members() {
    let f = fixture();
    let group = group();
    f.gate
        .check(&alice(), Some(&group), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();

    f.clock.advance(Duration::from_secs(20));
    let decision = f
        .gate
        .check(&bob(), Some(&group), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(RejectReason::CooldownPluginGroup));
    assert_eq!(decision.retry_after, Some(Duration::from_secs(40)));
    // The rejection does not charge bob's user window.
    assert!(
        f.ledger
            .get(&CooldownKey::plugin_user("bob", PLUGIN))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_user_uncharged_by_group_event_is_free_in_private() {
    let f = fixture();
    f.gate
        .check(&alice(), Some(&group()), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();

    // The group event freshly started the group window, so alice carries no
    // user window into a private chat.
    let private = f
        .gate
        .check(&alice(), None, PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();
    assert!(private.accepted);

    let again = f
        .gate
        .check(&alice(), None, PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();
    assert_eq!(again.reason, Some(RejectReason::CooldownPluginUser));
}

#[tokio::test]
async fn test_user_window_applies_when_plugin_has_no_group_duration() {
    let f = fixture();
    let group = group();
    assert!(
        f.gate
            .check(&alice(), Some(&group), PLUGIN, USER_CD, None)
            .await
            .unwrap()
            .accepted
    );
    let second = f
        .gate
        .check(&alice(), Some(&group), PLUGIN, USER_CD, None)
        .await
        .unwrap();
    assert_eq!(second.reason, Some(RejectReason::CooldownPluginUser));
    // Other members are unaffected.
    assert!(
        f.gate
            .check(&bob(), Some(&group), PLUGIN, USER_CD, None)
            .await
            .unwrap()
            .accepted
    );
}

#[tokio::test]
async fn test_group_window_reopens_after_expiry() {
    let f = fixture();
    let group = group();
    f.gate
        .check(&alice(), Some(&group), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();

    f.clock.advance(Duration::from_secs(60));
    assert!(
        f.gate
            .check(&bob(), Some(&group), PLUGIN, USER_CD, GROUP_CD)
            .await
            .unwrap()
            .accepted
    );
}

#[tokio::test]
async fn test_global_user_ban_wins_without_writes() {
    let f = fixture();
    f.ledger
        .upsert(CooldownKey::global_user("alice"), Duration::from_secs(600), "manual")
        .await
        .unwrap();

    let decision = f
        .gate
        .check(&alice(), Some(&group()), PLUGIN, USER_CD, GROUP_CD)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(RejectReason::CooldownGlobalUser));
    assert_eq!(decision.retry_after, Some(Duration::from_secs(600)));
    assert!(
        f.ledger
            .get(&CooldownKey::plugin_group("g1", PLUGIN))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_global_group_ban_is_not_skippable() {
    let f = fixture();
    let group = group();
    f.ledger
        .upsert(CooldownKey::global_group("g1"), Duration::from_secs(30), "manual")
        .await
        .unwrap();
    f.resolver
        .set(&alice(), "pixiv.skip_cd", true, false, None)
        .await
        .unwrap();

    let decision = f
        .gate
        .check(&alice(), Some(&group), PLUGIN, None, None)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(RejectReason::CooldownGlobalGroup));
}

#[tokio::test]
async fn test_skip_cooldown_on_group_exempts_every_member() {
    let f = fixture();
    let group = group();
    f.resolver
        .set(&group, "pixiv.skip_cd", true, false, None)
        .await
        .unwrap();

    for _ in 0..3 {
        for user in [alice(), bob()] {
            assert!(
                f.gate
                    .check(&user, Some(&group), PLUGIN, USER_CD, GROUP_CD)
                    .await
                    .unwrap()
                    .accepted
            );
        }
    }
    assert!(
        f.ledger
            .get(&CooldownKey::plugin_group("g1", PLUGIN))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_skip_cooldown_deny_does_not_exempt() {
    let f = fixture();
    f.resolver
        .set(&alice(), "pixiv.skip_cd", false, true, None)
        .await
        .unwrap();
    assert!(
        f.gate
            .check(&alice(), None, PLUGIN, USER_CD, None)
            .await
            .unwrap()
            .accepted
    );
    assert_eq!(
        f.gate
            .check(&alice(), None, PLUGIN, USER_CD, None)
            .await
            .unwrap()
            .reason,
        Some(RejectReason::CooldownPluginUser)
    );
}

#[tokio::test]
async fn test_superuser_bypasses_everything() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(epoch()));
    let ledger = CooldownLedger::new(store.clone(), clock);
    let gate = CooldownGate::new(
        ledger.clone(),
        AuthNodeResolver::new(store),
        Superusers::new(["alice".to_string()]),
    );
    ledger
        .upsert(CooldownKey::global_group("g1"), Duration::from_secs(30), "manual")
        .await
        .unwrap();

    for _ in 0..3 {
        assert!(
            gate.check(&alice(), Some(&group()), PLUGIN, USER_CD, GROUP_CD)
                .await
                .unwrap()
                .accepted
        );
    }
}

#[tokio::test]
async fn test_concurrent_first_uses_leave_one_window() {
    let f = fixture();
    let gate = Arc::new(f.gate);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let gate = Arc::clone(&gate);
        handles.push(tokio::spawn(async move {
            gate.check(&alice(), None, PLUGIN, USER_CD, None)
                .await
                .unwrap()
        }));
    }
    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().accepted {
            accepted += 1;
        }
    }
    // Racing first uses may all be admitted, but never fewer than one.
    assert!(accepted >= 1);
    assert_eq!(
        f.ledger
            .remaining(&CooldownKey::plugin_user("alice", PLUGIN))
            .await
            .unwrap(),
        Some(Duration::from_secs(30))
    );
}
