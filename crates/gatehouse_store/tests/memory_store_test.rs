//! Tests for the in-memory admission store.

use chrono::{TimeDelta, Utc};
use gatehouse_core::{AuthNodeRecord, CooldownEvent, CooldownKey, Entity, EntityRef};
use gatehouse_store::{AdmissionStore, MemoryStore};
use std::sync::Arc;

#[tokio::test]
async fn test_entity_roundtrip() {
    let store = MemoryStore::new();
    let user = EntityRef::user("bot1", "42");

    assert!(store.get_entity(&user).await.unwrap().is_none());

    let mut entity = Entity::new(user.clone(), 0);
    store.upsert_entity(&entity).await.unwrap();

    entity.permission_level = 50;
    entity.global_enabled = false;
    store.upsert_entity(&entity).await.unwrap();

    let loaded = store.get_entity(&user).await.unwrap().unwrap();
    assert_eq!(loaded.permission_level, 50);
    assert!(!loaded.global_enabled);
}

#[tokio::test]
async fn test_create_if_absent_keeps_existing_row() {
    let store = MemoryStore::new();
    let user = EntityRef::user("bot1", "42");

    let fresh = Entity::new(user.clone(), 0);
    assert_eq!(store.create_entity_if_absent(&fresh).await.unwrap(), fresh);

    let mut promoted = fresh.clone();
    promoted.permission_level = 80;
    store.upsert_entity(&promoted).await.unwrap();

    assert_eq!(store.create_entity_if_absent(&fresh).await.unwrap(), promoted);
    assert_eq!(store.get_entity(&user).await.unwrap().unwrap(), promoted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_agree_on_one_row() {
    let store = Arc::new(MemoryStore::new());
    let user = EntityRef::user("bot1", "42");

    let mut handles = Vec::new();
    for level in 0..16 {
        let store = Arc::clone(&store);
        let entity = Entity::new(user.clone(), level);
        handles.push(tokio::spawn(async move {
            store.create_entity_if_absent(&entity).await.unwrap()
        }));
    }
    let mut winners = Vec::new();
    for handle in handles {
        winners.push(handle.await.unwrap());
    }

    let stored = store.get_entity(&user).await.unwrap().unwrap();
    assert!(winners.iter().all(|entity| *entity == stored));
}

#[tokio::test]
async fn test_entities_are_scoped_per_bot_and_kind() {
    let store = MemoryStore::new();
    store
        .upsert_entity(&Entity::new(EntityRef::user("bot1", "42"), 10))
        .await
        .unwrap();

    assert!(
        store
            .get_entity(&EntityRef::user("bot2", "42"))
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .get_entity(&EntityRef::group("bot1", "42"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_auth_node_overwrite_and_delete() {
    let store = MemoryStore::new();
    let user = EntityRef::user("bot1", "42");

    store
        .set_auth_node(
            &user,
            "pixiv.allow_r18",
            AuthNodeRecord {
                allow: true,
                deny: false,
                info: None,
            },
        )
        .await
        .unwrap();
    store
        .set_auth_node(
            &user,
            "pixiv.allow_r18",
            AuthNodeRecord {
                allow: false,
                deny: true,
                info: Some("abuse".to_string()),
            },
        )
        .await
        .unwrap();

    let record = store
        .get_auth_node(&user, "pixiv.allow_r18")
        .await
        .unwrap()
        .unwrap();
    assert!(record.deny);
    assert!(!record.allow);
    assert_eq!(record.info.as_deref(), Some("abuse"));

    assert!(store.delete_auth_node(&user, "pixiv.allow_r18").await.unwrap());
    assert!(
        store
            .get_auth_node(&user, "pixiv.allow_r18")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_cooldown_upsert_replaces_without_stacking() {
    let store = MemoryStore::new();
    let key = CooldownKey::plugin_user("42", "echo");
    let now = Utc::now();

    store
        .upsert_cooldown(CooldownEvent {
            key: key.clone(),
            expires_at: now + TimeDelta::seconds(600),
            description: "first".to_string(),
        })
        .await
        .unwrap();
    store
        .upsert_cooldown(CooldownEvent {
            key: key.clone(),
            expires_at: now + TimeDelta::seconds(30),
            description: "second".to_string(),
        })
        .await
        .unwrap();

    let row = store.get_cooldown(&key).await.unwrap().unwrap();
    assert_eq!(row.expires_at, now + TimeDelta::seconds(30));
    assert_eq!(row.description, "second");
    assert_eq!(store.cooldown_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_leave_one_row() {
    let store = Arc::new(MemoryStore::new());
    let key = CooldownKey::plugin_group("7", "echo");
    let now = Utc::now();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move {
                store
                    .upsert_cooldown(CooldownEvent {
                        key,
                        expires_at: now + TimeDelta::seconds(60 + i),
                        description: format!("writer {i}"),
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.cooldown_count(), 1);
    let row = store.get_cooldown(&key).await.unwrap().unwrap();
    assert!(row.expires_at >= now + TimeDelta::seconds(60));
    assert!(row.expires_at < now + TimeDelta::seconds(76));
}
