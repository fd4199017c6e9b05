//! Behaviour every `UserStore` backend has to share.

use super::repo_types::STATUS_ACTIVE;
use super::{NewUser, StoreError, UserStore};

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        password_hash: "$pbkdf2-sha256$i=1000,l=32$c2FsdA$aGFzaA".to_string(),
    }
}

pub async fn insert_then_find(store: &dyn UserStore) {
    let created = store.insert(new_user("alice")).await.expect("insert");
    assert_eq!(created.username, "alice");
    assert_eq!(created.status, STATUS_ACTIVE);

    let found = store
        .find_by_username("alice")
        .await
        .expect("lookup")
        .expect("alice exists");
    assert_eq!(found.id, created.id);
    assert_eq!(found.email.as_deref(), Some("alice@example.com"));
    assert_eq!(found.password_hash, created.password_hash);
}

pub async fn duplicate_username_is_rejected(store: &dyn UserStore) {
    let first = store.insert(new_user("bob")).await.expect("first insert");

    let mut again = new_user("bob");
    again.email = None;
    let err = store.insert(again).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateUsername(ref name) if name == "bob"));

    // the original row is untouched
    let found = store.find_by_username("bob").await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.email.as_deref(), Some("bob@example.com"));
}

pub async fn ids_increase(store: &dyn UserStore) {
    let a = store.insert(new_user("u1")).await.unwrap();
    let b = store.insert(new_user("u2")).await.unwrap();
    let c = store.insert(new_user("u3")).await.unwrap();
    assert!(a.id < b.id && b.id < c.id);
}

pub async fn unknown_username_is_none(store: &dyn UserStore) {
    store.insert(new_user("carol")).await.unwrap();
    assert!(store.find_by_username("dave").await.unwrap().is_none());
    assert!(store.find_by_username("Carol").await.unwrap().is_none());
}
