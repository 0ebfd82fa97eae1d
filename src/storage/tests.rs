//! Tests for the in-memory store

use super::*;
use crate::model::{AuditEvent, Department, DepartmentMembership, Principal, UserKind};
use chrono::Utc;
use std::collections::HashSet;

fn membership(id: &str, user: &str, dept: &str, version: u64) -> DepartmentMembership {
    DepartmentMembership {
        membership_id: id.to_string(),
        user_id: user.to_string(),
        department_id: dept.to_string(),
        roles: HashSet::from(["instructor".to_string()]),
        is_primary: false,
        is_active: true,
        joined_at: Utc::now(),
        expires_at: None,
        version,
    }
}

#[tokio::test]
async fn test_principal_lookup() {
    let store = MemoryStore::new();
    store.add_principal(Principal::new("u-1", UserKind::Staff));

    let found = store.principal("u-1").await.unwrap();
    assert_eq!(found.unwrap().kind, UserKind::Staff);
    assert!(store.principal("u-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_children_lookup() {
    let store = MemoryStore::new();
    store.add_department(Department::new("a", None));
    store.add_department(Department::new("b", Some("a".to_string())));
    store.add_department(Department::new("c", Some("a".to_string())));
    store.add_department(Department::new("d", Some("b".to_string())));

    let mut children: Vec<String> = store
        .children_of("a")
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    children.sort();
    assert_eq!(children, vec!["b".to_string(), "c".to_string()]);
    assert!(store.children_of("d").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_insert_membership_rejects_duplicate_id() {
    let store = MemoryStore::new();
    store
        .insert_membership(membership("m-1", "u-1", "d-1", 0))
        .await
        .unwrap();
    let err = store
        .insert_membership(membership("m-1", "u-1", "d-1", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::error::AuthzError::Conflict(_)));
}

#[tokio::test]
async fn test_update_membership_cas() {
    let store = MemoryStore::new();
    store.add_membership(membership("m-1", "u-1", "d-1", 3));

    // Stale version is rejected
    let err = store
        .update_membership(membership("m-1", "u-1", "d-1", 3), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, crate::utils::error::AuthzError::Conflict(_)));

    // Matching version succeeds and bumps
    store
        .update_membership(membership("m-1", "u-1", "d-1", 3), 3)
        .await
        .unwrap();
    let stored = store.membership("m-1").await.unwrap().unwrap();
    assert_eq!(stored.version, 4);
}

#[tokio::test]
async fn test_memberships_with_role() {
    let store = MemoryStore::new();
    store.add_membership(membership("m-1", "u-1", "d-1", 0));
    let mut other = membership("m-2", "u-2", "d-2", 0);
    other.roles = HashSet::from(["content-admin".to_string()]);
    store.add_membership(other);

    let refs = store.memberships_with_role("instructor").await.unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].membership_id, "m-1");
}

#[tokio::test]
async fn test_audit_append() {
    let store = MemoryStore::new();
    store
        .record(AuditEvent::new("role.assign", "admin", "m-1"))
        .await
        .unwrap();
    store
        .record(AuditEvent::new("role.remove", "admin", "m-1"))
        .await
        .unwrap();

    let events = store.audit_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "role.assign");
    assert_eq!(events[1].action, "role.remove");
}
