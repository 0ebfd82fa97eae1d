//! Tests for the access decision engine

use super::*;
use crate::config::AuthzConfig;
use crate::model::{Department, DepartmentMembership, UserKind};
use crate::registry::{role_names, RegistryHandle};
use crate::storage::{MemoryStore, OrganizationStore};
use chrono::Utc;
use std::collections::HashSet as StdHashSet;

fn key(k: &str) -> CapabilityKey {
    CapabilityKey::new(k).unwrap()
}

fn engine_with_instructor() -> (DecisionEngine, Principal) {
    let store = std::sync::Arc::new(MemoryStore::new());
    store.add_department(Department::new("d-1", None));
    store.add_membership(DepartmentMembership {
        membership_id: "m-1".to_string(),
        user_id: "u-1".to_string(),
        department_id: "d-1".to_string(),
        roles: StdHashSet::from([role_names::INSTRUCTOR.to_string()]),
        is_primary: true,
        is_active: true,
        joined_at: Utc::now(),
        expires_at: None,
        version: 0,
    });
    let resolver = CapabilityResolver::new(
        Arc::new(RegistryHandle::default()),
        store as Arc<dyn OrganizationStore>,
        &AuthzConfig::default(),
    );
    (
        DecisionEngine::new(Arc::new(resolver)),
        Principal::new("u-1", UserKind::Staff),
    )
}

#[tokio::test]
async fn test_single_capability_allow_and_deny() {
    let (engine, staff) = engine_with_instructor();

    let allowed = engine
        .decide(
            &staff,
            &AccessRequirement::capability(key("course:view")),
            Some("d-1"),
            false,
        )
        .await
        .unwrap();
    assert!(allowed.allowed);
    assert!(allowed.reason.is_none());

    let denied = engine
        .decide(
            &staff,
            &AccessRequirement::capability(key("course:publish")),
            Some("d-1"),
            false,
        )
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.reason, Some(DenialReason::MissingCapability));
}

#[tokio::test]
async fn test_or_semantics_any_single_match_allows() {
    let (engine, staff) = engine_with_instructor();

    // Instructor holds question:edit but not course:publish
    let requirement =
        AccessRequirement::any_of(vec![key("course:publish"), key("question:edit")]).unwrap();
    let decision = engine
        .decide(&staff, &requirement, Some("d-1"), false)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_empty_any_of_rejected() {
    assert!(AccessRequirement::any_of(Vec::new()).is_err());
}

#[tokio::test]
async fn test_escalation_gate_precedes_capability_match() {
    let (engine, staff) = engine_with_instructor();

    // Full capability match, but no escalation credential
    let requirement = AccessRequirement::capability(key("course:view")).with_escalation();
    let decision = engine
        .decide(&staff, &requirement, Some("d-1"), false)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(DenialReason::EscalationRequired));

    // Same requirement with the credential present
    let decision = engine
        .decide(&staff, &requirement, Some("d-1"), true)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_admin_role_gate() {
    let (engine, staff) = engine_with_instructor();

    let requirement = AccessRequirement::capability(key("course:view"))
        .with_admin_roles([role_names::DEPT_ADMIN.to_string()]);
    let decision = engine
        .decide(&staff, &requirement, Some("d-1"), false)
        .await
        .unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.reason, Some(DenialReason::AdminRoleRequired));

    let requirement = AccessRequirement::capability(key("course:view"))
        .with_admin_roles([role_names::INSTRUCTOR.to_string()]);
    let decision = engine
        .decide(&staff, &requirement, Some("d-1"), false)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_missing_keys_never_serialized() {
    let (engine, staff) = engine_with_instructor();

    let decision = engine
        .decide(
            &staff,
            &AccessRequirement::capability(key("course:publish")),
            Some("d-1"),
            false,
        )
        .await
        .unwrap();

    // Diagnostics are available server-side
    assert_eq!(decision.missing_capabilities().len(), 1);

    // But never leak through serialization
    let json = serde_json::to_value(&decision).unwrap();
    assert!(json.get("missing").is_none());
    assert_eq!(json["reason"], "MISSING_CAPABILITY");
}

#[tokio::test]
async fn test_unknown_department_context_denies() {
    let (engine, staff) = engine_with_instructor();

    let decision = engine
        .decide(
            &staff,
            &AccessRequirement::capability(key("course:view")),
            Some("no-such-dept"),
            false,
        )
        .await
        .unwrap();
    assert!(!decision.allowed);
}
