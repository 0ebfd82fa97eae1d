//! Tests for the role management service

use super::*;
use crate::config::AuthzConfig;
use crate::model::{
    AuditEvent, CapabilityKey, Department, GlobalAdminMembership, Principal, UserKind,
};
use crate::registry::{role_names, RegistryHandle};
use crate::resolver::CapabilityResolver;
use crate::storage::{AuditSink, MemoryStore, OrganizationStore};
use crate::utils::error::{AuthzError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<RegistryHandle>,
    service: RoleService,
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn key(k: &str) -> CapabilityKey {
    CapabilityKey::new(k).unwrap()
}

fn build_service(store: Arc<MemoryStore>, audit: Arc<dyn AuditSink>) -> (Arc<RegistryHandle>, RoleService) {
    let registry = Arc::new(RegistryHandle::default());
    let resolver = Arc::new(CapabilityResolver::new(
        Arc::clone(&registry),
        store.clone() as Arc<dyn OrganizationStore>,
        &AuthzConfig::default(),
    ));
    let service = RoleService::new(
        Arc::clone(&registry),
        store.clone(),
        store.clone(),
        store.clone(),
        audit,
        resolver,
    );
    (registry, service)
}

fn fixture() -> Fixture {
    init_test_tracing();
    let store = Arc::new(MemoryStore::new());
    store.add_department(Department::new("root-a", None));
    store.add_department(Department::new("dept-b", Some("root-a".to_string())));
    store.add_principal(Principal::new("staff-1", UserKind::Staff));
    store.add_principal(Principal::new("staff-2", UserKind::Staff));
    store.add_principal(Principal::new("learner-1", UserKind::Learner));
    store.add_principal(Principal::new("admin-1", UserKind::GlobalAdmin));
    store.add_principal(Principal::new("admin-2", UserKind::GlobalAdmin));

    let (registry, service) = build_service(store.clone(), store.clone() as Arc<dyn AuditSink>);
    Fixture {
        store,
        registry,
        service,
    }
}

fn global_admin_membership(id: &str, user: &str) -> GlobalAdminMembership {
    GlobalAdminMembership {
        membership_id: id.to_string(),
        user_id: user.to_string(),
        roles: HashSet::from([role_names::SYSTEM_ADMIN.to_string()]),
        is_active: true,
        joined_at: Utc::now(),
        expires_at: None,
        version: 0,
    }
}

fn assign(user: &str, dept: &str, role: &str) -> AssignRoleRequest {
    AssignRoleRequest {
        user_id: user.to_string(),
        department_id: dept.to_string(),
        role_name: role.to_string(),
        assigned_by: "operator-1".to_string(),
    }
}

#[tokio::test]
async fn test_assign_creates_membership_and_audits() {
    let fx = fixture();

    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    let AssignedMembership::Department(membership) = assigned else {
        panic!("expected department membership");
    };
    assert!(membership.is_active);
    assert!(membership.roles.contains(role_names::INSTRUCTOR));

    let events = fx.store.audit_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, "role.assign");
    assert_eq!(events[0].actor_id, "operator-1");
    assert!(events[0].before.is_none());
    assert!(events[0].after.is_some());
}

#[tokio::test]
async fn test_assign_held_role_is_conflict() {
    let fx = fixture();
    fx.service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    let err = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Conflict(_)));
}

#[tokio::test]
async fn test_assign_second_role_appends_to_membership() {
    let fx = fixture();
    let first = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();
    let second = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::CONTENT_ADMIN))
        .await
        .unwrap();

    // Same membership, grown role set
    assert_eq!(first.membership_id(), second.membership_id());
    let AssignedMembership::Department(membership) = second else {
        panic!("expected department membership");
    };
    assert_eq!(membership.roles.len(), 2);
}

#[tokio::test]
async fn test_assign_kind_mismatch_is_validation() {
    let fx = fixture();

    // content-admin targets staff; assigning it to a learner must fail,
    // never silently succeed
    let err = fx
        .service
        .assign_role(&assign("learner-1", "dept-b", role_names::CONTENT_ADMIN))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Validation(_)));
}

#[tokio::test]
async fn test_assign_unknown_targets_are_not_found() {
    let fx = fixture();

    let err = fx
        .service
        .assign_role(&assign("ghost", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));

    let err = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", "ghost-role"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));

    let err = fx
        .service
        .assign_role(&assign("staff-1", "ghost-dept", role_names::INSTRUCTOR))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
}

#[tokio::test]
async fn test_assign_reactivates_inactive_membership() {
    let fx = fixture();
    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();
    let membership_id = assigned.membership_id().to_string();

    // Removing the only role deactivates the membership
    fx.service
        .remove_role(&RemoveRoleRequest {
            user_id: "staff-1".to_string(),
            membership_id: membership_id.clone(),
            role_name: role_names::INSTRUCTOR.to_string(),
            removed_by: "operator-1".to_string(),
        })
        .await
        .unwrap();
    let stored = fx.store.membership(&membership_id).await.unwrap().unwrap();
    assert!(!stored.is_active);

    // Re-assigning reactivates the same record instead of duplicating
    let reassigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();
    assert_eq!(reassigned.membership_id(), membership_id);
    let stored = fx.store.membership(&membership_id).await.unwrap().unwrap();
    assert!(stored.is_active);
}

#[tokio::test]
async fn test_remove_role_keeps_record_for_audit() {
    let fx = fixture();
    fx.service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();
    fx.service
        .assign_role(&assign("staff-1", "dept-b", role_names::CONTENT_ADMIN))
        .await
        .unwrap();
    let membership = fx
        .store
        .membership_for_department("staff-1", "dept-b")
        .await
        .unwrap()
        .unwrap();

    fx.service
        .remove_role(&RemoveRoleRequest {
            user_id: "staff-1".to_string(),
            membership_id: membership.membership_id.clone(),
            role_name: role_names::INSTRUCTOR.to_string(),
            removed_by: "operator-1".to_string(),
        })
        .await
        .unwrap();

    // One role left: membership stays active
    let stored = fx
        .store
        .membership(&membership.membership_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.roles.len(), 1);
}

#[tokio::test]
async fn test_remove_role_not_held_is_not_found() {
    let fx = fixture();
    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    let err = fx
        .service
        .remove_role(&RemoveRoleRequest {
            user_id: "staff-1".to_string(),
            membership_id: assigned.membership_id().to_string(),
            role_name: role_names::CONTENT_ADMIN.to_string(),
            removed_by: "operator-1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::NotFound(_)));
}

#[tokio::test]
async fn test_last_system_admin_is_protected() {
    let fx = fixture();
    fx.store
        .add_global_membership(global_admin_membership("g-1", "admin-1"));

    let err = fx
        .service
        .remove_role(&RemoveRoleRequest {
            user_id: "admin-1".to_string(),
            membership_id: "g-1".to_string(),
            role_name: role_names::SYSTEM_ADMIN.to_string(),
            removed_by: "admin-1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::LastAdminProtected(_)));
}

#[tokio::test]
async fn test_second_system_admin_allows_removal() {
    let fx = fixture();
    fx.store
        .add_global_membership(global_admin_membership("g-1", "admin-1"));
    fx.store
        .add_global_membership(global_admin_membership("g-2", "admin-2"));

    fx.service
        .remove_role(&RemoveRoleRequest {
            user_id: "admin-1".to_string(),
            membership_id: "g-1".to_string(),
            role_name: role_names::SYSTEM_ADMIN.to_string(),
            removed_by: "admin-2".to_string(),
        })
        .await
        .unwrap();

    let stored = fx.store.global_membership("g-1").await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert!(stored.roles.is_empty());
}

#[tokio::test]
async fn test_concurrent_removals_cannot_empty_system_admins() {
    let fx = fixture();
    fx.store
        .add_global_membership(global_admin_membership("g-1", "admin-1"));
    fx.store
        .add_global_membership(global_admin_membership("g-2", "admin-2"));

    let remove = |user: &str, membership: &str| RemoveRoleRequest {
        user_id: user.to_string(),
        membership_id: membership.to_string(),
        role_name: role_names::SYSTEM_ADMIN.to_string(),
        removed_by: "operator-1".to_string(),
    };
    // Each removal alone would pass the live-count check; together they
    // must not drop the count to zero
    let req_first = remove("admin-1", "g-1");
    let req_second = remove("admin-2", "g-2");
    let (first, second) = tokio::join!(
        fx.service.remove_role(&req_first),
        fx.service.remove_role(&req_second),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AuthzError::LastAdminProtected(_)))));

    let live = [
        fx.store.global_membership("g-1").await.unwrap().unwrap(),
        fx.store.global_membership("g-2").await.unwrap().unwrap(),
    ]
    .iter()
    .filter(|m| m.is_active)
    .count();
    assert_eq!(live, 1);
}

#[tokio::test]
async fn test_update_membership_enforces_single_primary() {
    let fx = fixture();
    let first = fx
        .service
        .assign_role(&assign("staff-1", "root-a", role_names::DEPT_ADMIN))
        .await
        .unwrap();
    let second = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    fx.service
        .update_membership(
            first.membership_id(),
            &MembershipUpdate {
                is_primary: Some(true),
                ..Default::default()
            },
            "operator-1",
        )
        .await
        .unwrap();
    fx.service
        .update_membership(
            second.membership_id(),
            &MembershipUpdate {
                is_primary: Some(true),
                ..Default::default()
            },
            "operator-1",
        )
        .await
        .unwrap();

    let first_stored = fx
        .store
        .membership(first.membership_id())
        .await
        .unwrap()
        .unwrap();
    let second_stored = fx
        .store
        .membership(second.membership_id())
        .await
        .unwrap()
        .unwrap();
    assert!(!first_stored.is_primary);
    assert!(second_stored.is_primary);
}

#[tokio::test]
async fn test_update_membership_expiry() {
    let fx = fixture();
    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();
    let expiry = Utc::now() + chrono::Duration::days(30);

    let updated = fx
        .service
        .update_membership(
            assigned.membership_id(),
            &MembershipUpdate {
                expires_at: Some(expiry),
                ..Default::default()
            },
            "operator-1",
        )
        .await
        .unwrap();
    assert_eq!(updated.expires_at, Some(expiry));

    let cleared = fx
        .service
        .update_membership(
            assigned.membership_id(),
            &MembershipUpdate {
                clear_expires: true,
                ..Default::default()
            },
            "operator-1",
        )
        .await
        .unwrap();
    assert_eq!(cleared.expires_at, None);
}

#[tokio::test]
async fn test_create_custom_role_and_assign() {
    let fx = fixture();
    let role = fx
        .service
        .create_custom_role(CreateRoleRequest {
            name: "course-reviewer".to_string(),
            description: "Reviews course content before publication".to_string(),
            user_kind: UserKind::Staff,
            capabilities: vec![key("course:view"), key("report:view")],
            created_by: "operator-1".to_string(),
        })
        .await
        .unwrap();
    assert!(!role.is_built_in);

    // Visible through the refreshed registry snapshot
    assert!(fx.registry.load().contains_role("course-reviewer"));

    // And immediately assignable
    fx.service
        .assign_role(&assign("staff-1", "dept-b", "course-reviewer"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_custom_role_rejects_duplicates_and_empty() {
    let fx = fixture();

    let err = fx
        .service
        .create_custom_role(CreateRoleRequest {
            name: role_names::INSTRUCTOR.to_string(),
            description: String::new(),
            user_kind: UserKind::Staff,
            capabilities: vec![key("course:view")],
            created_by: "operator-1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Conflict(_)));

    let err = fx
        .service
        .create_custom_role(CreateRoleRequest {
            name: "empty-role".to_string(),
            description: String::new(),
            user_kind: UserKind::Staff,
            capabilities: Vec::new(),
            created_by: "operator-1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Validation(_)));
}

#[tokio::test]
async fn test_wildcard_authoring_requires_wildcard() {
    let fx = fixture();
    fx.store
        .add_global_membership(global_admin_membership("g-1", "admin-1"));

    let wildcard_role = |creator: &str| CreateRoleRequest {
        name: "shadow-admin".to_string(),
        description: String::new(),
        user_kind: UserKind::GlobalAdmin,
        capabilities: vec![CapabilityKey::system_wildcard()],
        created_by: creator.to_string(),
    };

    // staff-1 does not hold system:*
    let err = fx
        .service
        .create_custom_role(wildcard_role("staff-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Forbidden(_)));

    // admin-1 holds system:* through the system-admin role
    fx.service
        .create_custom_role(wildcard_role("admin-1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_builtin_roles_are_immutable() {
    let fx = fixture();

    let err = fx
        .service
        .update_role_access_rights(role_names::INSTRUCTOR, vec![key("course:view")], "operator-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ImmutableRole(_)));

    let err = fx
        .service
        .add_access_right(role_names::DEPT_ADMIN, key("system:*"), "operator-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ImmutableRole(_)));

    let err = fx
        .service
        .delete_custom_role(role_names::SYSTEM_ADMIN, true, "operator-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::ImmutableRole(_)));
}

#[tokio::test]
async fn test_access_right_mutation_on_custom_role() {
    let fx = fixture();
    fx.service
        .create_custom_role(CreateRoleRequest {
            name: "grader".to_string(),
            description: String::new(),
            user_kind: UserKind::Staff,
            capabilities: vec![key("question:view")],
            created_by: "operator-1".to_string(),
        })
        .await
        .unwrap();

    let role = fx
        .service
        .add_access_right("grader", key("question:edit"), "operator-1")
        .await
        .unwrap();
    assert_eq!(role.capabilities.len(), 2);

    let role = fx
        .service
        .remove_access_right("grader", &key("question:view"), "operator-1")
        .await
        .unwrap();
    assert_eq!(role.capabilities.len(), 1);

    // Removing the last capability would empty the role
    let err = fx
        .service
        .remove_access_right("grader", &key("question:edit"), "operator-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::Validation(_)));
}

#[tokio::test]
async fn test_delete_custom_role_in_use_and_force() {
    let fx = fixture();
    fx.service
        .create_custom_role(CreateRoleRequest {
            name: "grader".to_string(),
            description: String::new(),
            user_kind: UserKind::Staff,
            capabilities: vec![key("question:view")],
            created_by: "operator-1".to_string(),
        })
        .await
        .unwrap();
    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", "grader"))
        .await
        .unwrap();

    let err = fx
        .service
        .delete_custom_role("grader", false, "operator-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthzError::RoleInUse(_)));

    // Force strips the role and deactivates the emptied membership
    fx.service
        .delete_custom_role("grader", true, "operator-1")
        .await
        .unwrap();
    let stored = fx
        .store
        .membership(assigned.membership_id())
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.roles.contains("grader"));
    assert!(!stored.is_active);
    assert!(!fx.registry.load().contains_role("grader"));
}

#[tokio::test]
async fn test_bulk_assign_partial_failure() {
    let fx = fixture();
    let items = vec![
        assign("staff-1", "dept-b", role_names::INSTRUCTOR),
        assign("staff-2", "dept-b", role_names::INSTRUCTOR),
        // learner cannot hold a staff role
        assign("learner-1", "dept-b", role_names::CONTENT_ADMIN),
        assign("staff-1", "root-a", role_names::DEPT_ADMIN),
        assign("staff-2", "root-a", role_names::ENROLLMENT_ADMIN),
    ];

    let outcome = fx
        .service
        .bulk_assign_roles(items, &CancelFlag::new())
        .await;
    assert_eq!(outcome.succeeded, 4);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.cancelled, 0);
    assert_eq!(outcome.results[2].status, BulkItemStatus::Error);
    assert!(outcome.results[2].detail.as_ref().unwrap().contains("learner"));
    // Items after the failure were still processed
    assert_eq!(outcome.results[3].status, BulkItemStatus::Success);
    assert_eq!(outcome.results[4].status, BulkItemStatus::Success);
}

#[tokio::test]
async fn test_bulk_cancellation_reports_remainder() {
    let fx = fixture();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let outcome = fx
        .service
        .bulk_assign_roles(
            vec![
                assign("staff-1", "dept-b", role_names::INSTRUCTOR),
                assign("staff-2", "dept-b", role_names::INSTRUCTOR),
            ],
            &cancel,
        )
        .await;
    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.cancelled, 2);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.status == BulkItemStatus::Cancelled));

    // Nothing was committed
    assert!(fx
        .store
        .membership_for_department("staff-1", "dept-b")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_bulk_remove_partial_failure() {
    let fx = fixture();
    let assigned = fx
        .service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    let outcome = fx
        .service
        .bulk_remove_roles(
            vec![
                RemoveRoleRequest {
                    user_id: "staff-1".to_string(),
                    membership_id: assigned.membership_id().to_string(),
                    role_name: role_names::INSTRUCTOR.to_string(),
                    removed_by: "operator-1".to_string(),
                },
                RemoveRoleRequest {
                    user_id: "staff-2".to_string(),
                    membership_id: "no-such-membership".to_string(),
                    role_name: role_names::INSTRUCTOR.to_string(),
                    removed_by: "operator-1".to_string(),
                },
            ],
            &CancelFlag::new(),
        )
        .await;
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
}

/// Sink that always fails, to prove audit is best-effort
struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: AuditEvent) -> Result<()> {
        Err(AuthzError::storage("audit sink unavailable"))
    }
}

#[tokio::test]
async fn test_audit_failure_does_not_roll_back_mutation() {
    let store = Arc::new(MemoryStore::new());
    store.add_department(Department::new("dept-b", None));
    store.add_principal(Principal::new("staff-1", UserKind::Staff));
    let (_registry, service) = build_service(store.clone(), Arc::new(FailingAuditSink));

    let assigned = service
        .assign_role(&assign("staff-1", "dept-b", role_names::INSTRUCTOR))
        .await
        .unwrap();

    // The mutation committed despite the sink failure
    let stored = store
        .membership(assigned.membership_id())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_active);
}
