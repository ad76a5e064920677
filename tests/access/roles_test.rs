/*!
 * Role Manager Integration Tests
 */

use crate::support::{harness, Harness};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};
use tenant_guard::monitoring::{EventQuery, SecurityEventType};
use tenant_guard::roles::{AssignmentRequest, NewRole, Role};
use tenant_guard::store::SYSTEM_ROLES;
use tenant_guard::{ErrorKind, RoleError, RoleStore};

fn grants(codes: &[&str]) -> BTreeSet<String> {
    codes.iter().map(|code| code.to_string()).collect()
}

fn with_owner() -> Harness {
    let h = harness();
    h.assign("dealer-1", "owner", "tenant_admin");
    h
}

fn floor_lead(h: &Harness) -> Role {
    h.guard
        .role_manager("dealer-1")
        .create_custom_role(
            "owner",
            NewRole::new("floor_lead", 40)
                .with_display_name("Floor Lead")
                .with_permissions(["vehicle.read", "customer.*"]),
        )
        .unwrap()
}

#[test]
fn test_create_custom_role() {
    let h = with_owner();
    let role = floor_lead(&h);

    assert_eq!(role.name, "floor_lead");
    assert_eq!(role.display_name, "Floor Lead");
    assert_eq!(role.tenant_id.as_deref(), Some("dealer-1"));
    assert!(!role.is_system);
    assert_eq!(role.permissions, grants(&["customer.*", "vehicle.read"]));
}

#[test]
fn test_create_validation() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");

    let cases = [
        (NewRole::new("zero", 0), RoleError::InvalidRoleLevel),
        (NewRole::new("too_high", 101), RoleError::InvalidRoleLevel),
        (NewRole::new("   ", 10), RoleError::EmptyName),
        (
            NewRole::new("bad_grant", 10).with_permissions(["Vehicle Read"]),
            RoleError::InvalidPermission,
        ),
        (NewRole::new("viewer", 10), RoleError::DuplicateName),
    ];
    for (spec, expected) in cases {
        let err = manager.create_custom_role("owner", spec).unwrap_err();
        assert_eq!(err, expected);
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}

#[test]
fn test_duplicate_name_within_tenant() {
    let h = with_owner();
    floor_lead(&h);

    let err = h
        .guard
        .role_manager("dealer-1")
        .create_custom_role("owner", NewRole::new("floor_lead", 30))
        .unwrap_err();
    assert_eq!(err, RoleError::DuplicateName);

    h.assign("dealer-2", "owner2", "tenant_admin");
    assert!(h
        .guard
        .role_manager("dealer-2")
        .create_custom_role("owner2", NewRole::new("floor_lead", 30))
        .is_ok());
}

#[test]
fn test_hierarchy_rule() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");

    let err = manager
        .create_custom_role("owner", NewRole::new("regional", 90))
        .unwrap_err();
    assert_eq!(err, RoleError::InsufficientLevel);
    assert_eq!(err.kind(), ErrorKind::Protection);

    // No active role means no level at all
    assert_eq!(manager.actor_level("stranger").unwrap(), None);
    assert_eq!(
        manager
            .create_custom_role("stranger", NewRole::new("intern", 1))
            .unwrap_err(),
        RoleError::InsufficientLevel
    );

    // Equal level is allowed
    assert!(manager
        .create_custom_role("owner", NewRole::new("deputy", 80))
        .is_ok());
}

#[test]
fn test_assignment_respects_hierarchy() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let admin = h.store.role_by_name(None, "admin").unwrap().unwrap();

    assert_eq!(
        manager
            .assign_role("owner", AssignmentRequest::new("bob", admin.id))
            .unwrap_err(),
        RoleError::InsufficientLevel
    );

    h.guard.monitor().drain();
    let events = h.guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::PrivilegeEscalation),
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor_id.as_deref(), Some("owner"));
    assert_eq!(
        events[0].metadata.get("required_level").map(String::as_str),
        Some("90")
    );
}

#[test]
fn test_invalid_window_rejected() {
    let h = with_owner();
    let role = floor_lead(&h);
    let now = SystemTime::now();

    let request = AssignmentRequest::new("bob", role.id)
        .effective_from(now)
        .effective_until(now - Duration::from_secs(60));
    assert_eq!(
        h.guard
            .role_manager("dealer-1")
            .assign_role("owner", request)
            .unwrap_err(),
        RoleError::InvalidWindow
    );
}

#[test]
fn test_system_roles_are_protected() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let viewer = h.store.role_by_name(None, "viewer").unwrap().unwrap();

    assert_eq!(
        manager
            .update_role_permissions(&viewer.id, "owner", grants(&["*"]))
            .unwrap_err(),
        RoleError::SystemRoleProtected
    );
    assert_eq!(
        manager.delete_custom_role(&viewer.id, "owner").unwrap_err(),
        RoleError::SystemRoleProtected
    );

    let unchanged = h.store.role(&viewer.id).unwrap().unwrap();
    assert_eq!(unchanged.permissions, viewer.permissions);

    h.guard.monitor().drain();
    let tampering = h.guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::SystemRoleTampering),
    );
    assert_eq!(tampering.len(), 2);
}

#[test]
fn test_delete_blocked_while_assigned() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let role = floor_lead(&h);
    let assignment = manager
        .assign_role("owner", AssignmentRequest::new("bob", role.id))
        .unwrap();

    let err = manager.delete_custom_role(&role.id, "owner").unwrap_err();
    assert_eq!(err, RoleError::InUse(1));
    assert_eq!(err.kind(), ErrorKind::InUse);
    assert!(h.store.role(&role.id).unwrap().is_some());

    manager
        .revoke_assignment("owner", "bob", &assignment.id)
        .unwrap();
    manager.delete_custom_role(&role.id, "owner").unwrap();
    assert!(h.store.role(&role.id).unwrap().is_none());
}

#[test]
fn test_expired_assignment_does_not_block_delete() {
    let h = with_owner();
    let role = floor_lead(&h);
    let now = SystemTime::now();
    h.guard
        .role_manager("dealer-1")
        .assign_role(
            "owner",
            AssignmentRequest::new("bob", role.id)
                .effective_from(now - Duration::from_secs(7200))
                .effective_until(now - Duration::from_secs(3600)),
        )
        .unwrap();

    h.guard
        .role_manager("dealer-1")
        .delete_custom_role(&role.id, "owner")
        .unwrap();
    assert!(h
        .guard
        .role_manager("dealer-1")
        .member_assignments("bob")
        .unwrap()
        .is_empty());
}

#[test]
fn test_foreign_roles_are_invisible() {
    let h = with_owner();
    let role = floor_lead(&h);
    h.assign("dealer-2", "owner2", "tenant_admin");
    let other = h.guard.role_manager("dealer-2");

    assert_eq!(
        other
            .update_role_permissions(&role.id, "owner2", grants(&["*"]))
            .unwrap_err(),
        RoleError::NotFound
    );
    assert_eq!(
        other.delete_custom_role(&role.id, "owner2").unwrap_err(),
        RoleError::NotFound
    );
    assert_eq!(
        other
            .assign_role("owner2", AssignmentRequest::new("eve", role.id))
            .unwrap_err(),
        RoleError::NotFound
    );
}

#[test]
fn test_list_roles_scoped_to_tenant() {
    let h = with_owner();
    floor_lead(&h);

    let own = h.guard.role_manager("dealer-1").list_roles().unwrap();
    let other = h.guard.role_manager("dealer-2").list_roles().unwrap();

    assert_eq!(own.len(), SYSTEM_ROLES.len() + 1);
    assert_eq!(other.len(), SYSTEM_ROLES.len());
    assert!(other.iter().all(|role| role.is_system));
}

#[test]
fn test_update_rejects_invalid_grants() {
    let h = with_owner();
    let role = floor_lead(&h);

    assert_eq!(
        h.guard
            .role_manager("dealer-1")
            .update_role_permissions(&role.id, "owner", grants(&["vehicle."]))
            .unwrap_err(),
        RoleError::InvalidPermission
    );
}

#[test]
fn test_viewer_cannot_mint_wildcard_role() {
    let h = harness();
    h.assign("dealer-1", "clerk", "viewer");
    let manager = h.guard.role_manager("dealer-1");
    let evaluator = h.guard.evaluator("dealer-1");

    let err = manager
        .create_custom_role("clerk", NewRole::new("everything", 10).with_permissions(["*"]))
        .unwrap_err();
    assert_eq!(err, RoleError::MissingPermission("role.manage".into()));
    assert_eq!(err.kind(), ErrorKind::Protection);
    assert!(manager
        .list_roles()
        .unwrap()
        .iter()
        .all(|role| role.name != "everything"));

    let viewer = h.store.role_by_name(None, "viewer").unwrap().unwrap();
    assert_eq!(
        manager
            .assign_role("clerk", AssignmentRequest::new("clerk", viewer.id))
            .unwrap_err(),
        RoleError::MissingPermission("member.manage".into())
    );
    assert!(!evaluator.has_permission("clerk", "tenant.configure"));
    assert!(!evaluator.has_permission("clerk", "role.manage"));

    h.guard.monitor().drain();
    let events = h.guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::PrivilegeEscalation),
    );
    assert_eq!(events.len(), 2);
}

#[test]
fn test_grants_capped_by_actor_grants() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");

    assert_eq!(
        manager
            .create_custom_role("owner", NewRole::new("everything", 10).with_permissions(["*"]))
            .unwrap_err(),
        RoleError::GrantNotHeld("*".into())
    );

    // A role holding more than the assigner may not be handed out by them
    let root_role = {
        h.assign("dealer-1", "root", "super_admin");
        manager
            .create_custom_role(
                "root",
                NewRole::new("auditor", 10).with_permissions(["audit.view", "tenant.archive"]),
            )
            .unwrap()
    };
    assert_eq!(
        manager
            .assign_role("owner", AssignmentRequest::new("bob", root_role.id))
            .unwrap_err(),
        RoleError::GrantNotHeld("tenant.archive".into())
    );

    // Grants within the actor's own set are fine
    let lead = floor_lead(&h);
    assert!(manager
        .assign_role("owner", AssignmentRequest::new("bob", lead.id))
        .is_ok());
}
