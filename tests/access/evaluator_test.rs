/*!
 * Permission Evaluator Integration Tests
 */

use crate::support::harness;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};
use tenant_guard::audit::{CheckFilter, DecisionSource};
use tenant_guard::roles::{AssignmentRequest, NewRole};
use tenant_guard::Permission;

#[test]
fn test_system_role_grants() {
    let h = harness();
    h.assign("dealer-1", "owner", "tenant_admin");
    let evaluator = h.guard.evaluator("dealer-1");

    assert!(evaluator.has("owner", Permission::VehicleDelete));
    assert!(evaluator.has("owner", Permission::TenantConfigure));
    assert!(evaluator.has_permission("owner", "invoice.approve"));
    assert!(!evaluator.has_permission("owner", "billing.refund"));
}

#[test]
fn test_platform_wildcard_covers_unknown_codes() {
    let h = harness();
    h.assign("platform", "root", "super_admin");

    assert!(h
        .guard
        .evaluator("platform")
        .has_permission("root", "anything.at_all"));
}

#[test]
fn test_grants_never_leak_across_tenants() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales_manager");

    assert!(h.guard.evaluator("dealer-1").has("alice", Permission::VehicleRead));
    assert!(!h.guard.evaluator("dealer-2").has("alice", Permission::VehicleRead));
    assert!(h
        .guard
        .evaluator("dealer-2")
        .get_user_permissions("alice")
        .unwrap()
        .is_empty());
}

#[test]
fn test_unknown_actor_is_denied() {
    let h = harness();
    assert!(!h.guard.evaluator("dealer-1").has("ghost", Permission::VehicleRead));
}

#[test]
fn test_assignment_window_respected() {
    let h = harness();
    let now = SystemTime::now();
    let hour = Duration::from_secs(3600);

    h.assign_request("dealer-1", "future", "viewer", |r| r.effective_from(now + hour));
    h.assign_request("dealer-1", "expired", "viewer", |r| {
        r.effective_from(now - hour * 2).effective_until(now - hour)
    });
    h.assign_request("dealer-1", "current", "viewer", |r| {
        r.effective_from(now - hour).effective_until(now + hour)
    });

    let evaluator = h.guard.evaluator("dealer-1");
    assert!(!evaluator.has("future", Permission::VehicleRead));
    assert!(!evaluator.has("expired", Permission::VehicleRead));
    assert!(evaluator.has("current", Permission::VehicleRead));
}

#[test]
fn test_every_check_is_audited() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales");
    let evaluator = h.guard.evaluator("dealer-1");

    assert!(evaluator.has("alice", Permission::VehicleRead));
    assert!(evaluator.has("alice", Permission::VehicleRead));
    assert!(!evaluator.has("alice", Permission::InvoiceApprove));

    let checks = h
        .guard
        .audit()
        .checks("dealer-1", &CheckFilter::new())
        .unwrap();
    assert_eq!(checks.len(), 3);
    assert_eq!(checks[0].permission, "invoice.approve");
    assert!(!checks[0].allowed);
    assert_eq!(checks[1].source, DecisionSource::Cache);
    assert_eq!(checks[2].source, DecisionSource::Store);

    let denied = h
        .guard
        .audit()
        .checks("dealer-1", &CheckFilter::new().denied_only())
        .unwrap();
    assert_eq!(denied.len(), 1);
}

#[test]
fn test_cache_serves_repeat_checks() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales");
    let evaluator = h.guard.evaluator("dealer-1");

    for _ in 0..5 {
        assert!(evaluator.has("alice", Permission::CustomerRead));
    }

    let stats = h.guard.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.size, 1);
}

#[test]
fn test_role_changes_visible_immediately() {
    let h = harness();
    h.assign("dealer-1", "owner", "tenant_admin");
    let manager = h.guard.role_manager("dealer-1");
    let evaluator = h.guard.evaluator("dealer-1");

    let role = manager
        .create_custom_role(
            "owner",
            NewRole::new("floor_lead", 40).with_permissions(["vehicle.read"]),
        )
        .unwrap();
    let assignment = manager
        .assign_role("owner", AssignmentRequest::new("bob", role.id))
        .unwrap();

    assert!(evaluator.has("bob", Permission::VehicleRead));
    assert!(!evaluator.has("bob", Permission::InvoiceApprove));

    let grants: BTreeSet<String> = ["vehicle.read", "invoice.approve"]
        .into_iter()
        .map(String::from)
        .collect();
    manager
        .update_role_permissions(&role.id, "owner", grants)
        .unwrap();
    assert!(evaluator.has("bob", Permission::InvoiceApprove));

    manager
        .revoke_assignment("owner", "bob", &assignment.id)
        .unwrap();
    assert!(!evaluator.has("bob", Permission::VehicleRead));
}

#[test]
fn test_effective_permissions_union() {
    let h = harness();
    h.assign("dealer-1", "carol", "mechanic");
    h.assign("dealer-1", "carol", "finance");

    let permissions = h
        .guard
        .evaluator("dealer-1")
        .get_user_permissions("carol")
        .unwrap();
    assert!(permissions.contains("vehicle.update"));
    assert!(permissions.contains("invoice.*"));
    assert!(!permissions.contains("customer.update"));
}

#[test]
fn test_manual_cache_clear() {
    let h = harness();
    h.assign("dealer-1", "alice", "viewer");
    let evaluator = h.guard.evaluator("dealer-1");

    assert!(evaluator.has("alice", Permission::ReportView));
    evaluator.clear_user_permission_cache("alice");
    assert_eq!(h.guard.cache_stats().size, 0);
}
