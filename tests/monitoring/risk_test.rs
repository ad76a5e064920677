/*!
 * Risk Scoring Integration Tests
 */

use crate::support::harness;
use pretty_assertions::assert_eq;
use tenant_guard::monitoring::{EventQuery, RiskLevel, SecurityEventType};
use tenant_guard::roles::NewRole;
use tenant_guard::Permission;

#[test]
fn test_clean_actor_is_low_risk() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales");
    for _ in 0..10 {
        h.guard.evaluator("dealer-1").has("alice", Permission::VehicleRead);
    }
    h.guard.monitor().drain();

    let risk = h.guard.monitor().risk_score("dealer-1", "alice");
    assert_eq!(risk.score, 0);
    assert_eq!(risk.level, RiskLevel::Low);
}

#[test]
fn test_enumeration_sweep_detected() {
    let h = harness();
    let evaluator = h.guard.evaluator("dealer-1");
    for permission in Permission::ALL {
        assert!(!evaluator.has("scanner", permission));
    }
    h.guard.monitor().drain();

    let risk = h.guard.monitor().risk_score("dealer-1", "scanner");
    assert!(risk.enumeration_detected);
    assert_eq!(risk.recent_denials, Permission::ALL.len());
    assert!(risk.level >= RiskLevel::High);

    let sweeps = h.guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::PermissionEnumeration),
    );
    assert_eq!(sweeps.len(), 1);
    assert_eq!(sweeps[0].actor_id.as_deref(), Some("scanner"));
}

#[test]
fn test_escalation_attempts_raise_risk() {
    let h = harness();
    h.assign("dealer-1", "clerk", "viewer");
    let manager = h.guard.role_manager("dealer-1");
    for level in [50, 60, 70] {
        manager
            .create_custom_role("clerk", NewRole::new(format!("grab_{level}"), level))
            .unwrap_err();
    }
    h.guard.monitor().drain();

    let risk = h.guard.monitor().risk_score("dealer-1", "clerk");
    assert_eq!(risk.escalation_attempts, 3);
    assert_eq!(risk.score, 45);
    assert_eq!(risk.level, RiskLevel::Medium);
}

#[test]
fn test_risk_is_per_tenant() {
    let h = harness();
    let evaluator = h.guard.evaluator("dealer-1");
    for _ in 0..5 {
        evaluator.has("alice", Permission::AuditView);
    }
    h.guard.monitor().drain();

    assert_eq!(h.guard.monitor().risk_score("dealer-1", "alice").score, 10);
    assert_eq!(h.guard.monitor().risk_score("dealer-2", "alice").score, 0);
}
