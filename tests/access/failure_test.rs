/*!
 * Failure Path Tests
 * Store outages fail closed; audit failures never change a decision
 */

use crate::support::harness;
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tenant_guard::audit::{
    AuditStats, CheckFilter, DecisionSource, PermissionCheckRecord, SecurityViolation,
    ViolationFilter,
};
use tenant_guard::monitoring::{EventQuery, SecurityEventType, StatsPeriod};
use tenant_guard::tenant::HealthStatus;
use tenant_guard::{
    AccessGuard, ActorRole, AuditError, AuditResult, AuditSink, ErrorKind, GuardError,
    MemoryRoleStore, Permission, RoleStore,
};

mock! {
    pub Sink {}

    impl AuditSink for Sink {
        fn record_check(&self, record: PermissionCheckRecord) -> AuditResult<()>;
        fn record_violation(&self, violation: SecurityViolation) -> AuditResult<()>;
        fn checks(&self, tenant_id: &str, filter: &CheckFilter) -> AuditResult<Vec<PermissionCheckRecord>>;
        fn violations(&self, tenant_id: &str, filter: &ViolationFilter) -> AuditResult<Vec<SecurityViolation>>;
        fn stats(&self) -> AuditStats;
    }
}

fn broken_sink() -> MockSink {
    let mut sink = MockSink::new();
    sink.expect_record_check()
        .returning(|_| Err(AuditError::Timeout));
    sink.expect_record_violation()
        .returning(|_| Err(AuditError::Unavailable));
    sink.expect_violations()
        .returning(|_, _| Err(AuditError::Unavailable));
    sink.expect_checks().returning(|_, _| Ok(Vec::new()));
    sink.expect_stats().returning(AuditStats::default);
    sink
}

fn guard_with_broken_audit() -> (AccessGuard, Arc<MemoryRoleStore>) {
    let store = Arc::new(MemoryRoleStore::new());
    let guard = AccessGuard::builder()
        .with_store(store.clone())
        .with_audit(Arc::new(broken_sink()))
        .build()
        .unwrap();
    let viewer = store.role_by_name(None, "viewer").unwrap().unwrap();
    store
        .insert_assignment(
            tenant_guard::roles::AssignmentRequest::new("alice", viewer.id)
                .into_assignment("dealer-1".to_string()),
        )
        .unwrap();
    (guard, store)
}

#[test]
fn test_store_outage_fails_closed() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales");
    let evaluator = h.guard.evaluator("dealer-1");

    h.store.set_available(false);
    assert!(!evaluator.has("alice", Permission::VehicleRead));

    let err = evaluator.get_user_permissions("alice").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let checks = h
        .guard
        .audit()
        .checks("dealer-1", &CheckFilter::new())
        .unwrap();
    assert_eq!(checks[0].source, DecisionSource::StoreUnavailable);

    h.store.set_available(true);
    assert!(evaluator.has("alice", Permission::VehicleRead));
}

#[test]
fn test_outage_distinguishable_from_denial() {
    let h = harness();
    h.assign("dealer-1", "alice", "sales");
    h.store.set_available(false);
    h.guard.evaluator("dealer-1").has("alice", Permission::VehicleRead);
    h.store.set_available(true);

    let monitor = h.guard.monitor();
    monitor.drain();
    let stats = monitor.get_security_statistics("dealer-1", StatsPeriod::Day);
    assert_eq!(stats.statistics.permission_denials, 0);
    assert_eq!(stats.statistics.internal_errors, 1);
    assert_eq!(monitor.internal_error_count("dealer-1"), 1);

    let outages = monitor.get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::StorageOutage),
    );
    assert_eq!(outages.len(), 1);
    assert_eq!(outages[0].actor_id.as_deref(), Some("alice"));
}

#[test]
fn test_audit_failure_does_not_change_decision() {
    let (guard, _store) = guard_with_broken_audit();
    let evaluator = guard.evaluator("dealer-1");

    assert!(evaluator.has("alice", Permission::VehicleRead));
    assert!(!evaluator.has("alice", Permission::InvoiceApprove));

    guard.monitor().drain();
    assert_eq!(guard.monitor().internal_error_count("dealer-1"), 2);
    let failures = guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::AuditFailure),
    );
    assert_eq!(failures.len(), 2);
}

#[test]
fn test_boundary_denies_even_when_violation_unrecorded() {
    let (guard, _store) = guard_with_broken_audit();

    let decision = guard.boundary().validate_tenant_access(
        "dealer-1",
        "dealer-2",
        ActorRole::User,
        "read_invoices",
    );
    assert!(!decision.allowed);
    assert!(!decision.violation_logged);
}

#[test]
fn test_unreadable_audit_degrades_health() {
    let (guard, _store) = guard_with_broken_audit();

    let health = guard.boundary().get_isolation_health("dealer-1");
    assert!(health.degraded);
    assert!(!health.checks.audit_logging);
    assert_eq!(health.status, HealthStatus::Warning);
}

#[test]
fn test_build_fails_on_unavailable_store() {
    let store = Arc::new(MemoryRoleStore::new());
    store.set_available(false);

    let err = AccessGuard::builder()
        .with_store(store)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, GuardError::Store(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}
