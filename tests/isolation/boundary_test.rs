/*!
 * Tenant Boundary Integration Tests
 */

use crate::support::harness;
use pretty_assertions::assert_eq;
use std::time::{Duration, SystemTime};
use tenant_guard::audit::{SecurityViolation, ViolationFilter, ViolationType};
use tenant_guard::monitoring::{EventQuery, SecurityEventType};
use tenant_guard::tenant::{
    QuotaResource, TenantConfigUpdate, TenantResourceMetrics, CROSS_TENANT_ACCESS_DENIED,
};
use tenant_guard::{ActorRole, BoundaryError, Severity};

#[test]
fn test_cross_tenant_denial_is_logged_under_target() {
    let h = harness();
    let boundary = h.guard.boundary();

    let decision = boundary.validate_member_access(
        "mallory",
        "dealer-1",
        "dealer-2",
        ActorRole::TenantAdmin,
        "export_customers",
    );
    assert!(!decision.allowed);
    assert_eq!(decision.reason.as_deref(), Some(CROSS_TENANT_ACCESS_DENIED));
    assert!(decision.violation_logged);

    let target = boundary
        .get_security_violations("dealer-2", &ViolationFilter::new())
        .unwrap();
    assert_eq!(target.len(), 1);
    assert_eq!(target[0].actor_id.as_deref(), Some("mallory"));
    assert_eq!(
        target[0].metadata.get("actor_role").map(String::as_str),
        Some("tenant_admin")
    );
    assert!(boundary
        .get_security_violations("dealer-1", &ViolationFilter::new())
        .unwrap()
        .is_empty());
}

#[test]
fn test_platform_roles_bypass_without_violation() {
    let h = harness();
    let boundary = h.guard.boundary();

    for role in [ActorRole::SuperAdmin, ActorRole::Admin] {
        let decision = boundary.validate_tenant_access("platform", "dealer-2", role, "audit");
        assert!(decision.allowed);
        assert_eq!(decision.reason, None);
    }
    assert!(boundary
        .get_security_violations("dealer-2", &ViolationFilter::new())
        .unwrap()
        .is_empty());
}

#[test]
fn test_violations_reach_the_monitor() {
    let h = harness();
    h.guard.boundary().validate_member_access(
        "mallory",
        "dealer-1",
        "dealer-2",
        ActorRole::User,
        "read_invoices",
    );
    h.guard.monitor().drain();

    let events = h.guard.monitor().get_security_events(
        "dealer-2",
        &EventQuery::new().event_type(SecurityEventType::CrossTenantAttempt),
    );
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].attempted_action.as_deref(), Some("read_invoices"));

    // Risk is attributed to the actor's home tenant
    let risk = h.guard.monitor().risk_score("dealer-1", "mallory");
    assert_eq!(risk.cross_tenant_attempts, 1);
    assert_eq!(risk.score, 10);
}

#[test]
fn test_violation_filters() {
    let h = harness();
    let boundary = h.guard.boundary();
    let hour_ago = SystemTime::now() - Duration::from_secs(3600);

    boundary
        .log_security_violation(
            SecurityViolation::new(
                "dealer-1",
                ViolationType::Other,
                Severity::Low,
                "Unusual export volume",
            )
            .with_timestamp(hour_ago - Duration::from_secs(60)),
        )
        .unwrap();
    for _ in 0..3 {
        boundary.validate_cross_tenant_operation("dealer-1", "dealer-9", "copy_inventory");
    }

    let all = boundary
        .get_security_violations("dealer-1", &ViolationFilter::new())
        .unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[3].violation_type, ViolationType::Other);

    let severe = boundary
        .get_security_violations("dealer-1", &ViolationFilter::new().severity(Severity::High))
        .unwrap();
    assert_eq!(severe.len(), 3);

    let recent = boundary
        .get_security_violations("dealer-1", &ViolationFilter::new().since(hour_ago).limit(2))
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent
        .iter()
        .all(|v| v.violation_type == ViolationType::CrossTenantOperation));
}

#[test]
fn test_config_update_merges_and_validates() {
    let h = harness();
    let boundary = h.guard.boundary();

    let update = TenantConfigUpdate {
        max_concurrent_queries: Some(25),
        data_region: Some("id-surabaya".to_string()),
        ..Default::default()
    };
    let merged = boundary.update_tenant_config("dealer-1", &update).unwrap();
    assert_eq!(merged.max_concurrent_queries, 25);
    assert_eq!(merged.data_region, "id-surabaya");
    assert_eq!(merged.max_database_connections, 20);
    assert_eq!(boundary.get_tenant_config("dealer-1"), merged);

    let invalid = TenantConfigUpdate {
        max_database_connections: Some(0),
        ..Default::default()
    };
    assert_eq!(
        boundary.update_tenant_config("dealer-1", &invalid).unwrap_err(),
        BoundaryError::InvalidQuota
    );
    assert_eq!(boundary.get_tenant_config("dealer-1"), merged);

    h.guard.monitor().drain();
    let changes = h.guard.monitor().get_security_events(
        "dealer-1",
        &EventQuery::new().event_type(SecurityEventType::ConfigChange),
    );
    assert_eq!(changes.len(), 1);
}

#[test]
fn test_resource_metrics_and_quota() {
    let h = harness();
    let boundary = h.guard.boundary();
    assert!(boundary.get_tenant_resource_metrics("dealer-1").is_none());
    assert!(!boundary.check_resource_quota("dealer-1").metrics_recorded);

    let mut metrics = TenantResourceMetrics::new("dealer-1");
    metrics.db_connections = 25;
    metrics.memory_usage_mb = 128;
    let report = boundary.update_tenant_resource_metrics(metrics).unwrap();

    assert!(!report.within_limits);
    assert_eq!(report.breaches.len(), 1);
    assert_eq!(report.breaches[0].resource, QuotaResource::DatabaseConnections);
    assert_eq!(
        boundary
            .get_tenant_resource_metrics("dealer-1")
            .unwrap()
            .db_connections,
        25
    );

    let mut invalid = TenantResourceMetrics::new("dealer-1");
    invalid.error_rate = 1.5;
    assert_eq!(
        boundary.update_tenant_resource_metrics(invalid).unwrap_err(),
        BoundaryError::InvalidMetrics
    );
}

#[test]
fn test_indonesian_compliance() {
    let h = harness();
    let boundary = h.guard.boundary();
    assert!(boundary.ensure_indonesian_compliance("dealer-1").compliant);

    let offshore = TenantConfigUpdate {
        data_region: Some("sg-singapore".to_string()),
        ..Default::default()
    };
    boundary.update_tenant_config("dealer-1", &offshore).unwrap();

    let report = boundary.ensure_indonesian_compliance("dealer-1");
    assert!(!report.compliant);
    assert!(!report.requirements.data_localization);
    assert!(report.requirements.data_encryption);
    assert!(report.requirements.audit_trail);
}
