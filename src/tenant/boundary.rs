/*!
 * Tenant Boundary
 * Coarse tenant-scope gate, tenant configuration and isolation health
 */

use super::config::{
    ComplianceReport, QuotaReport, TenantConfig, TenantConfigUpdate, TenantResourceMetrics,
};
use super::health::{assess, IsolationChecks, IsolationHealth};
use crate::audit::trail::AuditSink;
use crate::audit::types::{SecurityViolation, ViolationFilter, ViolationType};
use crate::core::config::HealthThresholds;
use crate::core::errors::BoundaryResult;
use crate::core::types::{ActorRole, Severity, TenantId};
use crate::monitoring::events::{SecurityEvent, SecurityEventType};
use crate::monitoring::signals::{InternalErrorKind, SecuritySignal, SignalSender};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Denial reason for a cross-tenant access attempt
pub const CROSS_TENANT_ACCESS_DENIED: &str = "Cross-tenant access denied";
/// Denial reason for a cross-tenant data operation
pub const CROSS_TENANT_OPERATION_DENIED: &str = "Cross-tenant operation not permitted";
/// Denial reason when a tenant id is missing
pub const MISSING_TENANT_CONTEXT: &str = "Missing tenant context";

/// Result of `validate_tenant_access`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    /// A violation was durably recorded before this decision was returned
    pub violation_logged: bool,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            violation_logged: false,
        }
    }

    fn deny(reason: &'static str, violation_logged: bool) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            violation_logged,
        }
    }
}

/// Result of `validate_cross_tenant_operation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Tenant isolation gate
///
/// Tenant configuration is materialised lazily with defaults; metrics hold
/// only the latest snapshot per tenant.
pub struct TenantBoundary {
    configs: DashMap<TenantId, TenantConfig, RandomState>,
    metrics: DashMap<TenantId, TenantResourceMetrics, RandomState>,
    audit: Arc<dyn AuditSink>,
    thresholds: HealthThresholds,
    signals: SignalSender,
}

impl TenantBoundary {
    pub fn new(
        audit: Arc<dyn AuditSink>,
        thresholds: HealthThresholds,
        signals: SignalSender,
    ) -> Self {
        Self {
            configs: DashMap::with_hasher(RandomState::new()),
            metrics: DashMap::with_hasher(RandomState::new()),
            audit,
            thresholds,
            signals,
        }
    }

    /// Gate an actor of `actor_tenant_id` acting on `target_tenant_id`
    ///
    /// Platform administrators pass regardless of tenant; everyone else only
    /// within their own tenant. A denial is recorded as a violation before
    /// this returns.
    pub fn validate_tenant_access(
        &self,
        actor_tenant_id: &str,
        target_tenant_id: &str,
        actor_role: ActorRole,
        action: &str,
    ) -> AccessDecision {
        self.gate(None, actor_tenant_id, target_tenant_id, actor_role, action)
    }

    /// Same gate as `validate_tenant_access`, attributing any violation to
    /// `actor_id` so it feeds that actor's risk score
    pub fn validate_member_access(
        &self,
        actor_id: &str,
        actor_tenant_id: &str,
        target_tenant_id: &str,
        actor_role: ActorRole,
        action: &str,
    ) -> AccessDecision {
        self.gate(
            Some(actor_id),
            actor_tenant_id,
            target_tenant_id,
            actor_role,
            action,
        )
    }

    fn gate(
        &self,
        actor_id: Option<&str>,
        actor_tenant_id: &str,
        target_tenant_id: &str,
        actor_role: ActorRole,
        action: &str,
    ) -> AccessDecision {
        if actor_role.bypasses_tenant_boundary() {
            debug!(
                actor_tenant_id,
                target_tenant_id,
                role = %actor_role,
                "Tenant boundary bypassed by platform role"
            );
            return AccessDecision::allow();
        }
        if actor_tenant_id.is_empty() || target_tenant_id.is_empty() {
            warn!(role = %actor_role, "Tenant access without tenant context");
            return AccessDecision::deny(MISSING_TENANT_CONTEXT, false);
        }
        if actor_tenant_id == target_tenant_id {
            return AccessDecision::allow();
        }

        warn!(
            actor_tenant_id,
            target_tenant_id,
            role = %actor_role,
            action,
            "Cross-tenant access denied"
        );
        let mut violation = SecurityViolation::new(
            target_tenant_id,
            ViolationType::CrossTenantAccess,
            Severity::High,
            CROSS_TENANT_ACCESS_DENIED,
        )
        .with_metadata("actor_tenant_id", actor_tenant_id)
        .with_metadata("actor_role", actor_role.as_str())
        .with_metadata("action", action);
        if let Some(actor_id) = actor_id {
            violation = violation.with_actor(actor_id);
        }

        let logged = self.record(violation);
        AccessDecision::deny(CROSS_TENANT_ACCESS_DENIED, logged)
    }

    /// Whether data may move from `source_tenant_id` to `dest_tenant_id`
    ///
    /// No role bypasses this check.
    pub fn validate_cross_tenant_operation(
        &self,
        source_tenant_id: &str,
        dest_tenant_id: &str,
        operation: &str,
    ) -> OperationCheck {
        if source_tenant_id.is_empty() || dest_tenant_id.is_empty() {
            return OperationCheck {
                valid: false,
                reason: Some(MISSING_TENANT_CONTEXT.to_string()),
            };
        }
        if source_tenant_id == dest_tenant_id {
            return OperationCheck {
                valid: true,
                reason: None,
            };
        }

        warn!(source_tenant_id, dest_tenant_id, operation, "Cross-tenant operation rejected");
        let violation = SecurityViolation::new(
            source_tenant_id,
            ViolationType::CrossTenantOperation,
            Severity::High,
            CROSS_TENANT_OPERATION_DENIED,
        )
        .with_metadata("dest_tenant_id", dest_tenant_id)
        .with_metadata("action", operation);
        self.record(violation);

        OperationCheck {
            valid: false,
            reason: Some(CROSS_TENANT_OPERATION_DENIED.to_string()),
        }
    }

    /// Configuration of a tenant, defaults on first access
    pub fn get_tenant_config(&self, tenant_id: &str) -> TenantConfig {
        if let Some(config) = self.configs.get(tenant_id) {
            return config.clone();
        }
        self.configs
            .entry(tenant_id.to_string())
            .or_default()
            .clone()
    }

    /// Merge a partial update and return the stored configuration
    pub fn update_tenant_config(
        &self,
        tenant_id: &str,
        update: &TenantConfigUpdate,
    ) -> BoundaryResult<TenantConfig> {
        let merged = {
            let mut entry = self.configs.entry(tenant_id.to_string()).or_default();
            let merged = update.apply(&entry)?;
            *entry = merged.clone();
            merged
        };

        let changed = update.changed_fields().join(",");
        info!(tenant_id, fields = %changed, "Tenant configuration updated");
        self.signals.publish(SecuritySignal::Event(
            SecurityEvent::new(tenant_id, SecurityEventType::ConfigChange, Severity::Low)
                .with_action("update_tenant_config")
                .with_metadata("fields", changed),
        ));
        Ok(merged)
    }

    /// Replace the tenant's snapshot and report quota usage
    ///
    /// Exceeding a quota records a `QuotaExceeded` violation.
    pub fn update_tenant_resource_metrics(
        &self,
        metrics: TenantResourceMetrics,
    ) -> BoundaryResult<QuotaReport> {
        metrics.validate()?;
        let tenant_id = metrics.tenant_id.clone();
        let config = self.get_tenant_config(&tenant_id);
        let report = QuotaReport::evaluate(&tenant_id, &config, Some(&metrics));
        self.metrics.insert(tenant_id.clone(), metrics);

        if !report.within_limits {
            let mut violation = SecurityViolation::new(
                tenant_id.as_str(),
                ViolationType::QuotaExceeded,
                Severity::Medium,
                "Tenant resource quota exceeded",
            );
            for breach in &report.breaches {
                violation = violation.with_metadata(
                    breach.resource.as_str(),
                    format!("{}/{}", breach.current, breach.limit),
                );
            }
            self.record(violation);
        }
        Ok(report)
    }

    pub fn get_tenant_resource_metrics(&self, tenant_id: &str) -> Option<TenantResourceMetrics> {
        self.metrics.get(tenant_id).map(|m| m.clone())
    }

    /// Current snapshot compared with the tenant's quotas
    pub fn check_resource_quota(&self, tenant_id: &str) -> QuotaReport {
        let config = self.get_tenant_config(tenant_id);
        let metrics = self.get_tenant_resource_metrics(tenant_id);
        QuotaReport::evaluate(tenant_id, &config, metrics.as_ref())
    }

    pub fn ensure_indonesian_compliance(&self, tenant_id: &str) -> ComplianceReport {
        ComplianceReport::evaluate(tenant_id, &self.get_tenant_config(tenant_id))
    }

    /// Isolation status from configuration and violations in the health window
    ///
    /// An unreadable audit trail yields a degraded report, never an error.
    pub fn get_isolation_health(&self, tenant_id: &str) -> IsolationHealth {
        let now = SystemTime::now();
        let config = self.get_tenant_config(tenant_id);
        let since = now
            .checked_sub(self.thresholds.window)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let (recent, severe, degraded) = match self
            .audit
            .violations(tenant_id, &ViolationFilter::new().since(since))
        {
            Ok(violations) => {
                let severe = violations.iter().filter(|v| v.severity.is_severe()).count();
                (violations.len(), severe, false)
            }
            Err(err) => {
                warn!(tenant_id, error = %err, "Isolation health degraded");
                (0, 0, true)
            }
        };

        let checks = IsolationChecks {
            database_isolation: config.enable_cross_tenant_prevention,
            compliance: ComplianceReport::evaluate(tenant_id, &config).compliant,
            audit_logging: config.enable_audit_logging && !degraded,
            resource_limits: self.check_resource_quota(tenant_id).within_limits,
        };
        let status = assess(&checks, recent, severe, degraded, &self.thresholds);

        IsolationHealth {
            tenant_id: tenant_id.to_string(),
            status,
            checks,
            recent_violations: recent,
            high_severity_violations: severe,
            degraded,
            checked_at: now,
        }
    }

    /// Record a violation and forward it to the monitor
    pub fn log_security_violation(&self, violation: SecurityViolation) -> BoundaryResult<()> {
        warn!(
            tenant_id = %violation.tenant_id,
            violation_type = violation.violation_type.as_str(),
            severity = %violation.severity,
            "Security violation"
        );
        self.audit.record_violation(violation.clone())?;
        self.signals.publish(SecuritySignal::Violation(violation));
        Ok(())
    }

    /// Violations of a tenant, newest first
    pub fn get_security_violations(
        &self,
        tenant_id: &str,
        filter: &ViolationFilter,
    ) -> BoundaryResult<Vec<SecurityViolation>> {
        Ok(self.audit.violations(tenant_id, filter)?)
    }

    /// Append and publish; a failed append is reported, not propagated
    fn record(&self, violation: SecurityViolation) -> bool {
        let tenant_id = violation.tenant_id.clone();
        let actor_id = violation.actor_id.clone();
        match self.log_security_violation(violation) {
            Ok(()) => true,
            Err(err) => {
                warn!(tenant_id = %tenant_id, error = %err, "Violation could not be recorded");
                self.signals.publish(SecuritySignal::internal_error(
                    tenant_id,
                    actor_id.as_deref(),
                    InternalErrorKind::AuditWriteFailed,
                ));
                false
            }
        }
    }
}
