/*!
 * Isolation Health
 * Status of a tenant's isolation derived from its configuration and recent violations
 */

use crate::core::config::HealthThresholds;
use crate::core::types::TenantId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::time::SystemTime;

/// Overall isolation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

/// Individual isolation checks; true means passing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationChecks {
    /// Cross-tenant prevention enabled
    pub database_isolation: bool,
    pub compliance: bool,
    /// Audit logging enabled and the trail readable
    pub audit_logging: bool,
    /// Current usage within quotas
    pub resource_limits: bool,
}

/// Health report of one tenant
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationHealth {
    pub tenant_id: TenantId,
    pub status: HealthStatus,
    pub checks: IsolationChecks,
    /// Violations of any severity inside the health window
    pub recent_violations: usize,
    pub high_severity_violations: usize,
    /// Violation counts could not be read; they are reported as zero
    pub degraded: bool,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub checked_at: SystemTime,
}

/// Derive the status from checks and violation counts
///
/// Critical: database isolation off, or at least `critical_severe` severe
/// violations. Warning: any other failing check, a degraded read, at least
/// `warning_total` violations, or at least `warning_severe` severe ones.
pub fn assess(
    checks: &IsolationChecks,
    recent: usize,
    severe: usize,
    degraded: bool,
    thresholds: &HealthThresholds,
) -> HealthStatus {
    if !checks.database_isolation || severe >= thresholds.critical_severe {
        return HealthStatus::Critical;
    }

    let failing_check = !checks.compliance || !checks.audit_logging || !checks.resource_limits;
    if failing_check
        || degraded
        || recent >= thresholds.warning_total
        || severe >= thresholds.warning_severe
    {
        return HealthStatus::Warning;
    }

    HealthStatus::Healthy
}
