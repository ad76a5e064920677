/*!
 * Audit Trail
 * Append-only, per-tenant log of permission checks and security violations
 */

use super::types::{
    AuditStats, CheckFilter, PermissionCheckRecord, SecurityViolation, ViolationFilter,
};
use crate::core::errors::{AuditError, AuditResult};
use crate::core::limits::DEFAULT_AUDIT_WRITE_TIMEOUT;
use crate::core::types::TenantId;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Storage contract for audit records
///
/// Append and read only. Nothing in this crate updates or removes a record;
/// retention belongs to an operator process outside the engine.
pub trait AuditSink: Send + Sync {
    /// Append a permission-check record
    fn record_check(&self, record: PermissionCheckRecord) -> AuditResult<()>;

    /// Append a security violation
    fn record_violation(&self, violation: SecurityViolation) -> AuditResult<()>;

    /// Permission checks for a tenant, newest first
    fn checks(&self, tenant_id: &str, filter: &CheckFilter)
        -> AuditResult<Vec<PermissionCheckRecord>>;

    /// Violations for a tenant, newest first
    fn violations(
        &self,
        tenant_id: &str,
        filter: &ViolationFilter,
    ) -> AuditResult<Vec<SecurityViolation>>;

    /// Aggregate counters
    fn stats(&self) -> AuditStats;
}

#[derive(Debug, Default)]
struct TenantLog {
    checks: Vec<PermissionCheckRecord>,
    violations: Vec<SecurityViolation>,
    denials: u64,
}

/// In-memory audit trail
///
/// Each tenant has its own lock, so tenants never contend. Writers wait at
/// most `write_timeout` for that lock and report `AuditError::Timeout`
/// otherwise.
pub struct AuditTrail {
    tenants: DashMap<TenantId, Arc<RwLock<TenantLog>>, RandomState>,
    write_timeout: Duration,
    failed_writes: AtomicU64,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_AUDIT_WRITE_TIMEOUT)
    }

    pub fn with_timeout(write_timeout: Duration) -> Self {
        Self {
            tenants: DashMap::with_hasher(RandomState::new()),
            write_timeout,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Writes that gave up waiting for the tenant lock
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    fn tenant_log(&self, tenant_id: &str) -> Arc<RwLock<TenantLog>> {
        if let Some(log) = self.tenants.get(tenant_id) {
            return Arc::clone(log.value());
        }
        Arc::clone(
            self.tenants
                .entry(tenant_id.to_string())
                .or_default()
                .value(),
        )
    }

    fn existing_log(&self, tenant_id: &str) -> Option<Arc<RwLock<TenantLog>>> {
        self.tenants.get(tenant_id).map(|log| Arc::clone(log.value()))
    }

    fn append<F>(&self, tenant_id: &str, write: F) -> AuditResult<()>
    where
        F: FnOnce(&mut TenantLog),
    {
        let log = self.tenant_log(tenant_id);
        let Some(mut guard) = log.try_write_for(self.write_timeout) else {
            self.failed_writes.fetch_add(1, Ordering::Relaxed);
            warn!(tenant_id, "Audit append timed out");
            return Err(AuditError::Timeout);
        };
        write(&mut guard);
        Ok(())
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T: Clone>(
    items: &[T],
    limit: Option<usize>,
    mut keep: impl FnMut(&T) -> bool,
) -> Vec<T> {
    items
        .iter()
        .rev()
        .filter(|item| keep(item))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

impl AuditSink for AuditTrail {
    fn record_check(&self, record: PermissionCheckRecord) -> AuditResult<()> {
        let tenant_id = record.tenant_id.clone();
        self.append(&tenant_id, move |log| {
            if !record.allowed {
                log.denials += 1;
            }
            log.checks.push(record);
        })
    }

    fn record_violation(&self, violation: SecurityViolation) -> AuditResult<()> {
        let tenant_id = violation.tenant_id.clone();
        self.append(&tenant_id, move |log| log.violations.push(violation))
    }

    fn checks(
        &self,
        tenant_id: &str,
        filter: &CheckFilter,
    ) -> AuditResult<Vec<PermissionCheckRecord>> {
        let Some(log) = self.existing_log(tenant_id) else {
            return Ok(Vec::new());
        };
        let guard = log
            .try_read_for(self.write_timeout)
            .ok_or(AuditError::Timeout)?;
        Ok(newest_first(&guard.checks, filter.limit, |r| filter.matches(r)))
    }

    fn violations(
        &self,
        tenant_id: &str,
        filter: &ViolationFilter,
    ) -> AuditResult<Vec<SecurityViolation>> {
        let Some(log) = self.existing_log(tenant_id) else {
            return Ok(Vec::new());
        };
        let guard = log
            .try_read_for(self.write_timeout)
            .ok_or(AuditError::Timeout)?;
        Ok(newest_first(&guard.violations, filter.limit, |v| {
            filter.matches(v)
        }))
    }

    fn stats(&self) -> AuditStats {
        let logs: Vec<(TenantId, Arc<RwLock<TenantLog>>)> = self
            .tenants
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        let mut stats = AuditStats {
            tenants_tracked: logs.len(),
            ..Default::default()
        };
        for (tenant_id, log) in logs {
            let Some(log) = log.try_read_for(self.write_timeout) else {
                warn!(tenant_id = %tenant_id, "Audit log contended, left out of stats");
                stats.contended_tenants += 1;
                continue;
            };
            stats.total_checks += log.checks.len();
            stats.total_denials += log.denials;
            stats.total_violations += log.violations.len();
        }
        stats
    }
}
