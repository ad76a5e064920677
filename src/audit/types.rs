/*!
 * Audit Record Types
 * Immutable permission-check records and security violations
 */

use crate::core::types::{ActorId, Severity, TenantId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

/// Where a permission decision was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Cache,
    Store,
    /// Store unreachable; decision failed closed
    StoreUnavailable,
}

/// One `has_permission` evaluation
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PermissionCheckRecord {
    pub actor_id: ActorId,
    pub tenant_id: TenantId,
    pub permission: String,
    pub allowed: bool,
    pub source: DecisionSource,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl PermissionCheckRecord {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        actor_id: impl Into<ActorId>,
        permission: impl Into<String>,
        allowed: bool,
        source: DecisionSource,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            tenant_id: tenant_id.into(),
            permission: permission.into(),
            allowed,
            source,
            timestamp: SystemTime::now(),
        }
    }
}

/// Violation classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    CrossTenantAccess,
    CrossTenantOperation,
    PrivilegeEscalation,
    SystemRoleTampering,
    QuotaExceeded,
    Other,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::CrossTenantAccess => "cross_tenant_access",
            ViolationType::CrossTenantOperation => "cross_tenant_operation",
            ViolationType::PrivilegeEscalation => "privilege_escalation",
            ViolationType::SystemRoleTampering => "system_role_tampering",
            ViolationType::QuotaExceeded => "quota_exceeded",
            ViolationType::Other => "other",
        }
    }
}

/// A logged denied or suspicious access attempt
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SecurityViolation {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub actor_id: Option<ActorId>,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl SecurityViolation {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        violation_type: ViolationType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            actor_id: None,
            violation_type,
            severity,
            description: description.into(),
            metadata: BTreeMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Filter for violation queries
#[derive(Debug, Clone, Default)]
pub struct ViolationFilter {
    pub min_severity: Option<Severity>,
    pub since: Option<SystemTime>,
    pub limit: Option<usize>,
}

impl ViolationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn since(mut self, since: SystemTime) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, violation: &SecurityViolation) -> bool {
        if let Some(min) = self.min_severity {
            if violation.severity < min {
                return false;
            }
        }
        if let Some(since) = self.since {
            if violation.timestamp < since {
                return false;
            }
        }
        true
    }
}

/// Filter for permission-check queries
#[derive(Debug, Clone, Default)]
pub struct CheckFilter {
    pub actor_id: Option<ActorId>,
    pub denied_only: bool,
    pub since: Option<SystemTime>,
    pub limit: Option<usize>,
}

impl CheckFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor_id: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn denied_only(mut self) -> Self {
        self.denied_only = true;
        self
    }

    pub fn since(mut self, since: SystemTime) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &PermissionCheckRecord) -> bool {
        if let Some(ref actor) = self.actor_id {
            if &record.actor_id != actor {
                return false;
            }
        }
        if self.denied_only && record.allowed {
            return false;
        }
        if let Some(since) = self.since {
            if record.timestamp < since {
                return false;
            }
        }
        true
    }
}

/// Audit statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_checks: usize,
    pub total_denials: u64,
    pub total_violations: usize,
    pub tenants_tracked: usize,
    /// Tenants whose log stayed locked past the timeout and were left out
    pub contended_tenants: usize,
}
