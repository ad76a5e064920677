/*!
 * Security Events
 * Event records, queries and alerts consumed by the security monitor
 */

use crate::audit::types::{SecurityViolation, ViolationType};
use crate::core::limits::MAX_EVENT_QUERY_LIMIT;
use crate::core::types::{ActorId, Severity, TenantId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

/// Security event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    PermissionDenied,
    CrossTenantAttempt,
    PrivilegeEscalation,
    SystemRoleTampering,
    PermissionEnumeration,
    QuotaExceeded,
    SuspiciousActivity,
    /// Role store unreachable while deciding
    StorageOutage,
    /// Audit record could not be written
    AuditFailure,
    ConfigChange,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::PermissionDenied => "permission_denied",
            SecurityEventType::CrossTenantAttempt => "cross_tenant_attempt",
            SecurityEventType::PrivilegeEscalation => "privilege_escalation",
            SecurityEventType::SystemRoleTampering => "system_role_tampering",
            SecurityEventType::PermissionEnumeration => "permission_enumeration",
            SecurityEventType::QuotaExceeded => "quota_exceeded",
            SecurityEventType::SuspiciousActivity => "suspicious_activity",
            SecurityEventType::StorageOutage => "storage_outage",
            SecurityEventType::AuditFailure => "audit_failure",
            SecurityEventType::ConfigChange => "config_change",
        }
    }

    /// Internal failures, as opposed to something an actor did
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SecurityEventType::StorageOutage | SecurityEventType::AuditFailure
        )
    }
}

impl From<ViolationType> for SecurityEventType {
    fn from(violation_type: ViolationType) -> Self {
        match violation_type {
            ViolationType::CrossTenantAccess | ViolationType::CrossTenantOperation => {
                SecurityEventType::CrossTenantAttempt
            }
            ViolationType::PrivilegeEscalation => SecurityEventType::PrivilegeEscalation,
            ViolationType::SystemRoleTampering => SecurityEventType::SystemRoleTampering,
            ViolationType::QuotaExceeded => SecurityEventType::QuotaExceeded,
            ViolationType::Other => SecurityEventType::SuspiciousActivity,
        }
    }
}

/// A security event
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SecurityEvent {
    pub id: Uuid,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub actor_id: Option<ActorId>,
    pub tenant_id: TenantId,
    pub attempted_action: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl SecurityEvent {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        event_type: SecurityEventType,
        severity: Severity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            severity,
            actor_id: None,
            tenant_id: tenant_id.into(),
            attempted_action: None,
            metadata: BTreeMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.attempted_action = Some(action.into());
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

impl From<&SecurityViolation> for SecurityEvent {
    fn from(violation: &SecurityViolation) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: violation.violation_type.into(),
            severity: violation.severity,
            actor_id: violation.actor_id.clone(),
            tenant_id: violation.tenant_id.clone(),
            attempted_action: violation.metadata.get("action").cloned(),
            metadata: violation.metadata.clone(),
            timestamp: violation.timestamp,
        }
    }
}

/// Event query; results are newest first
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub user_id: Option<ActorId>,
    pub event_type: Option<SecurityEventType>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<ActorId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn event_type(mut self, event_type: SecurityEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requested limit clamped to the query ceiling
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(MAX_EVENT_QUERY_LIMIT)
            .min(MAX_EVENT_QUERY_LIMIT)
    }

    pub fn matches(&self, event: &SecurityEvent) -> bool {
        if let Some(ref user) = self.user_id {
            if event.actor_id.as_ref() != Some(user) {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        true
    }
}

/// Aggregated events that crossed an alert threshold
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Alert {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub event_count: usize,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub first_seen: SystemTime,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub last_seen: SystemTime,
    pub resolved: bool,
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub resolved_at: Option<SystemTime>,
}

impl Alert {
    pub(crate) fn raise(
        tenant_id: &str,
        event_type: SecurityEventType,
        severity: Severity,
        event_count: usize,
        first_seen: SystemTime,
        last_seen: SystemTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            event_type,
            severity,
            event_count,
            first_seen,
            last_seen,
            resolved: false,
            resolved_at: None,
        }
    }

    pub(crate) fn resolve(&mut self, at: SystemTime) {
        self.resolved = true;
        self.resolved_at = Some(at);
    }
}
