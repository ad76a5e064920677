/*!
 * Role Types
 * Roles, role assignments and the inputs used to create them
 */

use crate::core::types::{
    within_window, ActorId, AssignmentId, RoleId, TenantId, MAX_ROLE_LEVEL, MIN_ROLE_LEVEL,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::collections::BTreeSet;
use std::time::SystemTime;
use uuid::Uuid;

/// A tenant-scoped or platform (system) role
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Role {
    pub id: RoleId,
    /// None for platform roles shared by every tenant
    pub tenant_id: Option<TenantId>,
    pub name: String,
    pub display_name: String,
    pub department: Option<String>,
    pub level: i32,
    pub permissions: BTreeSet<String>,
    pub is_system: bool,
    /// Bumped on every guarded update
    pub version: u64,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub created_at: SystemTime,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub updated_at: SystemTime,
}

impl Role {
    /// Platform role seeded at startup
    pub fn system<I, S>(name: &str, display_name: &str, level: i32, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            name: name.to_string(),
            display_name: display_name.to_string(),
            department: None,
            level,
            permissions: permissions.into_iter().map(Into::into).collect(),
            is_system: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Custom role owned by a tenant
    pub fn custom(tenant_id: impl Into<TenantId>, spec: NewRole) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id: Some(tenant_id.into()),
            display_name: spec.display_name.unwrap_or_else(|| spec.name.clone()),
            name: spec.name,
            department: spec.department,
            level: spec.role_level,
            permissions: spec.permissions,
            is_system: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this role may be used inside `tenant_id`
    #[inline]
    pub fn visible_to(&self, tenant_id: &str) -> bool {
        match &self.tenant_id {
            None => true,
            Some(owner) => owner == tenant_id,
        }
    }
}

/// Whether a hierarchy level is inside the permitted range
#[inline]
pub fn is_valid_level(level: i32) -> bool {
    (MIN_ROLE_LEVEL..=MAX_ROLE_LEVEL).contains(&level)
}

/// Input for creating a custom role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewRole {
    pub name: String,
    pub display_name: Option<String>,
    pub department: Option<String>,
    pub role_level: i32,
    pub permissions: BTreeSet<String>,
}

impl NewRole {
    pub fn new(name: impl Into<String>, role_level: i32) -> Self {
        Self {
            name: name.into(),
            role_level,
            ..Default::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

/// Binding of a member to a role inside one tenant
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoleAssignment {
    pub id: AssignmentId,
    pub tenant_id: TenantId,
    pub member_id: ActorId,
    pub role_id: RoleId,
    pub is_primary: bool,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub effective_from: SystemTime,
    /// None means open-ended
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub effective_until: Option<SystemTime>,
}

impl RoleAssignment {
    /// Grants only inside [effective_from, effective_until]
    #[inline]
    pub fn is_active_at(&self, at: SystemTime) -> bool {
        within_window(at, self.effective_from, self.effective_until)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active_at(SystemTime::now())
    }
}

/// Input for granting a role to a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub member_id: ActorId,
    pub role_id: RoleId,
    pub is_primary: bool,
    pub effective_from: SystemTime,
    pub effective_until: Option<SystemTime>,
}

impl AssignmentRequest {
    /// Open-ended assignment effective immediately
    pub fn new(member_id: impl Into<ActorId>, role_id: RoleId) -> Self {
        Self {
            member_id: member_id.into(),
            role_id,
            is_primary: false,
            effective_from: SystemTime::now(),
            effective_until: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn effective_from(mut self, from: SystemTime) -> Self {
        self.effective_from = from;
        self
    }

    pub fn effective_until(mut self, until: SystemTime) -> Self {
        self.effective_until = Some(until);
        self
    }

    /// Materialise the assignment inside `tenant_id`
    ///
    /// Used by store implementations and for bootstrapping the first
    /// administrator; `RoleManager::assign_role` is the checked path.
    pub fn into_assignment(self, tenant_id: TenantId) -> RoleAssignment {
        RoleAssignment {
            id: Uuid::new_v4(),
            tenant_id,
            member_id: self.member_id,
            role_id: self.role_id,
            is_primary: self.is_primary,
            effective_from: self.effective_from,
            effective_until: self.effective_until,
        }
    }
}
