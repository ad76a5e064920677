/*!
 * Core Types
 * Identifiers, severities and the closed actor-role enumeration shared by every subsystem
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

/// Tenant identifier
pub type TenantId = String;

/// Actor (member) identifier
pub type ActorId = String;

/// Role identifier
pub type RoleId = Uuid;

/// Role assignment identifier
pub type AssignmentId = Uuid;

/// Lowest permitted role hierarchy level
pub const MIN_ROLE_LEVEL: i32 = 1;

/// Highest permitted role hierarchy level
pub const MAX_ROLE_LEVEL: i32 = 100;

/// Severity attached to violations, events and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High or critical
    #[inline]
    pub fn is_severe(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor role as seen by the tenant boundary
///
/// Only platform roles bypass the boundary; every other role is confined to
/// its own tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    SuperAdmin,
    Admin,
    TenantAdmin,
    User,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::SuperAdmin => "super_admin",
            ActorRole::Admin => "admin",
            ActorRole::TenantAdmin => "tenant_admin",
            ActorRole::User => "user",
        }
    }

    #[inline]
    pub fn bypasses_tenant_boundary(&self) -> bool {
        matches!(self, ActorRole::SuperAdmin | ActorRole::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an actor role string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown actor role")]
pub struct UnknownActorRole;

impl FromStr for ActorRole {
    type Err = UnknownActorRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(ActorRole::SuperAdmin),
            "admin" => Ok(ActorRole::Admin),
            "tenant_admin" => Ok(ActorRole::TenantAdmin),
            "user" => Ok(ActorRole::User),
            _ => Err(UnknownActorRole),
        }
    }
}

/// Returns true if `at` lies inside the inclusive window
#[inline]
pub fn within_window(at: SystemTime, from: SystemTime, until: Option<SystemTime>) -> bool {
    from <= at && until.map_or(true, |until| at <= until)
}
