/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 *
 * Messages are fixed strings. Caller-supplied identifiers (role names,
 * permission codes, tenant ids) are never interpolated; only counts are.
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy shared by every subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input, never retried
    Validation,
    /// Attempt to mutate or delete a protected role
    Protection,
    /// Role still referenced by active assignments
    InUse,
    NotFound,
    /// Backing store or audit sink unavailable
    Storage,
    /// Optimistic guard lost a race
    Conflict,
}

/// Role store errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Role store unavailable")]
    #[diagnostic(
        code(store::unavailable),
        help("The backing store could not be reached. Decisions fail closed until it recovers.")
    )]
    Unavailable,

    #[error("Role not found")]
    #[diagnostic(code(store::role_not_found))]
    RoleNotFound,

    #[error("Assignment not found")]
    #[diagnostic(code(store::assignment_not_found))]
    AssignmentNotFound,

    #[error("Role name already exists in this tenant")]
    #[diagnostic(code(store::duplicate_name))]
    DuplicateName,

    #[error("Role was modified concurrently")]
    #[diagnostic(
        code(store::version_conflict),
        help("Reload the role and retry the update.")
    )]
    VersionConflict,

    #[error("Role is assigned to {0} member(s)")]
    #[diagnostic(code(store::in_use))]
    InUse(usize),

    #[error("System roles are immutable")]
    #[diagnostic(code(store::immutable))]
    Immutable,
}

/// Role management errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum RoleError {
    #[error("Role level must be between 1 and 100")]
    #[diagnostic(code(role::invalid_level))]
    InvalidRoleLevel,

    #[error("Role name must not be empty")]
    #[diagnostic(code(role::empty_name))]
    EmptyName,

    #[error("Invalid permission code")]
    #[diagnostic(
        code(role::invalid_permission),
        help("Permission codes look like `vehicle.read`, `vehicle.*` or `*`.")
    )]
    InvalidPermission,

    #[error("Assignment window ends before it starts")]
    #[diagnostic(code(role::invalid_window))]
    InvalidWindow,

    #[error("Role name already exists in this tenant")]
    #[diagnostic(code(role::duplicate_name))]
    DuplicateName,

    #[error("Cannot modify system role")]
    #[diagnostic(
        code(role::system_role_protected),
        help("System roles ship with the platform and cannot be edited or deleted.")
    )]
    SystemRoleProtected,

    #[error("Cannot delete role: assigned to {0} member(s)")]
    #[diagnostic(
        code(role::in_use),
        help("Remove every active assignment of this role first.")
    )]
    InUse(usize),

    #[error("Role not found")]
    #[diagnostic(code(role::not_found))]
    NotFound,

    #[error("Insufficient hierarchy level for this role")]
    #[diagnostic(
        code(role::insufficient_level),
        help("Only actors at or above a role's hierarchy level may create, edit or grant it.")
    )]
    InsufficientLevel,

    #[error("Actor lacks `{0}`")]
    #[diagnostic(
        code(role::missing_permission),
        help("Role administration needs `role.manage`; assignments need `member.manage`.")
    )]
    MissingPermission(String),

    #[error("Cannot grant `{0}`: the actor does not hold it")]
    #[diagnostic(
        code(role::grant_not_held),
        help("A role may only carry permissions its creator or assigner already holds.")
    )]
    GrantNotHeld(String),

    #[error("Role was modified concurrently")]
    #[diagnostic(code(role::conflict))]
    Conflict,

    #[error("Role store unavailable")]
    #[diagnostic(code(role::storage))]
    Storage,
}

impl RoleError {
    /// Classify into the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoleError::InvalidRoleLevel
            | RoleError::EmptyName
            | RoleError::InvalidPermission
            | RoleError::InvalidWindow
            | RoleError::DuplicateName => ErrorKind::Validation,
            RoleError::SystemRoleProtected
            | RoleError::InsufficientLevel
            | RoleError::MissingPermission(_)
            | RoleError::GrantNotHeld(_) => ErrorKind::Protection,
            RoleError::InUse(_) => ErrorKind::InUse,
            RoleError::NotFound => ErrorKind::NotFound,
            RoleError::Conflict => ErrorKind::Conflict,
            RoleError::Storage => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for RoleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => RoleError::Storage,
            StoreError::RoleNotFound | StoreError::AssignmentNotFound => RoleError::NotFound,
            StoreError::DuplicateName => RoleError::DuplicateName,
            StoreError::VersionConflict => RoleError::Conflict,
            StoreError::InUse(count) => RoleError::InUse(count),
            StoreError::Immutable => RoleError::SystemRoleProtected,
        }
    }
}

/// Audit sink errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum AuditError {
    #[error("Audit sink timed out")]
    #[diagnostic(
        code(audit::timeout),
        help("The audit log is contended. The decision completed without its record.")
    )]
    Timeout,

    #[error("Audit sink unavailable")]
    #[diagnostic(code(audit::unavailable))]
    Unavailable,
}

/// Tenant boundary errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BoundaryError {
    #[error("Tenant quotas must be greater than zero")]
    #[diagnostic(code(tenant::invalid_quota))]
    InvalidQuota,

    #[error("Error rate must be between 0 and 1")]
    #[diagnostic(code(tenant::invalid_metrics))]
    InvalidMetrics,

    #[error("Audit trail unavailable")]
    #[diagnostic(code(tenant::audit_unavailable))]
    AuditUnavailable(#[from] AuditError),
}

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    #[diagnostic(code(config::io))]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration document: {0}")]
    #[diagnostic(code(config::parse), help("Configuration files are JSON objects."))]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for environment variable {0}")]
    #[diagnostic(code(config::env))]
    Env(&'static str),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(config::invalid))]
    Invalid(&'static str),
}

/// Unified error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum GuardError {
    #[error("Role error: {0}")]
    #[diagnostic(transparent)]
    Role(#[from] RoleError),

    #[error("Store error: {0}")]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Audit error: {0}")]
    #[diagnostic(transparent)]
    Audit(#[from] AuditError),

    #[error("Tenant boundary error: {0}")]
    #[diagnostic(transparent)]
    Boundary(#[from] BoundaryError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl GuardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::Role(err) => err.kind(),
            GuardError::Store(err) => RoleError::from(err.clone()).kind(),
            GuardError::Audit(_) | GuardError::Boundary(BoundaryError::AuditUnavailable(_)) => {
                ErrorKind::Storage
            }
            GuardError::Boundary(_) | GuardError::Config(_) => ErrorKind::Validation,
        }
    }
}

/// Result alias for role operations
pub type RoleResult<T> = Result<T, RoleError>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Result alias for boundary operations
pub type BoundaryResult<T> = Result<T, BoundaryError>;

/// Result alias for crate-level operations
pub type GuardResult<T> = Result<T, GuardError>;
