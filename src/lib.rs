/*!
 * Tenant Guard
 * Tenant-scoped authorization for multi-tenant dealership platforms
 *
 * Layers, leaves first:
 * - audit: append-only permission checks and security violations
 * - store: role and assignment storage boundary
 * - permissions: capability checks with a (tenant, actor) cache
 * - roles: custom role lifecycle and the hierarchy rule
 * - tenant: cross-tenant gate, tenant configuration and isolation health
 * - monitoring: signal stream, alerts and risk scoring
 * - guard: composition root
 */

pub mod audit;
pub mod core;
pub mod guard;
pub mod monitoring;
pub mod permissions;
pub mod roles;
pub mod store;
pub mod tenant;

// Re-exports
pub use crate::core::config::GuardConfig;
pub use crate::core::errors::*;
pub use crate::core::types::{ActorId, ActorRole, AssignmentId, RoleId, Severity, TenantId};
pub use audit::{AuditSink, AuditTrail};
pub use guard::{AccessGuard, AccessGuardBuilder, Authorization, AuthorizationRequest};
pub use monitoring::{init_tracing, SecurityMonitor};
pub use permissions::{Permission, PermissionEvaluator};
pub use roles::RoleManager;
pub use store::{MemoryRoleStore, RoleStore};
pub use tenant::TenantBoundary;
