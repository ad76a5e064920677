/*!
 * Tenant Module
 * Tenant isolation gate, per-tenant configuration, quotas, compliance and health
 */

pub mod boundary;
pub mod config;
pub mod health;

pub use boundary::{
    AccessDecision, OperationCheck, TenantBoundary, CROSS_TENANT_ACCESS_DENIED,
    CROSS_TENANT_OPERATION_DENIED, MISSING_TENANT_CONTEXT,
};
pub use config::{
    ComplianceReport, ComplianceRequirements, QuotaBreach, QuotaReport, QuotaResource,
    TenantConfig, TenantConfigUpdate, TenantResourceMetrics, INDONESIA_REGION_PREFIX,
};
pub use health::{HealthStatus, IsolationChecks, IsolationHealth};
