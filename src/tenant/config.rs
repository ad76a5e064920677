/*!
 * Tenant Configuration
 * Isolation settings, resource snapshots, quota and compliance reports
 */

use crate::core::errors::{BoundaryError, BoundaryResult};
use crate::core::types::TenantId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};
use std::time::SystemTime;

/// Region prefix for data stored inside Indonesia
pub const INDONESIA_REGION_PREFIX: &str = "id-";

/// Isolation configuration of one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TenantConfig {
    pub max_database_connections: u32,
    pub max_queries_per_second: u32,
    pub max_concurrent_queries: u32,
    pub max_memory_usage_mb: u64,
    pub enable_cross_tenant_prevention: bool,
    pub enable_audit_logging: bool,
    pub enable_data_encryption: bool,
    pub indonesian_compliance_mode: bool,
    pub data_region: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            max_database_connections: 20,
            max_queries_per_second: 100,
            max_concurrent_queries: 10,
            max_memory_usage_mb: 512,
            enable_cross_tenant_prevention: true,
            enable_audit_logging: true,
            enable_data_encryption: true,
            indonesian_compliance_mode: true,
            data_region: "id-jakarta".to_string(),
        }
    }
}

impl TenantConfig {
    pub fn validate(&self) -> BoundaryResult<()> {
        if self.max_database_connections == 0
            || self.max_queries_per_second == 0
            || self.max_concurrent_queries == 0
            || self.max_memory_usage_mb == 0
            || self.data_region.trim().is_empty()
        {
            return Err(BoundaryError::InvalidQuota);
        }
        Ok(())
    }
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TenantConfigUpdate {
    pub max_database_connections: Option<u32>,
    pub max_queries_per_second: Option<u32>,
    pub max_concurrent_queries: Option<u32>,
    pub max_memory_usage_mb: Option<u64>,
    pub enable_cross_tenant_prevention: Option<bool>,
    pub enable_audit_logging: Option<bool>,
    pub enable_data_encryption: Option<bool>,
    pub indonesian_compliance_mode: Option<bool>,
    pub data_region: Option<String>,
}

impl TenantConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge onto `base` and validate the result
    pub fn apply(&self, base: &TenantConfig) -> BoundaryResult<TenantConfig> {
        let merged = TenantConfig {
            max_database_connections: self
                .max_database_connections
                .unwrap_or(base.max_database_connections),
            max_queries_per_second: self
                .max_queries_per_second
                .unwrap_or(base.max_queries_per_second),
            max_concurrent_queries: self
                .max_concurrent_queries
                .unwrap_or(base.max_concurrent_queries),
            max_memory_usage_mb: self.max_memory_usage_mb.unwrap_or(base.max_memory_usage_mb),
            enable_cross_tenant_prevention: self
                .enable_cross_tenant_prevention
                .unwrap_or(base.enable_cross_tenant_prevention),
            enable_audit_logging: self.enable_audit_logging.unwrap_or(base.enable_audit_logging),
            enable_data_encryption: self
                .enable_data_encryption
                .unwrap_or(base.enable_data_encryption),
            indonesian_compliance_mode: self
                .indonesian_compliance_mode
                .unwrap_or(base.indonesian_compliance_mode),
            data_region: self
                .data_region
                .clone()
                .unwrap_or_else(|| base.data_region.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Names of the fields this update touches
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        mark(self.max_database_connections.is_some(), "max_database_connections");
        mark(self.max_queries_per_second.is_some(), "max_queries_per_second");
        mark(self.max_concurrent_queries.is_some(), "max_concurrent_queries");
        mark(self.max_memory_usage_mb.is_some(), "max_memory_usage_mb");
        mark(
            self.enable_cross_tenant_prevention.is_some(),
            "enable_cross_tenant_prevention",
        );
        mark(self.enable_audit_logging.is_some(), "enable_audit_logging");
        mark(self.enable_data_encryption.is_some(), "enable_data_encryption");
        mark(self.indonesian_compliance_mode.is_some(), "indonesian_compliance_mode");
        mark(self.data_region.is_some(), "data_region");
        fields
    }
}

/// Current resource usage of a tenant; one value per tenant, not a series
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TenantResourceMetrics {
    pub tenant_id: TenantId,
    pub db_connections: u32,
    pub active_queries: u32,
    /// Percent of one core
    pub cpu_usage: f64,
    pub memory_usage_mb: u64,
    pub storage_usage_mb: u64,
    pub request_count: u64,
    /// Fraction of failed requests in [0, 1]
    pub error_rate: f64,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub timestamp: SystemTime,
}

impl TenantResourceMetrics {
    /// Zeroed snapshot taken now
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            db_connections: 0,
            active_queries: 0,
            cpu_usage: 0.0,
            memory_usage_mb: 0,
            storage_usage_mb: 0,
            request_count: 0,
            error_rate: 0.0,
            timestamp: SystemTime::now(),
        }
    }

    pub fn validate(&self) -> BoundaryResult<()> {
        if !(0.0..=1.0).contains(&self.error_rate) || !(self.cpu_usage >= 0.0) {
            return Err(BoundaryError::InvalidMetrics);
        }
        Ok(())
    }
}

/// Resource guarded by a tenant quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaResource {
    DatabaseConnections,
    ConcurrentQueries,
    Memory,
}

impl QuotaResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaResource::DatabaseConnections => "database_connections",
            QuotaResource::ConcurrentQueries => "concurrent_queries",
            QuotaResource::Memory => "memory",
        }
    }
}

/// One quota exceeded by the current snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaBreach {
    pub resource: QuotaResource,
    pub current: u64,
    pub limit: u64,
}

/// Current usage compared with configured limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReport {
    pub tenant_id: TenantId,
    /// False when no snapshot has been recorded yet
    pub metrics_recorded: bool,
    pub within_limits: bool,
    pub breaches: Vec<QuotaBreach>,
}

impl QuotaReport {
    pub(crate) fn evaluate(
        tenant_id: &str,
        config: &TenantConfig,
        metrics: Option<&TenantResourceMetrics>,
    ) -> Self {
        let Some(metrics) = metrics else {
            return Self {
                tenant_id: tenant_id.to_string(),
                metrics_recorded: false,
                within_limits: true,
                breaches: Vec::new(),
            };
        };

        let checks = [
            (
                QuotaResource::DatabaseConnections,
                u64::from(metrics.db_connections),
                u64::from(config.max_database_connections),
            ),
            (
                QuotaResource::ConcurrentQueries,
                u64::from(metrics.active_queries),
                u64::from(config.max_concurrent_queries),
            ),
            (
                QuotaResource::Memory,
                metrics.memory_usage_mb,
                config.max_memory_usage_mb,
            ),
        ];
        let breaches: Vec<QuotaBreach> = checks
            .into_iter()
            .filter(|(_, current, limit)| current > limit)
            .map(|(resource, current, limit)| QuotaBreach {
                resource,
                current,
                limit,
            })
            .collect();

        Self {
            tenant_id: tenant_id.to_string(),
            metrics_recorded: true,
            within_limits: breaches.is_empty(),
            breaches,
        }
    }
}

/// Individual data-protection requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRequirements {
    pub data_localization: bool,
    pub data_encryption: bool,
    pub audit_trail: bool,
}

/// Indonesian data-protection compliance status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub tenant_id: TenantId,
    pub compliant: bool,
    pub requirements: ComplianceRequirements,
}

impl ComplianceReport {
    pub(crate) fn evaluate(tenant_id: &str, config: &TenantConfig) -> Self {
        let requirements = ComplianceRequirements {
            data_localization: config.indonesian_compliance_mode
                && config.data_region.starts_with(INDONESIA_REGION_PREFIX),
            data_encryption: config.enable_data_encryption,
            audit_trail: config.enable_audit_logging,
        };
        Self {
            tenant_id: tenant_id.to_string(),
            compliant: requirements.data_localization
                && requirements.data_encryption
                && requirements.audit_trail,
            requirements,
        }
    }
}
