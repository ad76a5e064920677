/*!
 * Guard Configuration
 * Cache, audit, health, alert and risk settings with JSON and environment loaders
 */

use super::errors::ConfigError;
use super::limits::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable enabling JSON tracing output
pub const ENV_TRACE_JSON: &str = "TENANT_GUARD_TRACE_JSON";
/// Environment override for the cache TTL in seconds
pub const ENV_CACHE_TTL_SECS: &str = "TENANT_GUARD_CACHE_TTL_SECS";
/// Environment override for the cache capacity
pub const ENV_CACHE_CAPACITY: &str = "TENANT_GUARD_CACHE_CAPACITY";
/// Environment override for the audit write timeout in milliseconds
pub const ENV_AUDIT_TIMEOUT_MS: &str = "TENANT_GUARD_AUDIT_TIMEOUT_MS";
/// Environment override for the signal channel capacity
pub const ENV_SIGNAL_CAPACITY: &str = "TENANT_GUARD_SIGNAL_CAPACITY";

/// Permission cache settings
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Audit and signal delivery settings
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub write_timeout: Duration,
    pub signal_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            write_timeout: DEFAULT_AUDIT_WRITE_TIMEOUT,
            signal_capacity: DEFAULT_SIGNAL_CAPACITY,
        }
    }
}

/// Isolation health degradation thresholds
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub window: Duration,
    pub warning_total: usize,
    pub warning_severe: usize,
    pub critical_severe: usize,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            window: HEALTH_WINDOW,
            warning_total: HEALTH_WARNING_TOTAL,
            warning_severe: HEALTH_WARNING_SEVERE,
            critical_severe: HEALTH_CRITICAL_SEVERE,
        }
    }
}

/// Alert escalation thresholds
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub window: Duration,
    pub critical_events: usize,
    pub high_events: usize,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            window: ALERT_WINDOW,
            critical_events: ALERT_CRITICAL_THRESHOLD,
            high_events: ALERT_HIGH_THRESHOLD,
        }
    }
}

/// Risk scoring parameters
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    #[serde_as(as = "DurationSeconds<u64>")]
    pub window: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub enumeration_window: Duration,
    pub enumeration_distinct_codes: usize,
    pub weight_denial: u32,
    pub weight_escalation: u32,
    pub weight_enumeration: u32,
    pub weight_cross_tenant: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            window: RISK_WINDOW,
            enumeration_window: ENUMERATION_WINDOW,
            enumeration_distinct_codes: ENUMERATION_THRESHOLD,
            weight_denial: RISK_WEIGHT_DENIAL,
            weight_escalation: RISK_WEIGHT_ESCALATION,
            weight_enumeration: RISK_WEIGHT_ENUMERATION,
            weight_cross_tenant: RISK_WEIGHT_CROSS_TENANT,
        }
    }
}

/// Top-level configuration for an `AccessGuard`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub cache: CacheConfig,
    pub audit: AuditConfig,
    pub health: HealthThresholds,
    pub alerts: AlertThresholds,
    pub risk: RiskThresholds,
}

impl GuardConfig {
    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Loading guard configuration");
        Self::from_json_str(&contents)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `TENANT_GUARD_*` environment overrides on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(secs) = env_number::<u64>(ENV_CACHE_TTL_SECS)? {
            self.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(capacity) = env_number::<usize>(ENV_CACHE_CAPACITY)? {
            self.cache.capacity = capacity;
        }
        if let Some(ms) = env_number::<u64>(ENV_AUDIT_TIMEOUT_MS)? {
            self.audit.write_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = env_number::<usize>(ENV_SIGNAL_CAPACITY)? {
            self.audit.signal_capacity = capacity;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings that would disable a safety mechanism outright
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache capacity must be positive"));
        }
        if self.audit.signal_capacity == 0 {
            return Err(ConfigError::Invalid("signal capacity must be positive"));
        }
        if self.audit.write_timeout.is_zero() {
            return Err(ConfigError::Invalid("audit write timeout must be positive"));
        }
        if self.health.window.is_zero()
            || self.alerts.window.is_zero()
            || self.risk.window.is_zero()
            || self.risk.enumeration_window.is_zero()
        {
            return Err(ConfigError::Invalid("detection windows must be positive"));
        }
        if self.health.warning_total == 0
            || self.health.critical_severe == 0
            || self.alerts.critical_events == 0
            || self.alerts.high_events == 0
            || self.risk.enumeration_distinct_codes == 0
        {
            return Err(ConfigError::Invalid("detection thresholds must be positive"));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Env(name)),
        Err(_) => Ok(None),
    }
}
