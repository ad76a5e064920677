/*!
 * Core Module
 * Shared types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{AlertThresholds, AuditConfig, CacheConfig, GuardConfig, HealthThresholds, RiskThresholds};
pub use errors::*;
pub use types::*;
