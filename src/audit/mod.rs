/*!
 * Audit Module
 * Immutable records of permission decisions and security violations
 */

pub mod trail;
pub mod types;

pub use trail::{AuditSink, AuditTrail};
pub use types::{
    AuditStats, CheckFilter, DecisionSource, PermissionCheckRecord, SecurityViolation,
    ViolationFilter, ViolationType,
};
