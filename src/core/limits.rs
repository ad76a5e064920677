/*!
 * Limits and Thresholds
 *
 * Centralized location for cache sizes, timeouts and detection thresholds.
 * These are the defaults behind `GuardConfig`; every value can be overridden
 * at construction time.
 *
 * - Security-relevant values are marked with [SECURITY]
 * - Hot-path values are marked with [PERF]
 */

use std::time::Duration;

// =============================================================================
// PERMISSION CACHE
// =============================================================================

/// Maximum cached (tenant, actor) permission sets
/// [PERF] Sized for a few thousand concurrently active members
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Cached permission sets expire after this long
/// [SECURITY] Upper bound on staleness when an invalidation is missed
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

// =============================================================================
// AUDIT & SIGNALS
// =============================================================================

/// Longest a decision waits on an audit append
/// [SECURITY] Decision completes even if the sink is contended
pub const DEFAULT_AUDIT_WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// Bounded capacity of the evaluator -> monitor signal channel
pub const DEFAULT_SIGNAL_CAPACITY: usize = 4_096;

// =============================================================================
// ISOLATION HEALTH
// =============================================================================

/// Rolling window for counting recent violations
pub const HEALTH_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Recent violations of any severity that degrade a tenant to warning
pub const HEALTH_WARNING_TOTAL: usize = 5;

/// Recent high/critical violations that degrade a tenant to warning
pub const HEALTH_WARNING_SEVERE: usize = 1;

/// Recent high/critical violations that degrade a tenant to critical
pub const HEALTH_CRITICAL_SEVERE: usize = 3;

// =============================================================================
// ALERTING
// =============================================================================

/// Window over which events accumulate towards an alert
pub const ALERT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Critical events of one type within the window that raise an alert
pub const ALERT_CRITICAL_THRESHOLD: usize = 3;

/// High-or-above events of one type within the window that raise an alert
pub const ALERT_HIGH_THRESHOLD: usize = 10;

/// Upper bound on events returned by a single query
pub const MAX_EVENT_QUERY_LIMIT: usize = 1_000;

// =============================================================================
// RISK SCORING
// =============================================================================

/// Window over which denials and escalation attempts count towards risk
pub const RISK_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Window for permission-enumeration detection
pub const ENUMERATION_WINDOW: Duration = Duration::from_secs(60);

/// Distinct denied permission codes within the window that flag enumeration
/// [SECURITY] Normal UI flows touch a handful of codes, probes sweep many
pub const ENUMERATION_THRESHOLD: usize = 8;

/// Weight of one denial within the risk window
pub const RISK_WEIGHT_DENIAL: u32 = 2;

/// Weight of one escalation attempt within the risk window
pub const RISK_WEIGHT_ESCALATION: u32 = 15;

/// Weight of a detected enumeration sweep
pub const RISK_WEIGHT_ENUMERATION: u32 = 30;

/// Weight of one cross-tenant attempt within the risk window
pub const RISK_WEIGHT_CROSS_TENANT: u32 = 10;

/// Risk scores are clamped to this ceiling
pub const MAX_RISK_SCORE: u32 = 100;
