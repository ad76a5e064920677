/*!
 * Security Monitoring
 * Signal stream, security events, alerts and risk scoring
 */

pub mod events;
pub mod monitor;
pub mod risk;
pub mod signals;
mod tracer;

pub use events::{Alert, EventQuery, SecurityEvent, SecurityEventType};
pub use monitor::{EventStatistics, SecurityMonitor, SecurityStatistics, StatsPeriod};
pub use risk::{RiskAssessment, RiskLevel, RiskTracker};
pub use signals::{
    signal_channel, InternalErrorKind, SecuritySignal, SignalReceiver, SignalSender, SignalStats,
};
pub use tracer::{generate_trace_id, init_tracing, DecisionSpan};
