/*!
 * Security Monitor
 * Event log, alert escalation, statistics and risk scoring per tenant
 *
 * Consumes the signal stream published by the evaluator, the role manager
 * and the tenant boundary. Signals are processed either on a background
 * observer thread or explicitly through `drain`.
 */

use super::events::{Alert, EventQuery, SecurityEvent, SecurityEventType};
use super::risk::{RiskAssessment, RiskTracker};
use super::signals::{InternalErrorKind, SecuritySignal, SignalReceiver};
use crate::audit::types::{DecisionSource, PermissionCheckRecord};
use crate::core::config::{AlertThresholds, RiskThresholds};
use crate::core::types::{Severity, TenantId};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name of the background observer thread
pub const OBSERVER_THREAD_NAME: &str = "security-monitor";

/// Reporting period for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
}

impl StatsPeriod {
    pub fn duration(&self) -> Duration {
        const DAY: u64 = 24 * 60 * 60;
        match self {
            StatsPeriod::Day => Duration::from_secs(DAY),
            StatsPeriod::Week => Duration::from_secs(7 * DAY),
            StatsPeriod::Month => Duration::from_secs(30 * DAY),
        }
    }
}

/// Breakdown inside `SecurityStatistics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatistics {
    pub by_type: BTreeMap<SecurityEventType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub unique_actors: usize,
    pub permission_denials: usize,
    pub active_alerts: usize,
    /// Storage outages and audit failures in the period
    pub internal_errors: usize,
}

/// Statistics of one tenant over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityStatistics {
    pub tenant_id: TenantId,
    pub period: StatsPeriod,
    pub total_events: usize,
    pub statistics: EventStatistics,
}

type Log<T> = Arc<RwLock<Vec<T>>>;

/// Security monitor
pub struct SecurityMonitor {
    events: DashMap<TenantId, Log<SecurityEvent>, RandomState>,
    alerts: DashMap<TenantId, Log<Alert>, RandomState>,
    internal_errors: DashMap<TenantId, u64, RandomState>,
    risk: RiskTracker,
    thresholds: AlertThresholds,
    receiver: SignalReceiver,
    processed: AtomicU64,
}

impl SecurityMonitor {
    pub fn new(
        receiver: SignalReceiver,
        alert_thresholds: AlertThresholds,
        risk_thresholds: RiskThresholds,
    ) -> Self {
        Self {
            events: DashMap::with_hasher(RandomState::new()),
            alerts: DashMap::with_hasher(RandomState::new()),
            internal_errors: DashMap::with_hasher(RandomState::new()),
            risk: RiskTracker::new(risk_thresholds),
            thresholds: alert_thresholds,
            receiver,
            processed: AtomicU64::new(0),
        }
    }

    /// Append an event and escalate it to an alert when a threshold is crossed
    ///
    /// Returns the alert raised or updated by this event.
    pub fn log_security_event(&self, event: SecurityEvent) -> Option<Alert> {
        debug!(
            tenant_id = %event.tenant_id,
            event_type = event.event_type.as_str(),
            severity = %event.severity,
            "Security event"
        );
        let enumeration = self.track_risk(&event);

        let tenant_log = log_for(&self.events, &event.tenant_id);
        tenant_log.write().push(event.clone());
        let alert = self.evaluate_alert(&event, &tenant_log);

        if let Some(enumeration) = enumeration {
            self.log_security_event(enumeration);
        }
        alert
    }

    /// Events of a tenant, newest first
    pub fn get_security_events(&self, tenant_id: &str, query: &EventQuery) -> Vec<SecurityEvent> {
        let Some(log) = existing(&self.events, tenant_id) else {
            return Vec::new();
        };
        let events = log.read();
        events
            .iter()
            .rev()
            .filter(|event| query.matches(event))
            .take(query.effective_limit())
            .cloned()
            .collect()
    }

    /// Unresolved alerts of a tenant, most recently active first
    pub fn get_active_alerts(&self, tenant_id: &str) -> Vec<Alert> {
        let Some(log) = existing(&self.alerts, tenant_id) else {
            return Vec::new();
        };
        let mut active: Vec<Alert> = log
            .read()
            .iter()
            .filter(|alert| !alert.resolved)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        active
    }

    /// Mark an alert resolved; false if unknown or already resolved
    pub fn resolve_alert(&self, tenant_id: &str, alert_id: &Uuid) -> bool {
        let Some(log) = existing(&self.alerts, tenant_id) else {
            return false;
        };
        let mut alerts = log.write();
        match alerts
            .iter_mut()
            .find(|alert| alert.id == *alert_id && !alert.resolved)
        {
            Some(alert) => {
                alert.resolve(SystemTime::now());
                info!(tenant_id, alert_id = %alert_id, "Alert resolved");
                true
            }
            None => false,
        }
    }

    pub fn get_security_statistics(
        &self,
        tenant_id: &str,
        period: StatsPeriod,
    ) -> SecurityStatistics {
        let since = SystemTime::now()
            .checked_sub(period.duration())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut statistics = EventStatistics {
            active_alerts: self.get_active_alerts(tenant_id).len(),
            ..Default::default()
        };
        let mut total_events = 0;
        let mut actors = BTreeSet::new();

        if let Some(log) = existing(&self.events, tenant_id) {
            for event in log.read().iter().filter(|e| e.timestamp >= since) {
                total_events += 1;
                *statistics.by_type.entry(event.event_type).or_default() += 1;
                *statistics.by_severity.entry(event.severity).or_default() += 1;
                if let Some(ref actor) = event.actor_id {
                    actors.insert(actor.clone());
                }
                if event.event_type == SecurityEventType::PermissionDenied {
                    statistics.permission_denials += 1;
                }
                if event.event_type.is_internal() {
                    statistics.internal_errors += 1;
                }
            }
        }
        statistics.unique_actors = actors.len();

        SecurityStatistics {
            tenant_id: tenant_id.to_string(),
            period,
            total_events,
            statistics,
        }
    }

    /// Current risk of an actor inside a tenant
    pub fn risk_score(&self, tenant_id: &str, actor_id: &str) -> RiskAssessment {
        self.risk.assess(tenant_id, actor_id, SystemTime::now())
    }

    /// Internal errors reported for a tenant since startup
    pub fn internal_error_count(&self, tenant_id: &str) -> u64 {
        self.internal_errors.get(tenant_id).map_or(0, |count| *count)
    }

    /// Signals handled so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Process every pending signal; returns how many were handled
    pub fn drain(&self) -> usize {
        let mut handled = 0;
        while let Some(signal) = self.receiver.try_next() {
            self.handle_signal(signal);
            handled += 1;
        }
        handled
    }

    /// Start the observer thread
    ///
    /// The thread blocks on the signal channel and exits once every sender
    /// has been dropped.
    pub fn spawn_observer(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let monitor = Arc::clone(self);
        std::thread::Builder::new()
            .name(OBSERVER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Security monitor observer started");
                while let Some(signal) = monitor.receiver.next_blocking() {
                    monitor.handle_signal(signal);
                }
                debug!("Security monitor observer stopped");
            })
    }

    pub fn handle_signal(&self, signal: SecuritySignal) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match signal {
            SecuritySignal::PermissionChecked(record) => self.on_permission_checked(record),
            SecuritySignal::Violation(violation) => {
                self.log_security_event(SecurityEvent::from(&violation));
            }
            SecuritySignal::Event(event) => {
                self.log_security_event(event);
            }
            SecuritySignal::InternalError {
                tenant_id,
                actor_id,
                kind,
                at,
            } => self.on_internal_error(tenant_id, actor_id, kind, at),
        }
    }

    fn on_permission_checked(&self, record: PermissionCheckRecord) {
        // Outages are reported separately and never count as denials
        if record.allowed || record.source == DecisionSource::StoreUnavailable {
            return;
        }
        self.log_security_event(
            SecurityEvent::new(
                record.tenant_id.as_str(),
                SecurityEventType::PermissionDenied,
                Severity::Low,
            )
            .with_actor(record.actor_id)
            .with_action(record.permission)
            .with_timestamp(record.timestamp),
        );
    }

    fn on_internal_error(
        &self,
        tenant_id: TenantId,
        actor_id: Option<String>,
        kind: InternalErrorKind,
        at: SystemTime,
    ) {
        *self.internal_errors.entry(tenant_id.clone()).or_default() += 1;
        let (event_type, severity) = match kind {
            InternalErrorKind::StoreUnavailable => (SecurityEventType::StorageOutage, Severity::High),
            InternalErrorKind::AuditWriteFailed => (SecurityEventType::AuditFailure, Severity::Medium),
        };
        warn!(tenant_id = %tenant_id, ?kind, "Internal error on decision path");

        let mut event = SecurityEvent::new(tenant_id, event_type, severity).with_timestamp(at);
        if let Some(actor_id) = actor_id {
            event = event.with_actor(actor_id);
        }
        self.log_security_event(event);
    }

    /// Feed the risk tracker; returns an enumeration event to log if one was detected
    fn track_risk(&self, event: &SecurityEvent) -> Option<SecurityEvent> {
        let actor_id = event.actor_id.as_deref()?;
        match event.event_type {
            SecurityEventType::PermissionDenied => {
                let permission = event.attempted_action.as_deref().unwrap_or_default();
                if self
                    .risk
                    .record_denial(&event.tenant_id, actor_id, permission, event.timestamp)
                {
                    warn!(
                        tenant_id = %event.tenant_id,
                        actor_id,
                        "Permission enumeration detected"
                    );
                    return Some(
                        SecurityEvent::new(
                            event.tenant_id.as_str(),
                            SecurityEventType::PermissionEnumeration,
                            Severity::High,
                        )
                        .with_actor(actor_id)
                        .with_timestamp(event.timestamp),
                    );
                }
            }
            SecurityEventType::PrivilegeEscalation | SecurityEventType::SystemRoleTampering => {
                self.risk
                    .record_escalation(&event.tenant_id, actor_id, event.timestamp);
            }
            SecurityEventType::CrossTenantAttempt => {
                // Attribute the probe to the actor's home tenant when known
                let home = event
                    .metadata
                    .get("actor_tenant_id")
                    .map(String::as_str)
                    .unwrap_or(&event.tenant_id);
                self.risk.record_cross_tenant(home, actor_id, event.timestamp);
            }
            _ => {}
        }
        None
    }

    fn evaluate_alert(&self, event: &SecurityEvent, tenant_log: &Log<SecurityEvent>) -> Option<Alert> {
        if !event.severity.is_severe() {
            return None;
        }

        let window_start = event
            .timestamp
            .checked_sub(self.thresholds.window)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let (critical, severe, first_seen) = {
            let events = tenant_log.read();
            let mut critical = 0;
            let mut severe = 0;
            let mut first_seen = event.timestamp;
            for e in events.iter().filter(|e| {
                e.event_type == event.event_type
                    && e.severity.is_severe()
                    && e.timestamp >= window_start
                    && e.timestamp <= event.timestamp
            }) {
                severe += 1;
                if e.severity == Severity::Critical {
                    critical += 1;
                }
                first_seen = first_seen.min(e.timestamp);
            }
            (critical, severe, first_seen)
        };

        let severity = if critical >= self.thresholds.critical_events {
            Severity::Critical
        } else if severe >= self.thresholds.high_events {
            Severity::High
        } else {
            return None;
        };

        let alerts = log_for(&self.alerts, &event.tenant_id);
        let mut alerts = alerts.write();
        if let Some(open) = alerts
            .iter_mut()
            .find(|a| !a.resolved && a.event_type == event.event_type)
        {
            open.event_count = open.event_count.max(severe);
            open.last_seen = open.last_seen.max(event.timestamp);
            open.severity = open.severity.max(severity);
            return Some(open.clone());
        }

        let alert = Alert::raise(
            &event.tenant_id,
            event.event_type,
            severity,
            severe,
            first_seen,
            event.timestamp,
        );
        warn!(
            tenant_id = %event.tenant_id,
            event_type = event.event_type.as_str(),
            severity = %severity,
            event_count = severe,
            "Security alert raised"
        );
        alerts.push(alert.clone());
        Some(alert)
    }
}

fn log_for<T>(logs: &DashMap<TenantId, Log<T>, RandomState>, tenant_id: &str) -> Log<T> {
    if let Some(log) = logs.get(tenant_id) {
        return Arc::clone(log.value());
    }
    Arc::clone(logs.entry(tenant_id.to_string()).or_default().value())
}

fn existing<T>(logs: &DashMap<TenantId, Log<T>, RandomState>, tenant_id: &str) -> Option<Log<T>> {
    logs.get(tenant_id).map(|log| Arc::clone(log.value()))
}
