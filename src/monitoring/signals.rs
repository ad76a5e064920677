/*!
 * Security Signals
 * Bounded channel carrying decisions, violations and internal errors to the monitor
 *
 * Producers never block: when the channel is full the signal is dropped and
 * counted. Decisions and their audit records do not depend on delivery.
 */

use super::events::SecurityEvent;
use crate::audit::types::{PermissionCheckRecord, SecurityViolation};
use crate::core::types::{ActorId, TenantId};
use flume::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

/// Internal failure observed on a decision path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalErrorKind {
    /// Role store unreachable; the decision failed closed
    StoreUnavailable,
    /// Audit record could not be appended; the decision still completed
    AuditWriteFailed,
}

/// Message published to the security monitor
#[derive(Debug, Clone)]
pub enum SecuritySignal {
    PermissionChecked(PermissionCheckRecord),
    Violation(SecurityViolation),
    Event(SecurityEvent),
    InternalError {
        tenant_id: TenantId,
        actor_id: Option<ActorId>,
        kind: InternalErrorKind,
        at: SystemTime,
    },
}

impl SecuritySignal {
    pub fn internal_error(
        tenant_id: impl Into<TenantId>,
        actor_id: Option<&str>,
        kind: InternalErrorKind,
    ) -> Self {
        SecuritySignal::InternalError {
            tenant_id: tenant_id.into(),
            actor_id: actor_id.map(str::to_string),
            kind,
            at: SystemTime::now(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            SecuritySignal::PermissionChecked(record) => &record.tenant_id,
            SecuritySignal::Violation(violation) => &violation.tenant_id,
            SecuritySignal::Event(event) => &event.tenant_id,
            SecuritySignal::InternalError { tenant_id, .. } => tenant_id,
        }
    }
}

/// Delivery statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub published: u64,
    pub dropped: u64,
    pub pending: usize,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Producer handle, cloned into every component that reports to the monitor
#[derive(Clone)]
pub struct SignalSender {
    tx: Sender<SecuritySignal>,
    counters: Arc<Counters>,
}

impl SignalSender {
    /// Publish without blocking; returns false if the signal was dropped
    #[inline]
    pub fn publish(&self, signal: SecuritySignal) -> bool {
        match self.tx.try_send(signal) {
            Ok(()) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(signal)) | Err(TrySendError::Disconnected(signal)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(tenant_id = signal.tenant_id(), "Security signal dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> SignalStats {
        SignalStats {
            published: self.counters.published.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            pending: self.tx.len(),
        }
    }
}

/// Consumer handle owned by the security monitor
#[derive(Clone)]
pub struct SignalReceiver {
    rx: Receiver<SecuritySignal>,
}

impl SignalReceiver {
    /// Next pending signal, if any
    #[inline]
    pub fn try_next(&self) -> Option<SecuritySignal> {
        self.rx.try_recv().ok()
    }

    /// Block until a signal arrives; None once every sender is gone
    pub fn next_blocking(&self) -> Option<SecuritySignal> {
        self.rx.recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Create a bounded signal channel
pub fn signal_channel(capacity: usize) -> (SignalSender, SignalReceiver) {
    let (tx, rx) = flume::bounded(capacity);
    (
        SignalSender {
            tx,
            counters: Arc::new(Counters::default()),
        },
        SignalReceiver { rx },
    )
}
