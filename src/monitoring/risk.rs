/*!
 * Risk Scoring
 * Per-actor sliding windows of denials, escalation attempts and cross-tenant probes
 *
 * Strategy: keep only timestamps inside the longest window, prune on every
 * write, and derive the score on demand.
 */

use crate::core::config::RiskThresholds;
use crate::core::limits::MAX_RISK_SCORE;
use crate::core::types::{ActorId, TenantId};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, SystemTime};

/// Risk band derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Risk of one actor inside one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tenant_id: TenantId,
    pub actor_id: ActorId,
    /// 0..=100
    pub score: u32,
    pub level: RiskLevel,
    pub recent_denials: usize,
    pub escalation_attempts: usize,
    pub cross_tenant_attempts: usize,
    pub enumeration_detected: bool,
}

#[derive(Debug, Default)]
struct ActorActivity {
    denials: VecDeque<(SystemTime, String)>,
    escalations: VecDeque<SystemTime>,
    cross_tenant: VecDeque<SystemTime>,
    enumeration_at: Option<SystemTime>,
}

impl ActorActivity {
    fn prune(&mut self, now: SystemTime, horizon: Duration) {
        let Some(cutoff) = now.checked_sub(horizon) else {
            return;
        };
        while self.denials.front().map_or(false, |(at, _)| *at < cutoff) {
            self.denials.pop_front();
        }
        while self.escalations.front().map_or(false, |at| *at < cutoff) {
            self.escalations.pop_front();
        }
        while self.cross_tenant.front().map_or(false, |at| *at < cutoff) {
            self.cross_tenant.pop_front();
        }
    }

    fn distinct_denied_since(&self, since: SystemTime) -> usize {
        self.denials
            .iter()
            .filter(|(at, _)| *at >= since)
            .map(|(_, code)| code.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

fn count_since(times: &VecDeque<SystemTime>, since: SystemTime) -> usize {
    times.iter().filter(|at| **at >= since).count()
}

fn since(now: SystemTime, window: Duration) -> SystemTime {
    now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Risk tracker keyed by (tenant, actor)
pub struct RiskTracker {
    actors: DashMap<(TenantId, ActorId), ActorActivity, RandomState>,
    thresholds: RiskThresholds,
}

impl RiskTracker {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self {
            actors: DashMap::with_hasher(RandomState::new()),
            thresholds,
        }
    }

    fn horizon(&self) -> Duration {
        self.thresholds.window.max(self.thresholds.enumeration_window)
    }

    /// Record a denied permission check
    ///
    /// Returns true when this denial starts a new enumeration sweep: at least
    /// `enumeration_distinct_codes` distinct codes denied inside the
    /// enumeration window, with no sweep flagged in that window already.
    pub fn record_denial(
        &self,
        tenant_id: &str,
        actor_id: &str,
        permission: &str,
        at: SystemTime,
    ) -> bool {
        let horizon = self.horizon();
        let mut activity = self
            .actors
            .entry((tenant_id.to_string(), actor_id.to_string()))
            .or_default();
        activity.denials.push_back((at, permission.to_string()));
        activity.prune(at, horizon);

        let window_start = since(at, self.thresholds.enumeration_window);
        if activity.distinct_denied_since(window_start)
            < self.thresholds.enumeration_distinct_codes
        {
            return false;
        }
        if activity
            .enumeration_at
            .map_or(false, |flagged| flagged >= window_start)
        {
            return false;
        }
        activity.enumeration_at = Some(at);
        true
    }

    pub fn record_escalation(&self, tenant_id: &str, actor_id: &str, at: SystemTime) {
        let horizon = self.horizon();
        let mut activity = self
            .actors
            .entry((tenant_id.to_string(), actor_id.to_string()))
            .or_default();
        activity.escalations.push_back(at);
        activity.prune(at, horizon);
    }

    pub fn record_cross_tenant(&self, tenant_id: &str, actor_id: &str, at: SystemTime) {
        let horizon = self.horizon();
        let mut activity = self
            .actors
            .entry((tenant_id.to_string(), actor_id.to_string()))
            .or_default();
        activity.cross_tenant.push_back(at);
        activity.prune(at, horizon);
    }

    /// Score an actor as of `now`; unknown actors score zero
    pub fn assess(&self, tenant_id: &str, actor_id: &str, now: SystemTime) -> RiskAssessment {
        let window_start = since(now, self.thresholds.window);
        let key = (tenant_id.to_string(), actor_id.to_string());

        let (denials, escalations, cross_tenant, enumeration) = match self.actors.get(&key) {
            Some(activity) => (
                activity
                    .denials
                    .iter()
                    .filter(|(at, _)| *at >= window_start)
                    .count(),
                count_since(&activity.escalations, window_start),
                count_since(&activity.cross_tenant, window_start),
                activity
                    .enumeration_at
                    .map_or(false, |flagged| flagged >= window_start),
            ),
            None => (0, 0, 0, false),
        };

        let t = &self.thresholds;
        let raw = (denials as u64) * u64::from(t.weight_denial)
            + (escalations as u64) * u64::from(t.weight_escalation)
            + (cross_tenant as u64) * u64::from(t.weight_cross_tenant)
            + if enumeration {
                u64::from(t.weight_enumeration)
            } else {
                0
            };
        let score = raw.min(u64::from(MAX_RISK_SCORE)) as u32;

        RiskAssessment {
            tenant_id: tenant_id.to_string(),
            actor_id: actor_id.to_string(),
            score,
            level: RiskLevel::from_score(score),
            recent_denials: denials,
            escalation_attempts: escalations,
            cross_tenant_attempts: cross_tenant,
            enumeration_detected: enumeration,
        }
    }

    /// Actors with recorded activity
    pub fn tracked_actors(&self) -> usize {
        self.actors.len()
    }
}

impl Default for RiskTracker {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}
