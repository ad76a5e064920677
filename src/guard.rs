/*!
 * Access Guard
 * Composition root wiring store, cache, audit trail, boundary and monitor
 *
 * One guard serves every tenant. Evaluators and role managers are cheap
 * tenant-bound handles over the shared cache and store.
 */

use crate::audit::trail::{AuditSink, AuditTrail};
use crate::core::config::GuardConfig;
use crate::core::errors::GuardResult;
use crate::core::types::{ActorId, ActorRole, TenantId};
use crate::monitoring::monitor::SecurityMonitor;
use crate::monitoring::signals::{signal_channel, SignalSender, SignalStats};
use crate::monitoring::DecisionSpan;
use crate::permissions::cache::{CacheStats, PermissionCache};
use crate::permissions::evaluator::PermissionEvaluator;
use crate::roles::manager::RoleManager;
use crate::store::seed::seed_system_roles;
use crate::store::traits::RoleStore;
use crate::store::MemoryRoleStore;
use crate::tenant::boundary::{AccessDecision, TenantBoundary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Denial reason when the boundary passes but the capability is missing
pub const PERMISSION_DENIED: &str = "Permission denied";

/// A privileged action to authorize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub actor_id: ActorId,
    pub actor_tenant_id: TenantId,
    pub target_tenant_id: TenantId,
    pub actor_role: ActorRole,
    pub permission: String,
}

impl AuthorizationRequest {
    /// Request within the actor's own tenant
    pub fn new(
        tenant_id: impl Into<TenantId>,
        actor_id: impl Into<ActorId>,
        actor_role: ActorRole,
        permission: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            actor_id: actor_id.into(),
            actor_tenant_id: tenant_id.clone(),
            target_tenant_id: tenant_id,
            actor_role,
            permission: permission.into(),
        }
    }

    pub fn targeting(mut self, target_tenant_id: impl Into<TenantId>) -> Self {
        self.target_tenant_id = target_tenant_id.into();
        self
    }
}

/// Outcome of `AccessGuard::authorize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub allowed: bool,
    pub reason: Option<String>,
    pub boundary: AccessDecision,
    /// Tenant whose grants were evaluated; None when the boundary denied
    pub evaluated_tenant_id: Option<TenantId>,
    pub trace_id: String,
}

/// Builder for `AccessGuard`
pub struct AccessGuardBuilder {
    config: GuardConfig,
    store: Option<Arc<dyn RoleStore>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl AccessGuardBuilder {
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
            store: None,
            audit: None,
        }
    }

    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an external role store instead of the in-memory one
    pub fn with_store(mut self, store: Arc<dyn RoleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an external audit sink instead of the in-memory trail
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate the configuration, seed system roles and wire components
    pub fn build(self) -> GuardResult<AccessGuard> {
        self.config.validate()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryRoleStore::new()));
        let audit = self.audit.unwrap_or_else(|| {
            Arc::new(AuditTrail::with_timeout(self.config.audit.write_timeout))
        });
        let seeded = seed_system_roles(store.as_ref())?;

        let cache = Arc::new(PermissionCache::new(
            self.config.cache.capacity,
            self.config.cache.ttl,
        ));
        let (signals, receiver) = signal_channel(self.config.audit.signal_capacity);
        let boundary = Arc::new(TenantBoundary::new(
            Arc::clone(&audit),
            self.config.health.clone(),
            signals.clone(),
        ));
        let monitor = Arc::new(SecurityMonitor::new(
            receiver,
            self.config.alerts.clone(),
            self.config.risk.clone(),
        ));

        info!(
            seeded_roles = seeded,
            cache_capacity = self.config.cache.capacity,
            signal_capacity = self.config.audit.signal_capacity,
            "Access guard initialized"
        );

        Ok(AccessGuard {
            config: self.config,
            store,
            cache,
            audit,
            signals,
            boundary,
            monitor,
        })
    }
}

impl Default for AccessGuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point of the crate
pub struct AccessGuard {
    config: GuardConfig,
    store: Arc<dyn RoleStore>,
    cache: Arc<PermissionCache>,
    audit: Arc<dyn AuditSink>,
    signals: SignalSender,
    boundary: Arc<TenantBoundary>,
    monitor: Arc<SecurityMonitor>,
}

impl AccessGuard {
    pub fn builder() -> AccessGuardBuilder {
        AccessGuardBuilder::new()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Permission evaluator bound to `tenant_id`
    pub fn evaluator(&self, tenant_id: impl Into<TenantId>) -> PermissionEvaluator {
        PermissionEvaluator::new(
            tenant_id,
            Arc::clone(&self.cache),
            Arc::clone(&self.store),
            Arc::clone(&self.audit),
            self.signals.clone(),
        )
    }

    /// Role manager bound to `tenant_id`
    pub fn role_manager(&self, tenant_id: impl Into<TenantId>) -> RoleManager {
        RoleManager::new(
            Arc::clone(&self.store),
            self.evaluator(tenant_id),
            self.signals.clone(),
        )
    }

    pub fn boundary(&self) -> &Arc<TenantBoundary> {
        &self.boundary
    }

    pub fn monitor(&self) -> &Arc<SecurityMonitor> {
        &self.monitor
    }

    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn signal_stats(&self) -> SignalStats {
        self.signals.stats()
    }

    /// Start the monitor's background observer
    pub fn start_observer(&self) -> std::io::Result<JoinHandle<()>> {
        self.monitor.spawn_observer()
    }

    /// Tenant boundary first, then the capability check
    ///
    /// A platform role crossing tenants is evaluated against the grants of
    /// its home tenant; everyone else only ever reaches their own tenant.
    pub fn authorize(&self, request: &AuthorizationRequest) -> Authorization {
        let span = DecisionSpan::new(
            &request.target_tenant_id,
            &request.actor_id,
            &request.permission,
        );
        let _entered = span.enter();

        let actor_role = self.verified_role(request);
        let boundary = self.boundary.validate_member_access(
            &request.actor_id,
            &request.actor_tenant_id,
            &request.target_tenant_id,
            actor_role,
            &request.permission,
        );
        if !boundary.allowed {
            span.record_outcome(false);
            return Authorization {
                allowed: false,
                reason: boundary.reason.clone(),
                boundary,
                evaluated_tenant_id: None,
                trace_id: span.trace_id().to_string(),
            };
        }

        // Same tenant, or a platform role carrying its home grants
        let evaluated = request.actor_tenant_id.clone();
        let allowed = self
            .evaluator(evaluated.as_str())
            .has_permission(&request.actor_id, &request.permission);
        span.record_outcome(allowed);

        Authorization {
            allowed,
            reason: (!allowed).then(|| PERMISSION_DENIED.to_string()),
            boundary,
            evaluated_tenant_id: Some(evaluated),
            trace_id: span.trace_id().to_string(),
        }
    }

    /// The claimed role, unless it is a platform role the actor does not hold
    ///
    /// A platform claim must be backed by an active `super_admin` or `admin`
    /// assignment in the actor's home tenant. Anything else is treated as a
    /// tenant-bound user, so a crossing attempt is denied and recorded.
    fn verified_role(&self, request: &AuthorizationRequest) -> ActorRole {
        let claimed = request.actor_role;
        if !claimed.bypasses_tenant_boundary() || request.actor_tenant_id.is_empty() {
            return claimed;
        }

        match self
            .evaluator(request.actor_tenant_id.as_str())
            .active_system_roles(&request.actor_id)
        {
            Ok(held)
                if held
                    .iter()
                    .filter_map(|name| name.parse::<ActorRole>().ok())
                    .any(|role| role.bypasses_tenant_boundary()) =>
            {
                claimed
            }
            Ok(_) => {
                warn!(
                    actor_id = %request.actor_id,
                    actor_tenant_id = %request.actor_tenant_id,
                    claimed = %claimed,
                    "Platform role claim not backed by an assignment"
                );
                ActorRole::User
            }
            Err(err) => {
                warn!(
                    actor_id = %request.actor_id,
                    claimed = %claimed,
                    error = %err,
                    "Platform role claim unverifiable"
                );
                ActorRole::User
            }
        }
    }
}
