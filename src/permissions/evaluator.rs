/*!
 * Permission Evaluator
 * Tenant-bound capability checks over cached role resolution
 *
 * Every `has_permission` call appends exactly one audit record and fails
 * closed when the role store cannot be read.
 */

use super::cache::{CacheKey, CacheStats, PermissionCache};
use super::types::{grants_cover, Permission};
use crate::audit::trail::AuditSink;
use crate::audit::types::{DecisionSource, PermissionCheckRecord};
use crate::core::errors::{GuardResult, StoreResult};
use crate::core::types::TenantId;
use crate::monitoring::signals::{InternalErrorKind, SecuritySignal, SignalSender};
use crate::roles::types::Role;
use crate::store::traits::RoleStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Capability checker scoped to one tenant
///
/// Cheap to clone; every clone shares the process-wide cache, store and
/// audit sink.
#[derive(Clone)]
pub struct PermissionEvaluator {
    tenant_id: TenantId,
    cache: Arc<PermissionCache>,
    store: Arc<dyn RoleStore>,
    audit: Arc<dyn AuditSink>,
    signals: SignalSender,
}

impl PermissionEvaluator {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        cache: Arc<PermissionCache>,
        store: Arc<dyn RoleStore>,
        audit: Arc<dyn AuditSink>,
        signals: SignalSender,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            cache,
            store,
            audit,
            signals,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Whether `actor_id` holds `permission` in this tenant
    ///
    /// `permission` is compared as an opaque string against the actor's
    /// grants; it is never parsed or forwarded to the store.
    pub fn has_permission(&self, actor_id: &str, permission: &str) -> bool {
        let (allowed, source) = match self.permission_set(actor_id) {
            Ok((set, source)) => (grants_cover(set.iter(), permission), source),
            Err(_) => {
                warn!(
                    tenant_id = %self.tenant_id,
                    actor_id,
                    "Role store unavailable, denying permission check"
                );
                self.signals.publish(SecuritySignal::internal_error(
                    self.tenant_id.as_str(),
                    Some(actor_id),
                    InternalErrorKind::StoreUnavailable,
                ));
                (false, DecisionSource::StoreUnavailable)
            }
        };

        if allowed {
            debug!(tenant_id = %self.tenant_id, actor_id, ?source, "Permission granted");
        } else {
            debug!(tenant_id = %self.tenant_id, actor_id, ?source, "Permission denied");
        }

        let record = PermissionCheckRecord::new(
            self.tenant_id.as_str(),
            actor_id,
            permission,
            allowed,
            source,
        );
        if let Err(err) = self.audit.record_check(record.clone()) {
            warn!(tenant_id = %self.tenant_id, actor_id, error = %err, "Audit write failed");
            self.signals.publish(SecuritySignal::internal_error(
                self.tenant_id.as_str(),
                Some(actor_id),
                InternalErrorKind::AuditWriteFailed,
            ));
        }
        self.signals.publish(SecuritySignal::PermissionChecked(record));

        allowed
    }

    /// Typed form of `has_permission`
    #[inline]
    pub fn has(&self, actor_id: &str, permission: Permission) -> bool {
        self.has_permission(actor_id, permission.as_str())
    }

    /// Effective grants of an actor in this tenant
    ///
    /// Diagnostic read: store failures are returned instead of collapsed into
    /// a denial, and no audit record is written.
    pub fn get_user_permissions(&self, actor_id: &str) -> GuardResult<BTreeSet<String>> {
        Ok(self.effective_permissions(actor_id)?.as_ref().clone())
    }

    /// Shared effective grants for internal authorization checks; no audit record
    pub fn effective_permissions(&self, actor_id: &str) -> StoreResult<Arc<BTreeSet<String>>> {
        let (set, _) = self.permission_set(actor_id)?;
        Ok(set)
    }

    /// Drop the cached grants of one actor in this tenant
    pub fn clear_user_permission_cache(&self, actor_id: &str) {
        self.cache.invalidate(&self.tenant_id, actor_id);
        debug!(tenant_id = %self.tenant_id, actor_id, "Permission cache cleared");
    }

    /// Highest hierarchy level among the actor's active roles in this tenant
    pub fn actor_level(&self, actor_id: &str) -> StoreResult<Option<i32>> {
        let (roles, _) = self.active_roles(actor_id, SystemTime::now())?;
        Ok(roles.iter().map(|role| role.level).max())
    }

    /// Names of the system roles the actor currently holds in this tenant
    pub fn active_system_roles(&self, actor_id: &str) -> StoreResult<Vec<String>> {
        let (roles, _) = self.active_roles(actor_id, SystemTime::now())?;
        Ok(roles
            .into_iter()
            .filter(|role| role.is_system)
            .map(|role| role.name)
            .collect())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn permission_set(
        &self,
        actor_id: &str,
    ) -> StoreResult<(Arc<BTreeSet<String>>, DecisionSource)> {
        let key = CacheKey::new(self.tenant_id.as_str(), actor_id);
        if let Some(cached) = self.cache.get(&key) {
            return Ok((cached, DecisionSource::Cache));
        }

        let generation = self.cache.generation();
        let (resolved, next_change) = self.resolve(actor_id)?;
        let resolved = Arc::new(resolved);
        self.cache
            .put_if_current(key, Arc::clone(&resolved), generation, next_change);
        Ok((resolved, DecisionSource::Store))
    }

    /// Union of the grants of every active role visible in this tenant
    ///
    /// Also returns when the set next changes because an assignment window
    /// opens or closes.
    fn resolve(&self, actor_id: &str) -> StoreResult<(BTreeSet<String>, Option<SystemTime>)> {
        let (roles, next_change) = self.active_roles(actor_id, SystemTime::now())?;
        let mut permissions = BTreeSet::new();
        for role in roles {
            permissions.extend(role.permissions);
        }
        Ok((permissions, next_change))
    }

    fn active_roles(
        &self,
        actor_id: &str,
        at: SystemTime,
    ) -> StoreResult<(Vec<Role>, Option<SystemTime>)> {
        let mut roles = Vec::new();
        let mut next_change: Option<SystemTime> = None;
        for assignment in self.store.assignments_for_member(&self.tenant_id, actor_id)? {
            if assignment.tenant_id != self.tenant_id {
                continue;
            }
            // Windows are inclusive of `effective_until`
            let upcoming = [
                Some(assignment.effective_from).filter(|from| *from > at),
                assignment.effective_until.filter(|until| *until >= at),
            ];
            for boundary in upcoming.into_iter().flatten() {
                next_change = Some(next_change.map_or(boundary, |next| next.min(boundary)));
            }
            if !assignment.is_active_at(at) {
                continue;
            }
            match self.store.role(&assignment.role_id)? {
                Some(role) if role.visible_to(&self.tenant_id) => roles.push(role),
                _ => {}
            }
        }
        Ok((roles, next_change))
    }
}
