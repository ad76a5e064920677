/*!
 * Role Manager
 * Custom role lifecycle and role assignment for one tenant
 *
 * Rules enforced here:
 * - system roles are never modified or deleted, whoever asks
 * - an actor may only create, edit, delete or grant a role whose level does
 *   not exceed the actor's own highest active level
 * - role administration needs `role.manage`, assignments need `member.manage`
 * - a role may only carry grants the acting actor already holds
 * - every mutation invalidates the cached grants of the members it affects
 *   before returning
 */

use super::types::{is_valid_level, AssignmentRequest, NewRole, Role, RoleAssignment};
use crate::core::errors::{RoleError, RoleResult};
use crate::core::types::{AssignmentId, RoleId, Severity, TenantId};
use crate::monitoring::events::{SecurityEvent, SecurityEventType};
use crate::monitoring::signals::{SecuritySignal, SignalSender};
use crate::permissions::evaluator::PermissionEvaluator;
use crate::permissions::types::{grants_cover, is_valid_grant, Permission};
use crate::store::traits::RoleStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

/// Role administration bound to one tenant
#[derive(Clone)]
pub struct RoleManager {
    tenant_id: TenantId,
    store: Arc<dyn RoleStore>,
    evaluator: PermissionEvaluator,
    signals: SignalSender,
}

impl RoleManager {
    /// `evaluator` must be bound to the same tenant
    pub fn new(
        store: Arc<dyn RoleStore>,
        evaluator: PermissionEvaluator,
        signals: SignalSender,
    ) -> Self {
        Self {
            tenant_id: evaluator.tenant_id().to_string(),
            store,
            evaluator,
            signals,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Create a role owned by this tenant
    pub fn create_custom_role(&self, actor_id: &str, spec: NewRole) -> RoleResult<Role> {
        if !is_valid_level(spec.role_level) {
            return Err(RoleError::InvalidRoleLevel);
        }
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(RoleError::EmptyName);
        }
        validate_grants(&spec.permissions)?;
        if self.store.role_by_name(None, name)?.is_some() {
            return Err(RoleError::DuplicateName);
        }
        self.require_level(actor_id, spec.role_level, "create_role")?;
        let held = self.require_permission(actor_id, Permission::RoleManage, "create_role")?;
        self.require_held(actor_id, &held, &spec.permissions, "create_role")?;

        let spec = NewRole {
            name: name.to_string(),
            ..spec
        };
        let role = self.store.insert_role(Role::custom(self.tenant_id.as_str(), spec))?;
        info!(
            tenant_id = %self.tenant_id,
            actor_id,
            role_id = %role.id,
            level = role.level,
            "Custom role created"
        );
        Ok(role)
    }

    /// Replace the permission set of a custom role
    pub fn update_role_permissions(
        &self,
        role_id: &RoleId,
        actor_id: &str,
        permissions: BTreeSet<String>,
    ) -> RoleResult<Role> {
        let role = self.mutable_role(role_id, actor_id, "update_role")?;
        validate_grants(&permissions)?;
        self.require_level(actor_id, role.level, "update_role")?;
        let held = self.require_permission(actor_id, Permission::RoleManage, "update_role")?;
        self.require_held(actor_id, &held, &permissions, "update_role")?;

        let updated = self
            .store
            .update_role_permissions(role_id, permissions, role.version)?;
        self.invalidate_role_members(role_id)?;

        info!(
            tenant_id = %self.tenant_id,
            actor_id,
            role_id = %role_id,
            version = updated.version,
            "Role permissions updated"
        );
        Ok(updated)
    }

    /// Delete a custom role that no active assignment references
    ///
    /// Expired and future assignments are removed with the role.
    pub fn delete_custom_role(&self, role_id: &RoleId, actor_id: &str) -> RoleResult<()> {
        let role = self.mutable_role(role_id, actor_id, "delete_role")?;
        self.require_level(actor_id, role.level, "delete_role")?;
        self.require_permission(actor_id, Permission::RoleManage, "delete_role")?;

        let deleted = self
            .store
            .delete_role_if_unassigned(role_id, SystemTime::now())?;
        for assignment in &deleted.removed_assignments {
            self.evaluator
                .clear_user_permission_cache(&assignment.member_id);
        }

        info!(
            tenant_id = %self.tenant_id,
            actor_id,
            role_id = %role_id,
            swept_assignments = deleted.removed_assignments.len(),
            "Custom role deleted"
        );
        Ok(())
    }

    /// Grant a system role or one of this tenant's roles to a member
    pub fn assign_role(
        &self,
        actor_id: &str,
        request: AssignmentRequest,
    ) -> RoleResult<RoleAssignment> {
        if let Some(until) = request.effective_until {
            if until < request.effective_from {
                return Err(RoleError::InvalidWindow);
            }
        }
        let role = self
            .store
            .role(&request.role_id)?
            .filter(|role| role.visible_to(&self.tenant_id))
            .ok_or(RoleError::NotFound)?;
        self.require_level(actor_id, role.level, "assign_role")?;
        let held = self.require_permission(actor_id, Permission::MemberManage, "assign_role")?;
        self.require_held(actor_id, &held, &role.permissions, "assign_role")?;

        let assignment = self
            .store
            .insert_assignment(request.into_assignment(self.tenant_id.clone()))?;
        self.evaluator
            .clear_user_permission_cache(&assignment.member_id);

        info!(
            tenant_id = %self.tenant_id,
            actor_id,
            member_id = %assignment.member_id,
            role_id = %assignment.role_id,
            "Role assigned"
        );
        Ok(assignment)
    }

    /// Remove one of a member's assignments
    pub fn revoke_assignment(
        &self,
        actor_id: &str,
        member_id: &str,
        assignment_id: &AssignmentId,
    ) -> RoleResult<RoleAssignment> {
        let assignment = self
            .store
            .assignments_for_member(&self.tenant_id, member_id)?
            .into_iter()
            .find(|assignment| assignment.id == *assignment_id)
            .ok_or(RoleError::NotFound)?;
        if let Some(role) = self.store.role(&assignment.role_id)? {
            self.require_level(actor_id, role.level, "revoke_assignment")?;
        }
        self.require_permission(actor_id, Permission::MemberManage, "revoke_assignment")?;

        let removed = self.store.remove_assignment(assignment_id)?;
        self.evaluator.clear_user_permission_cache(member_id);

        info!(
            tenant_id = %self.tenant_id,
            actor_id,
            member_id,
            role_id = %removed.role_id,
            "Role assignment revoked"
        );
        Ok(removed)
    }

    /// System roles plus this tenant's custom roles, most senior first
    pub fn list_roles(&self) -> RoleResult<Vec<Role>> {
        Ok(self.store.roles_for_tenant(&self.tenant_id)?)
    }

    /// Every assignment of a member in this tenant, active or not
    pub fn member_assignments(&self, member_id: &str) -> RoleResult<Vec<RoleAssignment>> {
        Ok(self
            .store
            .assignments_for_member(&self.tenant_id, member_id)?)
    }

    /// Highest level among the actor's active roles, None without any
    pub fn actor_level(&self, actor_id: &str) -> RoleResult<Option<i32>> {
        Ok(self.evaluator.actor_level(actor_id)?)
    }

    /// Look up a role this tenant may mutate
    fn mutable_role(&self, role_id: &RoleId, actor_id: &str, action: &str) -> RoleResult<Role> {
        let role = self.store.role(role_id)?.ok_or(RoleError::NotFound)?;
        if role.is_system {
            warn!(tenant_id = %self.tenant_id, actor_id, action, "System role mutation rejected");
            self.report(
                SecurityEvent::new(
                    self.tenant_id.as_str(),
                    SecurityEventType::SystemRoleTampering,
                    Severity::Critical,
                )
                .with_actor(actor_id)
                .with_action(action)
                .with_metadata("role_id", role.id.to_string()),
            );
            return Err(RoleError::SystemRoleProtected);
        }
        // Another tenant's role is indistinguishable from a missing one
        if !role.visible_to(&self.tenant_id) {
            return Err(RoleError::NotFound);
        }
        Ok(role)
    }

    fn require_level(&self, actor_id: &str, required: i32, action: &str) -> RoleResult<()> {
        let level = self.evaluator.actor_level(actor_id)?;
        if level.map_or(false, |level| level >= required) {
            return Ok(());
        }

        warn!(
            tenant_id = %self.tenant_id,
            actor_id,
            action,
            required,
            actor_level = ?level,
            "Privilege escalation attempt"
        );
        self.report(
            self.escalation(actor_id, action)
                .with_metadata("required_level", required.to_string())
                .with_metadata(
                    "actor_level",
                    level.map_or_else(|| "none".to_string(), |l| l.to_string()),
                ),
        );
        Err(RoleError::InsufficientLevel)
    }

    /// Fail unless the actor holds `permission`; returns the actor's grants
    fn require_permission(
        &self,
        actor_id: &str,
        permission: Permission,
        action: &str,
    ) -> RoleResult<Arc<BTreeSet<String>>> {
        let held = self.evaluator.effective_permissions(actor_id)?;
        if grants_cover(held.iter(), permission.as_str()) {
            return Ok(held);
        }

        warn!(
            tenant_id = %self.tenant_id,
            actor_id,
            action,
            missing = permission.as_str(),
            "Role administration without permission"
        );
        self.report(
            self.escalation(actor_id, action)
                .with_metadata("missing_permission", permission.as_str()),
        );
        Err(RoleError::MissingPermission(permission.as_str().to_string()))
    }

    /// Fail if any of `grants` exceeds what the actor holds
    fn require_held(
        &self,
        actor_id: &str,
        held: &BTreeSet<String>,
        grants: &BTreeSet<String>,
        action: &str,
    ) -> RoleResult<()> {
        let Some(grant) = grants.iter().find(|grant| !grants_cover(held.iter(), grant)) else {
            return Ok(());
        };

        warn!(
            tenant_id = %self.tenant_id,
            actor_id,
            action,
            grant = grant.as_str(),
            "Attempt to grant an unheld permission"
        );
        self.report(
            self.escalation(actor_id, action)
                .with_metadata("unheld_grant", grant.as_str()),
        );
        Err(RoleError::GrantNotHeld(grant.clone()))
    }

    fn escalation(&self, actor_id: &str, action: &str) -> SecurityEvent {
        SecurityEvent::new(
            self.tenant_id.as_str(),
            SecurityEventType::PrivilegeEscalation,
            Severity::High,
        )
        .with_actor(actor_id)
        .with_action(action)
    }

    fn invalidate_role_members(&self, role_id: &RoleId) -> RoleResult<()> {
        for assignment in self.store.assignments_for_role(role_id)? {
            if assignment.tenant_id == self.tenant_id {
                self.evaluator
                    .clear_user_permission_cache(&assignment.member_id);
            }
        }
        Ok(())
    }

    fn report(&self, event: SecurityEvent) {
        self.signals.publish(SecuritySignal::Event(event));
    }
}

fn validate_grants(permissions: &BTreeSet<String>) -> RoleResult<()> {
    if permissions.iter().all(|grant| is_valid_grant(grant)) {
        Ok(())
    } else {
        Err(RoleError::InvalidPermission)
    }
}
