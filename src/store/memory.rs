/*!
 * In-Memory Role Store
 * Indexed, lock-sharded implementation of the role store contract
 */

use super::traits::{DeletedRole, RoleStore};
use crate::core::errors::{StoreError, StoreResult};
use crate::core::types::{ActorId, AssignmentId, RoleId, TenantId};
use crate::roles::types::{Role, RoleAssignment};
use ahash::{HashMap, RandomState};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tracing::{debug, warn};

/// A role together with every assignment that references it
///
/// Keeping assignments inside the role's entry means the entry's shard lock
/// guards both the in-use count and new grants of that role.
#[derive(Debug, Clone)]
struct RoleEntry {
    role: Role,
    assignments: HashMap<AssignmentId, RoleAssignment>,
}

impl RoleEntry {
    fn new(role: Role) -> Self {
        Self {
            role,
            assignments: HashMap::default(),
        }
    }

    fn active_at(&self, at: SystemTime) -> usize {
        self.assignments
            .values()
            .filter(|a| a.is_active_at(at))
            .count()
    }
}

type NameKey = (Option<TenantId>, String);
type MemberKey = (TenantId, ActorId);

/// In-memory role store
///
/// Lock order is roles -> members -> assignment index; no method holds a
/// reference into one map while re-entering the same map.
pub struct MemoryRoleStore {
    roles: DashMap<RoleId, RoleEntry, RandomState>,
    names: DashMap<NameKey, RoleId, RandomState>,
    members: DashMap<MemberKey, Vec<(AssignmentId, RoleId)>, RandomState>,
    assignment_roles: DashMap<AssignmentId, RoleId, RandomState>,
    available: AtomicBool,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self {
            roles: DashMap::with_hasher(RandomState::new()),
            names: DashMap::with_hasher(RandomState::new()),
            members: DashMap::with_hasher(RandomState::new()),
            assignment_roles: DashMap::with_hasher(RandomState::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backing store going away or coming back
    pub fn set_available(&self, available: bool) {
        if !available {
            warn!("Role store marked unavailable");
        }
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    #[inline]
    fn ensure_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn unindex_member(&self, assignment: &RoleAssignment) {
        let key = (assignment.tenant_id.clone(), assignment.member_id.clone());
        if let Entry::Occupied(mut occupied) = self.members.entry(key) {
            occupied.get_mut().retain(|(id, _)| *id != assignment.id);
            if occupied.get().is_empty() {
                occupied.remove();
            }
        }
        self.assignment_roles.remove(&assignment.id);
    }
}

impl Default for MemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleStore for MemoryRoleStore {
    fn role(&self, id: &RoleId) -> StoreResult<Option<Role>> {
        self.ensure_available()?;
        Ok(self.roles.get(id).map(|entry| entry.role.clone()))
    }

    fn role_by_name(&self, tenant_id: Option<&str>, name: &str) -> StoreResult<Option<Role>> {
        self.ensure_available()?;
        let key = (tenant_id.map(str::to_string), name.to_string());
        let Some(id) = self.names.get(&key).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.roles.get(&id).map(|entry| entry.role.clone()))
    }

    fn roles_for_tenant(&self, tenant_id: &str) -> StoreResult<Vec<Role>> {
        self.ensure_available()?;
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|entry| entry.role.visible_to(tenant_id))
            .map(|entry| entry.role.clone())
            .collect();
        roles.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    fn insert_role(&self, role: Role) -> StoreResult<Role> {
        self.ensure_available()?;
        let key = (role.tenant_id.clone(), role.name.clone());
        match self.names.entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateName),
            Entry::Vacant(vacant) => {
                vacant.insert(role.id);
                self.roles.insert(role.id, RoleEntry::new(role.clone()));
                debug!(role_id = %role.id, system = role.is_system, "Role inserted");
                Ok(role)
            }
        }
    }

    fn update_role_permissions(
        &self,
        id: &RoleId,
        permissions: BTreeSet<String>,
        expected_version: u64,
    ) -> StoreResult<Role> {
        self.ensure_available()?;
        let mut entry = self.roles.get_mut(id).ok_or(StoreError::RoleNotFound)?;
        if entry.role.is_system {
            return Err(StoreError::Immutable);
        }
        if entry.role.version != expected_version {
            return Err(StoreError::VersionConflict);
        }

        entry.role.permissions = permissions;
        entry.role.version += 1;
        entry.role.updated_at = SystemTime::now();
        Ok(entry.role.clone())
    }

    fn delete_role_if_unassigned(&self, id: &RoleId, at: SystemTime) -> StoreResult<DeletedRole> {
        self.ensure_available()?;
        let removed = match self.roles.entry(*id) {
            Entry::Vacant(_) => return Err(StoreError::RoleNotFound),
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                if entry.role.is_system {
                    return Err(StoreError::Immutable);
                }
                let active = entry.active_at(at);
                if active > 0 {
                    return Err(StoreError::InUse(active));
                }
                occupied.remove()
            }
        };

        self.names
            .remove(&(removed.role.tenant_id.clone(), removed.role.name.clone()));
        let removed_assignments: Vec<RoleAssignment> =
            removed.assignments.into_values().collect();
        for assignment in &removed_assignments {
            self.unindex_member(assignment);
        }

        debug!(
            role_id = %removed.role.id,
            inactive_assignments = removed_assignments.len(),
            "Role deleted"
        );
        Ok(DeletedRole {
            role: removed.role,
            removed_assignments,
        })
    }

    fn insert_assignment(&self, assignment: RoleAssignment) -> StoreResult<RoleAssignment> {
        self.ensure_available()?;
        let mut entry = self
            .roles
            .get_mut(&assignment.role_id)
            .ok_or(StoreError::RoleNotFound)?;

        entry
            .assignments
            .insert(assignment.id, assignment.clone());
        self.members
            .entry((assignment.tenant_id.clone(), assignment.member_id.clone()))
            .or_default()
            .push((assignment.id, assignment.role_id));
        self.assignment_roles
            .insert(assignment.id, assignment.role_id);
        drop(entry);

        Ok(assignment)
    }

    fn remove_assignment(&self, id: &AssignmentId) -> StoreResult<RoleAssignment> {
        self.ensure_available()?;
        let role_id = self
            .assignment_roles
            .get(id)
            .map(|role_id| *role_id)
            .ok_or(StoreError::AssignmentNotFound)?;

        let assignment = {
            let mut entry = self
                .roles
                .get_mut(&role_id)
                .ok_or(StoreError::AssignmentNotFound)?;
            entry
                .assignments
                .remove(id)
                .ok_or(StoreError::AssignmentNotFound)?
        };
        self.unindex_member(&assignment);
        Ok(assignment)
    }

    fn assignments_for_member(
        &self,
        tenant_id: &str,
        member_id: &str,
    ) -> StoreResult<Vec<RoleAssignment>> {
        self.ensure_available()?;
        let key = (tenant_id.to_string(), member_id.to_string());
        let refs = match self.members.get(&key) {
            Some(refs) => refs.clone(),
            None => return Ok(Vec::new()),
        };

        Ok(refs
            .into_iter()
            .filter_map(|(assignment_id, role_id)| {
                self.roles
                    .get(&role_id)
                    .and_then(|entry| entry.assignments.get(&assignment_id).cloned())
            })
            .collect())
    }

    fn assignments_for_role(&self, role_id: &RoleId) -> StoreResult<Vec<RoleAssignment>> {
        self.ensure_available()?;
        Ok(self
            .roles
            .get(role_id)
            .map(|entry| entry.assignments.values().cloned().collect())
            .unwrap_or_default())
    }

    fn role_count(&self) -> StoreResult<usize> {
        self.ensure_available()?;
        Ok(self.roles.len())
    }
}
