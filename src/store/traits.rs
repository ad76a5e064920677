/*!
 * Role Store Traits
 * Boundary to the persistent store holding roles and assignments
 */

use crate::core::errors::StoreResult;
use crate::core::types::{AssignmentId, RoleId};
use crate::roles::types::{Role, RoleAssignment};
use std::collections::BTreeSet;
use std::time::SystemTime;

/// Role removed by a guarded delete, with the inactive assignments removed alongside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedRole {
    pub role: Role,
    pub removed_assignments: Vec<RoleAssignment>,
}

/// Storage contract for roles and role assignments
///
/// Every lookup is by identifier through an index; callers never pass query
/// fragments. Guarded operations are atomic per role: the in-use check of
/// `delete_role_if_unassigned` and `insert_assignment` for the same role never
/// interleave.
pub trait RoleStore: Send + Sync {
    /// Fetch a role by id
    fn role(&self, id: &RoleId) -> StoreResult<Option<Role>>;

    /// Fetch a role by name; `tenant_id` None looks up platform roles
    fn role_by_name(&self, tenant_id: Option<&str>, name: &str) -> StoreResult<Option<Role>>;

    /// Platform roles plus the roles owned by `tenant_id`
    fn roles_for_tenant(&self, tenant_id: &str) -> StoreResult<Vec<Role>>;

    /// Insert a new role; names are unique per owner
    fn insert_role(&self, role: Role) -> StoreResult<Role>;

    /// Replace a role's permission set if its version still matches
    fn update_role_permissions(
        &self,
        id: &RoleId,
        permissions: BTreeSet<String>,
        expected_version: u64,
    ) -> StoreResult<Role>;

    /// Delete a role unless an assignment active at `at` references it
    fn delete_role_if_unassigned(&self, id: &RoleId, at: SystemTime) -> StoreResult<DeletedRole>;

    /// Insert an assignment; fails if the role no longer exists
    fn insert_assignment(&self, assignment: RoleAssignment) -> StoreResult<RoleAssignment>;

    /// Remove an assignment and return it
    fn remove_assignment(&self, id: &AssignmentId) -> StoreResult<RoleAssignment>;

    /// All assignments of a member inside one tenant, active or not
    fn assignments_for_member(
        &self,
        tenant_id: &str,
        member_id: &str,
    ) -> StoreResult<Vec<RoleAssignment>>;

    /// All assignments referencing a role, active or not
    fn assignments_for_role(&self, role_id: &RoleId) -> StoreResult<Vec<RoleAssignment>>;

    /// Number of stored roles
    fn role_count(&self) -> StoreResult<usize>;
}
