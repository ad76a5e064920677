/*!
 * Roles Module
 * Role definitions, assignments and tenant-scoped role administration
 */

pub mod manager;
pub mod types;

pub use manager::RoleManager;
pub use types::{is_valid_level, AssignmentRequest, NewRole, Role, RoleAssignment};
