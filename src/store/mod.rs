/*!
 * Store Module
 * Role and assignment storage boundary with an in-memory implementation
 */

pub mod memory;
pub mod seed;
pub mod traits;

pub use memory::MemoryRoleStore;
pub use seed::{seed_system_roles, SystemRoleSpec, SYSTEM_ROLES};
pub use traits::{DeletedRole, RoleStore};
