/*!
 * System Role Seeding
 * Platform roles shipped with the product, inserted once at startup
 */

use super::traits::RoleStore;
use crate::core::errors::StoreResult;
use crate::roles::types::Role;
use tracing::info;

/// Definition of a platform role
#[derive(Debug, Clone, Copy)]
pub struct SystemRoleSpec {
    pub name: &'static str,
    pub display_name: &'static str,
    pub level: i32,
    pub permissions: &'static [&'static str],
}

/// Platform roles, most senior first
pub const SYSTEM_ROLES: &[SystemRoleSpec] = &[
    SystemRoleSpec {
        name: "super_admin",
        display_name: "Super Administrator",
        level: 100,
        permissions: &["*"],
    },
    SystemRoleSpec {
        name: "admin",
        display_name: "Platform Administrator",
        level: 90,
        permissions: &["*"],
    },
    SystemRoleSpec {
        name: "tenant_admin",
        display_name: "Dealership Administrator",
        level: 80,
        permissions: &[
            "vehicle.*",
            "invoice.*",
            "customer.*",
            "report.*",
            "member.manage",
            "role.manage",
            "tenant.configure",
            "audit.view",
        ],
    },
    SystemRoleSpec {
        name: "sales_manager",
        display_name: "Sales Manager",
        level: 60,
        permissions: &[
            "vehicle.*",
            "invoice.read",
            "invoice.create",
            "invoice.approve",
            "customer.*",
            "report.view",
            "report.export",
        ],
    },
    SystemRoleSpec {
        name: "finance",
        display_name: "Finance",
        level: 50,
        permissions: &["invoice.*", "customer.read", "report.view", "report.export"],
    },
    SystemRoleSpec {
        name: "sales",
        display_name: "Sales Consultant",
        level: 30,
        permissions: &[
            "vehicle.read",
            "vehicle.update",
            "invoice.read",
            "invoice.create",
            "customer.read",
            "customer.update",
        ],
    },
    SystemRoleSpec {
        name: "mechanic",
        display_name: "Service Technician",
        level: 20,
        permissions: &["vehicle.read", "vehicle.update"],
    },
    SystemRoleSpec {
        name: "viewer",
        display_name: "Viewer",
        level: 10,
        permissions: &["vehicle.read", "report.view"],
    },
];

/// Insert every missing platform role; returns how many were inserted
pub fn seed_system_roles(store: &dyn RoleStore) -> StoreResult<usize> {
    let mut inserted = 0;
    for spec in SYSTEM_ROLES {
        if store.role_by_name(None, spec.name)?.is_some() {
            continue;
        }
        store.insert_role(Role::system(
            spec.name,
            spec.display_name,
            spec.level,
            spec.permissions.iter().copied(),
        ))?;
        inserted += 1;
    }

    if inserted > 0 {
        info!(inserted, "Seeded system roles");
    }
    Ok(inserted)
}
