/*!
 * Permission Types
 * Closed set of dealership capabilities and opaque grant matching
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wildcard grant covering every permission
pub const WILDCARD: &str = "*";

/// Known capability codes
///
/// Roles store grants as opaque strings; this enumeration is the typed view
/// callers use when the code is known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "vehicle.read")]
    VehicleRead,
    #[serde(rename = "vehicle.create")]
    VehicleCreate,
    #[serde(rename = "vehicle.update")]
    VehicleUpdate,
    #[serde(rename = "vehicle.delete")]
    VehicleDelete,
    #[serde(rename = "invoice.read")]
    InvoiceRead,
    #[serde(rename = "invoice.create")]
    InvoiceCreate,
    #[serde(rename = "invoice.approve")]
    InvoiceApprove,
    #[serde(rename = "customer.read")]
    CustomerRead,
    #[serde(rename = "customer.update")]
    CustomerUpdate,
    #[serde(rename = "report.view")]
    ReportView,
    #[serde(rename = "report.export")]
    ReportExport,
    #[serde(rename = "member.manage")]
    MemberManage,
    #[serde(rename = "role.manage")]
    RoleManage,
    #[serde(rename = "tenant.configure")]
    TenantConfigure,
    #[serde(rename = "audit.view")]
    AuditView,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::VehicleRead,
        Permission::VehicleCreate,
        Permission::VehicleUpdate,
        Permission::VehicleDelete,
        Permission::InvoiceRead,
        Permission::InvoiceCreate,
        Permission::InvoiceApprove,
        Permission::CustomerRead,
        Permission::CustomerUpdate,
        Permission::ReportView,
        Permission::ReportExport,
        Permission::MemberManage,
        Permission::RoleManage,
        Permission::TenantConfigure,
        Permission::AuditView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::VehicleRead => "vehicle.read",
            Permission::VehicleCreate => "vehicle.create",
            Permission::VehicleUpdate => "vehicle.update",
            Permission::VehicleDelete => "vehicle.delete",
            Permission::InvoiceRead => "invoice.read",
            Permission::InvoiceCreate => "invoice.create",
            Permission::InvoiceApprove => "invoice.approve",
            Permission::CustomerRead => "customer.read",
            Permission::CustomerUpdate => "customer.update",
            Permission::ReportView => "report.view",
            Permission::ReportExport => "report.export",
            Permission::MemberManage => "member.manage",
            Permission::RoleManage => "role.manage",
            Permission::TenantConfigure => "tenant.configure",
            Permission::AuditView => "audit.view",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a code is not one of the known capabilities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission code")]
pub struct UnknownPermission;

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or(UnknownPermission)
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Whether `grant` is a well-formed permission grant
///
/// Accepted shapes: `*`, `resource.*`, and dotted lowercase segments such as
/// `vehicle.read` or `invoice.line.update`.
pub fn is_valid_grant(grant: &str) -> bool {
    if grant == WILDCARD {
        return true;
    }

    let mut segments = grant.split('.').peekable();
    let mut count = 0usize;
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        if last && segment == WILDCARD && count > 0 {
            return true;
        }
        if !valid_segment(segment) {
            return false;
        }
        count += 1;
    }
    count >= 2
}

/// Whether a single grant covers the requested code
///
/// Both sides are compared as opaque strings. A grant ending in `.*` covers
/// every code under that prefix; nothing else is interpreted.
pub fn grant_matches(grant: &str, requested: &str) -> bool {
    if grant == requested || grant == WILDCARD {
        return true;
    }

    match grant.strip_suffix(WILDCARD) {
        Some(prefix) if prefix.ends_with('.') => {
            requested.len() > prefix.len() && requested.starts_with(prefix)
        }
        _ => false,
    }
}

/// Whether any grant in the set covers the requested code
pub fn grants_cover<'a, I>(grants: I, requested: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    grants.into_iter().any(|grant| grant_matches(grant, requested))
}
