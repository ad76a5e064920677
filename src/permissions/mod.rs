/*!
 * Permissions Module
 * Tenant-scoped capability checks with a shared (tenant, actor) cache
 *
 * ## Usage
 * ```ignore
 * use tenant_guard::permissions::Permission;
 *
 * let evaluator = guard.evaluator("dealer-42");
 * if evaluator.has("member-7", Permission::InvoiceApprove) {
 *     // Perform operation
 * }
 * ```
 */

pub mod cache;
pub mod evaluator;
pub mod types;

pub use cache::{CacheKey, CacheStats, PermissionCache};
pub use evaluator::PermissionEvaluator;
pub use types::{grant_matches, grants_cover, is_valid_grant, Permission, UnknownPermission, WILDCARD};
