/*!
 * Shared fixtures for integration tests
 */

#![allow(dead_code)]

use std::sync::Arc;
use tenant_guard::roles::{AssignmentRequest, RoleAssignment};
use tenant_guard::{AccessGuard, GuardConfig, MemoryRoleStore, RoleStore};

pub struct Harness {
    pub guard: AccessGuard,
    pub store: Arc<MemoryRoleStore>,
}

pub fn harness() -> Harness {
    harness_with(GuardConfig::default())
}

pub fn harness_with(config: GuardConfig) -> Harness {
    let store = Arc::new(MemoryRoleStore::new());
    let guard = AccessGuard::builder()
        .with_config(config)
        .with_store(store.clone())
        .build()
        .unwrap();
    Harness { guard, store }
}

impl Harness {
    /// Grant a platform role directly through the store
    pub fn assign(&self, tenant: &str, member: &str, role: &str) -> RoleAssignment {
        self.assign_request(tenant, member, role, |request| request)
    }

    pub fn assign_request<F>(
        &self,
        tenant: &str,
        member: &str,
        role: &str,
        customize: F,
    ) -> RoleAssignment
    where
        F: FnOnce(AssignmentRequest) -> AssignmentRequest,
    {
        let role = self.store.role_by_name(None, role).unwrap().unwrap();
        let request = customize(AssignmentRequest::new(member, role.id));
        self.store
            .insert_assignment(request.into_assignment(tenant.to_string()))
            .unwrap()
    }
}
