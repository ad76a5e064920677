/*!
 * Concurrency Tests
 * Cache consistency and role lifecycle races under parallel callers
 */

use crate::support::{harness, Harness};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tenant_guard::roles::{AssignmentRequest, NewRole};
use tenant_guard::{Permission, RoleError, RoleStore};

const READERS: usize = 4;
const ROUNDS: usize = 100;

fn grants(codes: &[&str]) -> BTreeSet<String> {
    codes.iter().map(|code| code.to_string()).collect()
}

fn with_owner() -> Harness {
    let h = harness();
    h.assign("dealer-1", "owner", "tenant_admin");
    h
}

#[test]
fn test_readers_see_whole_permission_sets() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let invoices = grants(&["invoice.read", "invoice.create"]);
    let customers = grants(&["customer.read", "customer.update"]);

    let role = manager
        .create_custom_role(
            "owner",
            NewRole::new("rotating", 30).with_permissions(["invoice.read", "invoice.create"]),
        )
        .unwrap();
    manager
        .assign_role("owner", AssignmentRequest::new("bob", role.id))
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicU64::new(0));
    let start = Arc::new(Barrier::new(READERS + 1));
    let mut handles = vec![];

    for _ in 0..READERS {
        let evaluator = h.guard.evaluator("dealer-1");
        let done = Arc::clone(&done);
        let reads = Arc::clone(&reads);
        let start = Arc::clone(&start);
        let (invoices, customers) = (invoices.clone(), customers.clone());

        handles.push(thread::spawn(move || {
            start.wait();
            while !done.load(Ordering::Acquire) {
                let seen = evaluator.get_user_permissions("bob").unwrap();
                assert!(
                    seen == invoices || seen == customers,
                    "partial permission set observed: {seen:?}"
                );
                reads.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }

    start.wait();
    for round in 0..ROUNDS {
        let next = if round % 2 == 0 { &customers } else { &invoices };
        manager
            .update_role_permissions(&role.id, "owner", next.clone())
            .unwrap();
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(reads.load(Ordering::Relaxed) > 0);
    assert_eq!(
        h.guard.evaluator("dealer-1").get_user_permissions("bob").unwrap(),
        invoices
    );
}

#[test]
fn test_revocation_visible_despite_concurrent_checks() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let role = manager
        .create_custom_role(
            "owner",
            NewRole::new("lot_attendant", 20).with_permissions(["vehicle.read"]),
        )
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];
    for _ in 0..READERS {
        let evaluator = h.guard.evaluator("dealer-1");
        let done = Arc::clone(&done);
        handles.push(thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                evaluator.has("bob", Permission::VehicleRead);
            }
        }));
    }

    let evaluator = h.guard.evaluator("dealer-1");
    for _ in 0..ROUNDS {
        let assignment = manager
            .assign_role("owner", AssignmentRequest::new("bob", role.id))
            .unwrap();
        assert!(evaluator.has("bob", Permission::VehicleRead));

        manager
            .revoke_assignment("owner", "bob", &assignment.id)
            .unwrap();
        assert!(!evaluator.has("bob", Permission::VehicleRead));
    }
    done.store(true, Ordering::Release);

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_delete_and_assign_are_serialized() {
    let h = with_owner();
    let manager = h.guard.role_manager("dealer-1");
    let (mut deleted, mut assigned) = (0, 0);

    for round in 0..ROUNDS {
        let role = manager
            .create_custom_role(
                "owner",
                NewRole::new(format!("contested_{round}"), 20).with_permissions(["vehicle.read"]),
            )
            .unwrap();
        // Built before the race so the window has opened when delete runs
        let request = AssignmentRequest::new(format!("member-{round}"), role.id);
        let start = Arc::new(Barrier::new(2));

        let deleter = {
            let manager = manager.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                manager.delete_custom_role(&role.id, "owner")
            })
        };
        let assigner = {
            let manager = manager.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                manager.assign_role("owner", request)
            })
        };
        let delete = deleter.join().unwrap();
        let assign = assigner.join().unwrap();

        match (delete, assign) {
            (Ok(()), Err(err)) => {
                assert_eq!(err, RoleError::NotFound);
                assert!(h.store.role(&role.id).unwrap().is_none());
                deleted += 1;
            }
            (Err(err), Ok(assignment)) => {
                assert_eq!(err, RoleError::InUse(1));
                assert!(h.store.role(&role.id).unwrap().is_some());
                assert_eq!(
                    h.store.assignments_for_role(&role.id).unwrap(),
                    vec![assignment]
                );
                assigned += 1;
            }
            outcome => panic!("delete and assign were not serialized: {outcome:?}"),
        }
    }

    assert_eq!(deleted + assigned, ROUNDS);
}
