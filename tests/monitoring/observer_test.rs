/*!
 * Observer Thread Tests
 */

use crate::support::harness;
use std::time::{Duration, Instant};
use tenant_guard::monitoring::{EventQuery, SecurityEventType};
use tenant_guard::Permission;

#[test]
fn test_observer_processes_signals() {
    let h = harness();
    let _observer = h.guard.start_observer().unwrap();

    h.guard.evaluator("dealer-1").has("ghost", Permission::VehicleRead);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = 0;
    while Instant::now() < deadline {
        seen = h
            .guard
            .monitor()
            .get_security_events(
                "dealer-1",
                &EventQuery::new().event_type(SecurityEventType::PermissionDenied),
            )
            .len();
        if seen == 1 {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(seen, 1);
    assert_eq!(h.guard.monitor().processed(), 1);
}

#[test]
fn test_observer_stops_when_guard_dropped() {
    let h = harness();
    let monitor = h.guard.monitor().clone();
    let observer = h.guard.start_observer().unwrap();

    drop(h);
    observer.join().unwrap();
    assert_eq!(monitor.processed(), 0);
}
