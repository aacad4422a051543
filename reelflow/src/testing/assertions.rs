//! Assertions over task status snapshots and event streams.

use crate::core::{StageEvent, TaskStatus, Zone, ZoneStatus, PROGRESS_STEPS};

/// Asserts the status of every zone, in execution order.
pub fn assert_zone_statuses(status: &TaskStatus, expected: [ZoneStatus; 4]) {
    let actual: Vec<ZoneStatus> = status.zones.iter().map(|r| r.status).collect();
    assert_eq!(
        actual,
        expected.to_vec(),
        "Unexpected zone statuses for task {}",
        status.task_id
    );
}

/// Asserts that a task's events cover zones in order and never regress.
pub fn assert_events_ordered(events: &[StageEvent]) {
    let mut last_zone: Option<Zone> = None;
    let mut last_status = ZoneStatus::Pending;

    for event in events {
        match last_zone {
            Some(zone) if zone == event.zone => {
                assert!(
                    last_status.can_advance_to(event.status),
                    "Zone {} regressed from {} to {}",
                    zone,
                    last_status,
                    event.status
                );
            }
            Some(zone) => {
                assert!(
                    event.zone > zone,
                    "Zone {} reported after zone {}",
                    event.zone,
                    zone
                );
                assert!(
                    last_status.is_terminal(),
                    "Zone {} started before zone {} finished",
                    event.zone,
                    zone
                );
            }
            None => {}
        }
        last_zone = Some(event.zone);
        last_status = event.status;
    }
}

/// Asserts that observed progress values are valid steps and never decrease.
pub fn assert_progress_monotonic(observed: &[u8]) {
    for value in observed {
        assert!(PROGRESS_STEPS.contains(value), "Invalid progress value {value}");
    }
    for pair in observed.windows(2) {
        assert!(pair[0] <= pair[1], "Progress decreased: {observed:?}");
    }
}
