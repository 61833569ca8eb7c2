// CLASSIFICATION: COMMUNITY
// Filename: reboot_tracker.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

use std::sync::Arc;
use std::thread;

use rebootlog::register::store::MemoryStore;
use rebootlog::register::Slot;
use rebootlog::{ReasonCode, ReasonRegister, RebootTracker, TrackerError};

const OFFSET: u8 = 0x70;

fn tracker_on(store: &Arc<MemoryStore>) -> RebootTracker {
    let _ = env_logger::builder().is_test(true).try_init();
    RebootTracker::new(Box::new(Arc::clone(store)), OFFSET)
}

fn stored(store: &MemoryStore) -> ReasonRegister {
    let bytes = store.peek(OFFSET, 2);
    ReasonRegister::from_le_bytes([bytes[0], bytes[1]])
}

#[test]
fn init_recovers_factory_register() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker_on(&store);
    assert!(matches!(tracker.query_history(), Err(TrackerError::InvalidMagic(0))));

    let _tracker = RebootTracker::init(Box::new(Arc::clone(&store)), OFFSET);
    assert_eq!(stored(&store), ReasonRegister::INITIALIZED);
}

#[test]
fn reasons_survive_into_next_boot_history() {
    let store = Arc::new(MemoryStore::new());
    let boot1 = RebootTracker::init(Box::new(Arc::clone(&store)), OFFSET);
    boot1.flag_oom().unwrap();
    boot1.record_reason(ReasonCode::Watchdog).unwrap();

    let boot2 = RebootTracker::init(Box::new(Arc::clone(&store)), OFFSET);
    let history = boot2.query_history().unwrap();
    assert!(history.valid);
    assert_eq!(history.current, Slot::default());
    assert_eq!(
        history.history[0],
        Slot {
            code: ReasonCode::Watchdog,
            oom: true
        }
    );
}

#[test]
fn unchanged_value_is_not_rewritten() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker_on(&store);
    tracker.shift().unwrap();
    let writes = store.write_count();

    tracker.record_reason(ReasonCode::Reboot).unwrap();
    assert_eq!(store.write_count(), writes + 1);
    tracker.record_reason(ReasonCode::Reboot).unwrap();
    tracker.flag_oom().unwrap();
    tracker.flag_oom().unwrap();
    assert_eq!(store.write_count(), writes + 2);
}

#[test]
fn read_failure_aborts_without_writing() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker_on(&store);
    tracker.shift().unwrap();
    let before = stored(&store);
    let writes = store.write_count();

    store.fail_reads(true);
    assert!(matches!(
        tracker.record_reason(ReasonCode::Emergency),
        Err(TrackerError::StoreReadFailed(_))
    ));
    assert!(matches!(tracker.shift(), Err(TrackerError::StoreReadFailed(_))));
    store.fail_reads(false);

    assert_eq!(store.write_count(), writes);
    assert_eq!(stored(&store), before);
}

#[test]
fn write_failure_leaves_register_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker_on(&store);
    tracker.shift().unwrap();
    store.fail_writes(true);
    assert!(matches!(tracker.flag_oom(), Err(TrackerError::StoreWriteFailed(_))));
    store.fail_writes(false);
    assert!(!stored(&store).current().oom);
}

#[test]
fn init_survives_dead_store() {
    let store = Arc::new(MemoryStore::new());
    store.fail_writes(true);
    let tracker = RebootTracker::init(Box::new(Arc::clone(&store)), OFFSET);
    store.fail_writes(false);
    // Nothing cached: the next call goes to the device again.
    tracker.shift().unwrap();
    assert!(tracker.query_history().unwrap().valid);
}

#[test]
fn concurrent_updates_on_disjoint_bits_are_both_kept() {
    for _ in 0..64 {
        let store = Arc::new(MemoryStore::new());
        let tracker = Arc::new(tracker_on(&store));
        tracker.shift().unwrap();

        let a = Arc::clone(&tracker);
        let b = Arc::clone(&tracker);
        let t1 = thread::spawn(move || a.record_reason(ReasonCode::Emergency).unwrap());
        let t2 = thread::spawn(move || b.flag_oom().unwrap());
        t1.join().unwrap();
        t2.join().unwrap();

        assert_eq!(
            stored(&store).current(),
            Slot {
                code: ReasonCode::Emergency,
                oom: true
            }
        );
    }
}

#[test]
fn history_depth_is_three() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker_on(&store);
    tracker.shift().unwrap();
    for reason in [ReasonCode::Watchdog, ReasonCode::Reboot, ReasonCode::Emergency, ReasonCode::Reboot] {
        tracker.record_reason(reason).unwrap();
        tracker.shift().unwrap();
    }
    let codes: Vec<_> = tracker
        .query_history()
        .unwrap()
        .history
        .iter()
        .map(|s| s.code)
        .collect();
    assert_eq!(codes, vec![ReasonCode::Reboot, ReasonCode::Emergency, ReasonCode::Reboot]);
}
