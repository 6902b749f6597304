//! Eviction ordering, capacity accounting and reference safety

use super::test_utils::{TestMachine, BYTE_FIELD, SYSTEM};
use regionmap::layout::LayoutConstraintSet;
use regionmap::types::{TaskID, GC_FIRST_PRIORITY, GC_NEVER_PRIORITY};
use regionmap::PlacementFailure;

fn byte_layout() -> LayoutConstraintSet {
    LayoutConstraintSet::new([BYTE_FIELD])
}

#[test]
fn test_higher_priority_request_evicts_lower_priority_instances() {
    let machine = TestMachine::system(3);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let a = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 1)
        .unwrap();
    let b = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 5)
        .unwrap();
    assert!(a.ok() && b.ok());

    let big = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(3), false, 10)
        .unwrap();
    assert!(big.ok());
    assert!(big.created);
    assert!(!a.handle.exists());
    assert!(!b.handle.exists());
    assert_eq!(ctx.memory_stats(SYSTEM).unwrap().used, 3);
}

#[test]
fn test_eviction_follows_priority_not_creation_order() {
    let machine = TestMachine::system(4);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let c = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(2), false, 8)
        .unwrap();
    let b = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 5)
        .unwrap();
    let a = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 1)
        .unwrap();

    // Two units needed: A then B go, C survives
    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(2), false, 10)
        .unwrap();
    assert!(request.ok());
    assert!(!a.handle.exists());
    assert!(!b.handle.exists());
    assert!(c.handle.exists());

    // Still short after the cheaper victims: C goes too
    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(4), false, 20)
        .unwrap();
    assert!(request.ok());
    assert!(!c.handle.exists());
}

#[test]
fn test_least_recently_used_breaks_priority_ties() {
    let machine = TestMachine::system(2);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let older_region = machine.region(1);
    let older = ctx
        .create_physical_instance(SYSTEM, &layout, older_region, false, 0)
        .unwrap();
    let newer = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 0)
        .unwrap();

    // Touching the older instance makes it the most recently used
    let hit = ctx
        .find_physical_instance(SYSTEM, &layout, older_region, false)
        .unwrap();
    assert_eq!(hit.handle, older.handle);

    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 1)
        .unwrap();
    assert!(request.ok());
    assert!(older.handle.exists());
    assert!(!newer.handle.exists());
}

#[test]
fn test_pinned_instances_survive_any_priority() {
    let machine = TestMachine::system(2);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let pinned = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(2), true, GC_FIRST_PRIORITY)
        .unwrap();
    assert_eq!(pinned.handle.use_count(), 1);

    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, GC_NEVER_PRIORITY)
        .unwrap();
    assert_eq!(request.failure, Some(PlacementFailure::CapacityExhausted));
    assert!(request.handle.is_virtual());
    assert!(pinned.handle.exists());

    ctx.release_instance(&pinned.handle).unwrap();
    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 0)
        .unwrap();
    assert!(request.ok());
    assert!(!pinned.handle.exists());
}

#[test]
fn test_never_priority_is_never_evicted() {
    let machine = TestMachine::system(1);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let keep = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, GC_NEVER_PRIORITY)
        .unwrap();
    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, GC_NEVER_PRIORITY)
        .unwrap();
    assert!(!request.ok());
    assert!(keep.handle.exists());
    assert_eq!(machine.runtime.cache().collect_unreferenced(SYSTEM).unwrap(), 0);
}

#[test]
fn test_evicted_handles_report_gone_but_stay_usable() {
    let machine = TestMachine::system(1);
    let layout = byte_layout();
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let victim = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 0)
        .unwrap()
        .handle;
    let clone = victim.clone();
    ctx.create_physical_instance(SYSTEM, &layout, machine.region(1), false, 1)
        .unwrap();

    assert!(!clone.exists());
    assert!(clone.has_field(BYTE_FIELD));
    assert_eq!(clone.location(), SYSTEM);
    assert!(!ctx.acquire_instance(&clone).unwrap());
    assert!(ctx.acquired_instances().is_empty());
    assert!(!machine
        .runtime
        .cache()
        .contains(SYSTEM, victim.instance_id().unwrap())
        .unwrap());
}

#[test]
fn test_found_instances_are_not_revalidated() {
    let machine = TestMachine::system(64);
    let layout = LayoutConstraintSet::new([BYTE_FIELD]);
    let region = machine.region(8);
    let ctx = machine.runtime.begin_mapping(TaskID(1), "eviction");

    let first = ctx
        .find_or_create_physical_instance(SYSTEM, &layout, region, false, 0)
        .unwrap();
    let second = ctx
        .find_or_create_physical_instance(SYSTEM, &layout, region, false, 0)
        .unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.handle, second.handle);
    assert_eq!(ctx.memory_stats(SYSTEM).unwrap().instances, 1);
    assert_eq!(ctx.memory_stats(SYSTEM).unwrap().used, 8);
}
