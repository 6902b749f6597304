//! Decision-scoped mapping contexts over a shared runtime

use super::test_utils::{TestMachine, BYTE_FIELD, FRAMEBUFFER, SYSTEM, WIDE_FIELD};
use regionmap::layout::LayoutConstraintSet;
use regionmap::machine::MemoryKind;
use regionmap::types::{LayoutConstraintID, TaskID};
use regionmap::{InstanceHandle, LayoutError, MappingError};
use std::collections::BTreeSet;

#[test]
fn test_pins_released_when_context_ends() {
    let machine = TestMachine::system(16);
    let region = machine.region(4);
    let layout = LayoutConstraintSet::new([BYTE_FIELD]);

    let handle = {
        let ctx = machine.runtime.begin_mapping(TaskID(1), "scoped");
        let placement = ctx
            .find_or_create_physical_instance(SYSTEM, &layout, region, true, 0)
            .unwrap();
        // A second pin on the same instance through a lookup
        let again = ctx
            .find_physical_instance(SYSTEM, &layout, region, true)
            .unwrap();
        assert_eq!(again.handle.use_count(), 2);
        assert_eq!(ctx.memory_stats(SYSTEM).unwrap().pinned, 1);
        placement.handle
    };

    assert_eq!(handle.use_count(), 0);
    assert!(handle.exists());
    assert_eq!(machine.runtime.cache().stats(SYSTEM).unwrap().pinned, 0);
}

#[test]
fn test_failed_placements_install_no_pin() {
    let machine = TestMachine::system(2);
    let layout = LayoutConstraintSet::new([BYTE_FIELD]);
    let ctx = machine.runtime.begin_mapping(TaskID(1), "scoped");

    let miss = ctx
        .find_physical_instance(SYSTEM, &layout, machine.region(1), true)
        .unwrap();
    let too_big = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(8), true, 0)
        .unwrap();
    assert!(!miss.ok());
    assert!(!too_big.ok());
    assert!(ctx.acquired_instances().is_empty());
}

#[test]
fn test_instance_attributes() {
    let machine = TestMachine::new(&[
        (SYSTEM, MemoryKind::System, 1024),
        (FRAMEBUFFER, MemoryKind::Framebuffer, 1024),
    ]);
    let region = machine.region(10);
    let ctx = machine.runtime.begin_mapping(TaskID(4), "attributes");

    let normal = ctx
        .create_physical_instance(
            FRAMEBUFFER,
            &LayoutConstraintSet::new([BYTE_FIELD, WIDE_FIELD]),
            region,
            false,
            3,
        )
        .unwrap()
        .handle;
    assert!(normal.is_normal());
    assert_eq!(normal.location(), FRAMEBUFFER);
    assert_eq!(normal.logical_region(), Some(region));
    assert_eq!(normal.footprint(), 90);
    assert_eq!(normal.gc_priority(), Some(3));
    assert_eq!(ctx.memory_kind(normal.location()).unwrap(), MemoryKind::Framebuffer);

    let mut wanted: BTreeSet<u32> = [BYTE_FIELD, WIDE_FIELD, 77].into_iter().collect();
    normal.prune_absent_fields(&mut wanted);
    assert_eq!(wanted, BTreeSet::from([BYTE_FIELD, WIDE_FIELD]));

    let reduction = ctx
        .create_physical_instance(
            SYSTEM,
            &LayoutConstraintSet::reduction(WIDE_FIELD, 1),
            region,
            false,
            0,
        )
        .unwrap()
        .handle;
    assert!(reduction.is_reduction());
    assert!(!reduction.has_field(BYTE_FIELD));
    assert_eq!(reduction.footprint(), 80);
}

#[test]
fn test_virtual_instance_is_distinct() {
    let machine = TestMachine::system(64);
    let ctx = machine.runtime.begin_mapping(TaskID(1), "virtual");
    let real = ctx
        .create_physical_instance(
            SYSTEM,
            &LayoutConstraintSet::new([BYTE_FIELD]),
            machine.region(1),
            false,
            0,
        )
        .unwrap()
        .handle;
    let virtual_instance = InstanceHandle::virtual_instance();

    assert_eq!(virtual_instance, InstanceHandle::default());
    assert_ne!(virtual_instance, real);
    assert!(!virtual_instance.exists());
    assert!(!virtual_instance.is_normal());
    assert!(!virtual_instance.is_reduction());
    assert!(virtual_instance
        .has_fields(&[BYTE_FIELD, WIDE_FIELD])
        .values()
        .all(|present| !present));
    assert!(matches!(
        ctx.acquire_instance(&virtual_instance),
        Err(MappingError::InvalidArgument(_))
    ));
}

#[test]
fn test_programming_errors_are_errors() {
    let machine = TestMachine::system(64);
    let region = machine.region(1);
    let ctx = machine.runtime.begin_mapping(TaskID(1), "errors");

    let missing = LayoutConstraintID(404);
    assert_eq!(
        ctx.find_or_create_physical_instance(SYSTEM, missing, region, false, 0)
            .unwrap_err(),
        MappingError::Layout(LayoutError::ConstraintNotFound(missing))
    );
    assert_eq!(
        ctx.find_layout(missing).unwrap_err(),
        MappingError::Layout(LayoutError::ConstraintNotFound(missing))
    );
    assert!(matches!(
        ctx.create_physical_instance(SYSTEM, &LayoutConstraintSet::new([]), region, false, 0),
        Err(MappingError::Layout(LayoutError::EmptyFieldSet))
    ));
    assert!(matches!(
        ctx.register_layout(LayoutConstraintSet::new([BYTE_FIELD, BYTE_FIELD])),
        Err(MappingError::Layout(LayoutError::DuplicateField(_)))
    ));

    let mut bad_region = region;
    bad_region.tree_id = regionmap::types::RegionTreeID(31337);
    assert!(matches!(
        ctx.find_physical_instance(SYSTEM, &LayoutConstraintSet::new([BYTE_FIELD]), bad_region, false),
        Err(MappingError::Forest(_))
    ));
}

#[test]
fn test_gc_priority_updates_through_context() {
    let machine = TestMachine::system(1);
    let layout = LayoutConstraintSet::new([BYTE_FIELD]);
    let ctx = machine.runtime.begin_mapping(TaskID(1), "priority");

    let keep = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 0)
        .unwrap()
        .handle;
    ctx.set_gc_priority(&keep, 50).unwrap();

    let request = ctx
        .create_physical_instance(SYSTEM, &layout, machine.region(1), false, 10)
        .unwrap();
    assert!(!request.ok());
    assert!(keep.exists());
}

#[test]
fn test_context_reports_its_decision() {
    let machine = TestMachine::system(8);
    let first = machine.runtime.begin_mapping(TaskID(5), "alpha");
    let second = machine.runtime.begin_mapping(TaskID(6), "beta");
    assert_eq!(first.mapper_name(), "alpha");
    assert_eq!(first.decision().task, TaskID(5));
    assert_ne!(first.decision(), second.decision());
    assert_eq!(first.memories().unwrap().len(), 1);
}
