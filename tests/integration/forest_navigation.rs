//! Region tree navigation over an 8x8 grid

use super::test_utils::{grid, BYTE_FIELD};
use regionmap::forest::{Domain, DomainPoint, PartitionKind};
use regionmap::types::{IndexSpaceID, LogicalRegion};
use regionmap::ForestError;
use std::collections::BTreeSet;

#[test]
fn test_partition_colors_and_kinds() {
    let g = grid();
    let root = g.region.index_space;
    assert_eq!(
        g.forest.get_index_space_partition_colors(root).unwrap(),
        BTreeSet::from([0, 1])
    );
    assert_eq!(g.forest.get_index_partition(root, 0).unwrap(), g.quadrants);
    assert!(g.forest.has_index_partition(root, 1).unwrap());
    assert!(!g.forest.has_index_partition(root, 2).unwrap());
    assert!(g.forest.is_index_partition_disjoint(g.quadrants).unwrap());
    assert!(!g.forest.is_index_partition_disjoint(g.bands).unwrap());
    assert_eq!(g.forest.get_index_partition_color(g.bands).unwrap(), 1);
    assert_eq!(
        g.forest.get_index_partition_color_space(g.quadrants).unwrap(),
        Domain::new([0, 0], [1, 1]).unwrap()
    );
}

#[test]
fn test_disjointness_never_changes() {
    let g = grid();
    let before = g.forest.is_index_partition_disjoint(g.quadrants).unwrap();

    // Further partitioning below and beside the partition leaves the recorded kind alone
    let quadrant = g.forest.get_index_subspace(g.quadrants, [0, 0]).unwrap();
    g.forest
        .create_index_partition(
            quadrant,
            0,
            PartitionKind::Aliased,
            Domain::range(1),
            vec![(0u32.into(), vec![Domain::new([0, 0], [3, 3]).unwrap()])],
        )
        .unwrap();
    g.forest
        .create_index_partition(
            g.region.index_space,
            2,
            PartitionKind::Aliased,
            Domain::range(1),
            vec![(0u32.into(), vec![Domain::new([0, 0], [7, 7]).unwrap()])],
        )
        .unwrap();
    for _ in 0..3 {
        g.forest.get_index_space_volume(quadrant).unwrap();
    }
    assert_eq!(
        g.forest.is_index_partition_disjoint(g.quadrants).unwrap(),
        before
    );
    assert!(before);
}

#[test]
fn test_overlapping_disjoint_partition_rejected() {
    let g = grid();
    let err = g
        .forest
        .create_index_partition(
            g.region.index_space,
            5,
            PartitionKind::Disjoint,
            Domain::range(2),
            vec![
                (0u32.into(), vec![Domain::new([0, 0], [4, 7]).unwrap()]),
                (1u32.into(), vec![Domain::new([4, 0], [7, 7]).unwrap()]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ForestError::InvalidPartition(_)));
    assert!(!g.forest.has_index_partition(g.region.index_space, 5).unwrap());
}

#[test]
fn test_subspace_round_trip() {
    let g = grid();
    let sub = g.forest.get_index_subspace(g.quadrants, [1, 0]).unwrap();
    assert_eq!(
        g.forest.get_index_space_color(sub).unwrap(),
        DomainPoint::from([1, 0])
    );
    assert_eq!(g.forest.get_parent_index_partition(sub).unwrap(), g.quadrants);
    assert_eq!(
        g.forest.get_parent_index_space(g.quadrants).unwrap(),
        g.region.index_space
    );
    assert!(g.forest.has_parent_index_partition(sub).unwrap());
    assert!(!g
        .forest
        .has_parent_index_partition(g.region.index_space)
        .unwrap());
    assert_eq!(
        g.forest.get_index_space_domain(sub).unwrap(),
        Domain::new([4, 0], [7, 3]).unwrap()
    );
    assert_eq!(g.forest.get_index_space_volume(sub).unwrap(), 16);
    assert!(g.forest.has_index_subspace(g.bands, 1u32).unwrap());
    assert!(!g.forest.has_index_subspace(g.bands, 2u32).unwrap());
}

#[test]
fn test_logical_navigation_mirrors_index_tree() {
    let g = grid();
    let partition = g.forest.get_logical_partition_by_color(g.region, 0).unwrap();
    assert_eq!(
        partition,
        g.forest.get_logical_partition(g.region, g.quadrants).unwrap()
    );
    assert_eq!(
        partition,
        g.forest
            .get_logical_partition_by_tree(g.quadrants, g.region.field_space, g.region.tree_id)
            .unwrap()
    );
    assert_eq!(g.forest.get_logical_partition_color(partition).unwrap(), 0);

    let sub = g
        .forest
        .get_logical_subregion_by_color(partition, [0, 1])
        .unwrap();
    assert_eq!(sub.tree_id, g.region.tree_id);
    assert_eq!(sub.field_space, g.region.field_space);
    assert_eq!(
        g.forest.get_logical_region_color(sub).unwrap(),
        DomainPoint::from([0, 1])
    );
    assert_eq!(
        g.forest
            .get_logical_subregion(partition, sub.index_space)
            .unwrap(),
        sub
    );
    assert_eq!(
        g.forest
            .get_logical_subregion_by_tree(sub.index_space, sub.field_space, sub.tree_id)
            .unwrap(),
        sub
    );
    assert!(g.forest.has_parent_logical_partition(sub).unwrap());
    assert_eq!(g.forest.get_parent_logical_partition(sub).unwrap(), partition);
    assert_eq!(g.forest.get_parent_logical_region(partition).unwrap(), g.region);
    assert!(g.forest.check_logical_region(&sub).is_ok());
}

#[test]
fn test_root_has_no_parent() {
    let g = grid();
    assert!(!g.forest.has_parent_logical_partition(g.region).unwrap());
    let err = g.forest.get_parent_logical_partition(g.region).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        g.forest.get_logical_region_color(g.region).unwrap(),
        DomainPoint::from([0, 0])
    );
}

#[test]
fn test_multiple_domains() {
    let g = grid();
    let split = g
        .forest
        .create_index_space(vec![Domain::range(4), Domain::new([10], [11]).unwrap()])
        .unwrap();
    assert!(g.forest.has_multiple_domains(split).unwrap());
    assert_eq!(
        g.forest.get_index_space_domain(split).unwrap_err(),
        ForestError::MultipleDomains(split)
    );
    assert_eq!(g.forest.get_index_space_domains(split).unwrap().len(), 2);
    assert_eq!(g.forest.get_index_space_volume(split).unwrap(), 6);
}

#[test]
fn test_unknown_identifiers_and_colors() {
    let g = grid();
    assert!(g
        .forest
        .get_index_space_volume(IndexSpaceID(9999))
        .unwrap_err()
        .is_not_found());
    assert!(g
        .forest
        .get_index_partition(g.region.index_space, 9)
        .unwrap_err()
        .is_not_found());
    assert!(g
        .forest
        .get_index_subspace(g.quadrants, [2, 2])
        .unwrap_err()
        .is_not_found());

    let partition = g.forest.get_logical_partition_by_color(g.region, 1).unwrap();
    assert!(g
        .forest
        .get_logical_subregion_by_color(partition, 3u32)
        .unwrap_err()
        .is_not_found());

    // An index space from another tree cannot pose as part of this one
    let stranger = LogicalRegion {
        index_space: g.forest.create_index_space(vec![Domain::range(4)]).unwrap(),
        ..g.region
    };
    assert!(matches!(
        g.forest.check_logical_region(&stranger),
        Err(ForestError::NotInTree(_))
    ));
}

#[test]
fn test_field_queries() {
    let g = grid();
    assert_eq!(
        g.forest.get_field_space_fields(g.region.field_space).unwrap(),
        vec![BYTE_FIELD]
    );
    assert_eq!(
        g.forest
            .get_field_size(g.region.field_space, BYTE_FIELD)
            .unwrap(),
        1
    );
}
