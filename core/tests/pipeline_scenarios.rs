//! End-to-end scenarios from spec.md §8 that need a full `run()` to exercise:
//! a vertex shared by three labeled regions, a region pinched to one pixel
//! of width, and a grid wide enough to force multiple tiles through a real
//! seam reconciliation.

use geo::Area;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use topology_core::{run, Affine, LabelGrid, TopologyConfig};

fn no_cancel() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

/// The default transform chain (RDP + Chaikin, per spec.md §6) rounds
/// corners and isn't area-preserving, so every test below that checks an
/// exact pixel-count area disables it and exercises raw C1-C3/C5-C6
/// topology on its own.
fn untransformed(config: TopologyConfig) -> TopologyConfig {
    TopologyConfig { transforms: Some(vec![]), ..config }
}

/// Three regions and the outside all meet at the single interior vertex of
/// a 2x2 grid. Each label still has to come out as its own clean 1x1
/// polygon; nobody's boundary should bleed into a neighbor's.
#[test]
fn three_regions_meeting_at_one_vertex_stay_separate() {
    let grid = LabelGrid::new(2, 2, vec![1, 2, 3, -1], Some(-1), Affine::identity(), "EPSG:4326".into());
    let config = untransformed(TopologyConfig::default());
    let result = run(grid, config, no_cancel()).expect("pinch point at a shared vertex is not a topology error");

    assert_eq!(result.polygons.len(), 3);
    for label in [1, 2, 3] {
        let multi = &result.polygons[&label];
        assert_eq!(multi.unsigned_area(), 1.0, "label {label} should be exactly one pixel");
    }
}

/// A single label pinched to one pixel of width in its middle row. The
/// pinch makes the two background cells on either side touch the grid's
/// own border rather than forming an enclosed hole, so the label's total
/// area must equal every labeled pixel, however the boundary gets split
/// into rings at the pinch point.
#[test]
fn region_pinched_to_a_single_pixel_isthmus_keeps_its_full_area() {
    #[rustfmt::skip]
    let data = vec![
        1, 1, -1, 1, 1,
        1, 1,  1, 1, 1,
        1, 1, -1, 1, 1,
    ];
    let grid = LabelGrid::new(5, 3, data, Some(-1), Affine::identity(), "EPSG:4326".into());
    let config = untransformed(TopologyConfig::default());
    let result = run(grid, config, no_cancel()).expect("a one-pixel isthmus must not be a pinch-repair failure");

    assert_eq!(result.polygons.len(), 1);
    let area = result.polygons[&1].unsigned_area();
    assert_eq!(area, 13.0, "13 of the 15 cells carry label 1");
}

/// A uniform region spread across nine tiles. Forced junctioning at tile
/// boundaries plus seam reconciliation should merge it back into a single
/// polygon with no leftover seams and no area lost or doubled at the halo
/// overlaps.
#[test]
fn a_region_spanning_many_tiles_merges_back_into_one_polygon() {
    let grid = LabelGrid::new(6, 6, vec![1; 36], None, Affine::identity(), "EPSG:4326".into());
    let config = untransformed(TopologyConfig { tile_size: 2, halo_size: 1, worker_count: 4, ..TopologyConfig::default() });
    let result = run(grid, config, no_cancel()).expect("seam reconciliation across a 3x3 tile grid must succeed");

    assert_eq!(result.polygons.len(), 1);
    assert_eq!(result.polygons[&1].unsigned_area(), 36.0);
    assert!(result.warnings.is_empty());
}

/// Same uniform region, but with a hole stamped out of its middle. The hole
/// sits entirely inside one interior tile, so it should survive seam
/// reconciliation as an interior ring rather than getting demoted.
#[test]
fn a_hole_inside_one_tile_survives_seam_reconciliation() {
    #[rustfmt::skip]
    let data = vec![
        1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1,
        1, 1, -1, -1, 1, 1,
        1, 1, -1, -1, 1, 1,
        1, 1, 1, 1, 1, 1,
        1, 1, 1, 1, 1, 1,
    ];
    let grid = LabelGrid::new(6, 6, data, Some(-1), Affine::identity(), "EPSG:4326".into());
    let config = untransformed(TopologyConfig { tile_size: 2, halo_size: 1, worker_count: 4, ..TopologyConfig::default() });
    let result = run(grid, config, no_cancel()).expect("a hole entirely inside one tile must reconcile cleanly");

    assert_eq!(result.polygons.len(), 1);
    assert_eq!(result.polygons[&1].unsigned_area(), 32.0, "36 cells minus the 4-cell hole");
    assert!(result.warnings.is_empty(), "a hole that actually carves a shell should not raise HoleDemoted");
}
