use crate::point::Point;
use crate::region::{ExtractedTile, RingKind};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Either side of an arc: the background, or a concrete region label.
/// `Outside` sorts before every `Region`, which is what lets canonical arc
/// direction be decided purely from `left < right` without special-casing
/// the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegionLabel {
    Outside,
    Region(i64),
}

/// A shared boundary segment between exactly two regions (or a region and
/// the background), stored once regardless of how many rings reference it.
/// `points` runs from one junction vertex to another (or, for an arc that
/// is an entire closed ring with no junctions, from its canonical seed
/// vertex back to itself) in the direction that makes `left < right`.
#[derive(Debug, Clone)]
pub struct Arc {
    pub left: RegionLabel,
    pub right: RegionLabel,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArcId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct ArcTable {
    pub arcs: Vec<Arc>,
}

impl ArcTable {
    pub fn get(&self, id: ArcId) -> &Arc {
        &self.arcs[id.0]
    }
}

/// A reference to an arc as used by one particular ring: `reversed` says
/// whether this ring walks the arc's stored point order backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingArcRef {
    pub arc: ArcId,
    pub reversed: bool,
}

/// One raw traced ring re-expressed as a sequence of shared arcs.
#[derive(Debug, Clone)]
pub struct RegionRing {
    pub label: i64,
    pub kind: RingKind,
    pub arcs: Vec<RingArcRef>,
}

/// The non-halo rectangle a tile owns, in pixel-vertex coordinates. Any
/// traced vertex that lands exactly on this rectangle's perimeter is
/// forced into a junction so that neighboring tiles cut their own rings at
/// the identical vertex, per spec.md §4.6's seam-alignment requirement.
#[derive(Debug, Clone, Copy)]
pub struct CoreWindow {
    pub col_start: i64,
    pub row_start: i64,
    pub col_end: i64,
    pub row_end: i64,
}

impl CoreWindow {
    fn is_forced_junction(&self, pixel: (i64, i64)) -> bool {
        pixel.0 == self.col_start || pixel.0 == self.col_end || pixel.1 == self.row_start || pixel.1 == self.row_end
    }
}

/// Splits every ring in `tile` into shared arcs and returns the deduplicated
/// arc table alongside each ring re-expressed as arc references. This is
/// the "heart of the system" per spec.md §4.3: the same physical boundary,
/// traced once from each of the two regions it separates, canonicalizes to
/// the identical arc because C2 always put the tracing ring's own label on
/// the right — so one side's raw segment is exactly the reverse of the
/// other's, and `left < right` picks a single winner direction.
pub fn decompose_tile(tile: &ExtractedTile, core: &CoreWindow) -> (ArcTable, Vec<RegionRing>) {
    let mut table = ArcTable::default();
    let mut dedup: FxHashMap<(RegionLabel, RegionLabel, Point, Point), ArcId> = FxHashMap::default();
    let mut region_rings = Vec::with_capacity(tile.rings.len());

    for ring in &tile.rings {
        let n = ring.vertices.len();
        let cut_indices = cut_points(ring, tile, core);
        let mut arc_refs = Vec::new();

        if cut_indices.is_empty() {
            let seed = (0..n).min_by_key(|&i| ring.vertices[i]).unwrap_or(0);
            let mut points: Vec<Point> = (0..=n).map(|k| ring.vertices[(seed + k) % n]).collect();
            points.pop();
            points.push(ring.vertices[seed]);
            let neighbor = to_region_label(ring.neighbor_labels[seed]);
            let owner = RegionLabel::Region(ring.label);
            arc_refs.push(canonical_arc_ref(&mut table, &mut dedup, neighbor, owner, points));
        } else {
            let cuts: Vec<usize> = cut_indices.into_iter().collect();
            for k in 0..cuts.len() {
                let a = cuts[k];
                let b = cuts[(k + 1) % cuts.len()];
                let points = circular_span(&ring.vertices, a, b);
                let neighbor = to_region_label(ring.neighbor_labels[a]);
                let owner = RegionLabel::Region(ring.label);
                arc_refs.push(canonical_arc_ref(&mut table, &mut dedup, neighbor, owner, points));
            }
        }
        region_rings.push(RegionRing { label: ring.label, kind: ring.kind, arcs: arc_refs });
    }

    (table, region_rings)
}

fn to_region_label(label: Option<i64>) -> RegionLabel {
    match label {
        Some(l) => RegionLabel::Region(l),
        None => RegionLabel::Outside,
    }
}

fn cut_points(ring: &crate::region::RingGeom, tile: &ExtractedTile, core: &CoreWindow) -> BTreeSet<usize> {
    let n = ring.vertices.len();
    let mut cuts = BTreeSet::new();
    for i in 0..n {
        let prev = (i + n - 1) % n;
        if ring.neighbor_labels[i] != ring.neighbor_labels[prev] {
            cuts.insert(i);
            continue;
        }
        if let Some(&pixel) = tile.vertex_pixel.get(&ring.vertices[i]) {
            if core.is_forced_junction(pixel) {
                cuts.insert(i);
            }
        }
    }
    cuts
}

fn circular_span(vertices: &[Point], a: usize, b: usize) -> Vec<Point> {
    let n = vertices.len();
    let mut points = Vec::new();
    let mut i = a;
    loop {
        points.push(vertices[i]);
        if i == b {
            break;
        }
        i = (i + 1) % n;
    }
    points
}

fn canonical_arc_ref(
    table: &mut ArcTable,
    dedup: &mut FxHashMap<(RegionLabel, RegionLabel, Point, Point), ArcId>,
    left_candidate: RegionLabel,
    right_candidate: RegionLabel,
    points: Vec<Point>,
) -> RingArcRef {
    let (canonical_left, canonical_right, canonical_points, reversed) = if left_candidate < right_candidate {
        (left_candidate, right_candidate, points, false)
    } else {
        let mut rev = points;
        rev.reverse();
        (right_candidate, left_candidate, rev, true)
    };
    let key = (
        canonical_left,
        canonical_right,
        canonical_points[0],
        *canonical_points.last().unwrap(),
    );
    let arc_id = *dedup.entry(key).or_insert_with(|| {
        let id = ArcId(table.arcs.len());
        table.arcs.push(Arc { left: canonical_left, right: canonical_right, points: canonical_points });
        id
    });
    RingArcRef { arc: arc_id, reversed }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::{Affine, LabelGrid};
    use crate::region::{extract_regions, PixelWindow};

    fn two_pixel_grid() -> LabelGrid {
        LabelGrid::new(2, 1, vec![1, 2], Some(-1), Affine::identity(), "EPSG:4326".into())
    }

    #[test]
    fn shared_edge_deduplicates_to_one_arc() {
        let grid = two_pixel_grid();
        let window = PixelWindow { grid: &grid, col_start: 0, row_start: 0, col_end: 2, row_end: 1 };
        let tile = extract_regions(&window, 0).unwrap();
        let core = CoreWindow { col_start: 0, row_start: 0, col_end: 2, row_end: 1 };
        let (table, rings) = decompose_tile(&tile, &core);

        let ring1 = rings.iter().find(|r| r.label == 1).unwrap();
        let ring2 = rings.iter().find(|r| r.label == 2).unwrap();
        let shared1 = ring1.arcs.iter().find(|r| table.get(r.arc).left == RegionLabel::Region(1) || table.get(r.arc).right == RegionLabel::Region(1));
        let shared2 = ring2.arcs.iter().find(|r| table.get(r.arc).left == RegionLabel::Region(2) || table.get(r.arc).right == RegionLabel::Region(2));
        // The internal boundary between label 1 and label 2 must be the same arc id from both sides.
        let internal1 = ring1.arcs.iter().find(|r| {
            let a = table.get(r.arc);
            matches!((a.left, a.right), (RegionLabel::Region(1), RegionLabel::Region(2)))
        });
        let internal2 = ring2.arcs.iter().find(|r| {
            let a = table.get(r.arc);
            matches!((a.left, a.right), (RegionLabel::Region(1), RegionLabel::Region(2)))
        });
        assert!(internal1.is_some());
        assert!(internal2.is_some());
        assert_eq!(internal1.unwrap().arc, internal2.unwrap().arc);
        assert!(shared1.is_some());
        assert!(shared2.is_some());
    }

    #[test]
    fn isolated_square_becomes_single_closed_arc_against_outside() {
        let grid = LabelGrid::new(2, 2, vec![1, 1, 1, 1], Some(-1), Affine::identity(), "EPSG:4326".into());
        let window = PixelWindow { grid: &grid, col_start: 0, row_start: 0, col_end: 2, row_end: 2 };
        let tile = extract_regions(&window, 0).unwrap();
        let core = CoreWindow { col_start: 0, row_start: 0, col_end: 2, row_end: 2 };
        let (table, rings) = decompose_tile(&tile, &core);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].arcs.len(), 1);
        let arc = table.get(rings[0].arcs[0].arc);
        assert_eq!(arc.left, RegionLabel::Outside);
        assert_eq!(arc.right, RegionLabel::Region(1));
        assert_eq!(arc.points.first(), arc.points.last());
    }

    #[test]
    fn vertex_on_core_window_edge_forces_a_junction() {
        let grid = LabelGrid::new(4, 2, vec![1, 1, 1, 1, 1, 1, 1, 1], Some(-1), Affine::identity(), "EPSG:4326".into());
        let window = PixelWindow { grid: &grid, col_start: 0, row_start: 0, col_end: 4, row_end: 2 };
        let tile = extract_regions(&window, 0).unwrap();
        // Core window only covers the left half; its right edge at col=2 must force a cut
        // even though the whole component shares one neighbor label (Outside) throughout.
        let core = CoreWindow { col_start: 0, row_start: 0, col_end: 2, row_end: 2 };
        let (_table, rings) = decompose_tile(&tile, &core);
        assert_eq!(rings.len(), 1);
        assert!(rings[0].arcs.len() >= 2);
    }
}
