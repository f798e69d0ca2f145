use crate::error::SeamMismatch;
use crate::point::Point;
use crate::tile::{PixelRect, TileCoord, TileOutput};
use geo::{BooleanOps, MultiPolygon};
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Confirms two tiles agree, pixel for pixel, on the set of forced-junction
/// vertices along the edge they share. This is checked in pixel space
/// rather than world space so the comparison stays exact even when the
/// grid's affine transform includes rotation. Per spec.md §7 this should
/// be unreachable given forced junctioning — seeing a mismatch means the
/// tiler or C3 has a bug, not that the input data is unusual.
pub fn check_seam(a: &TileOutput, b: &TileOutput) -> Result<(), SeamMismatch> {
    let Some(edge) = shared_edge(a.core, b.core) else {
        return Ok(());
    };
    let a_set = junction_coords_on_edge(&a.vertex_pixel, edge);
    let b_set = junction_coords_on_edge(&b.vertex_pixel, edge);
    if a_set == b_set {
        Ok(())
    } else {
        Err(SeamMismatch { a_col: a.coord.col, a_row: a.coord.row, b_col: b.coord.col, b_row: b.coord.row })
    }
}

#[derive(Debug, Clone, Copy)]
struct SharedEdge {
    vertical: bool,
    fixed: i64,
    lo: i64,
    hi: i64,
}

fn shared_edge(a: PixelRect, b: PixelRect) -> Option<SharedEdge> {
    if a.col_end == b.col_start && a.row_start == b.row_start && a.row_end == b.row_end {
        return Some(SharedEdge { vertical: true, fixed: a.col_end, lo: a.row_start, hi: a.row_end });
    }
    if b.col_end == a.col_start && a.row_start == b.row_start && a.row_end == b.row_end {
        return Some(SharedEdge { vertical: true, fixed: a.col_start, lo: a.row_start, hi: a.row_end });
    }
    if a.row_end == b.row_start && a.col_start == b.col_start && a.col_end == b.col_end {
        return Some(SharedEdge { vertical: false, fixed: a.row_end, lo: a.col_start, hi: a.col_end });
    }
    if b.row_end == a.row_start && a.col_start == b.col_start && a.col_end == b.col_end {
        return Some(SharedEdge { vertical: false, fixed: a.row_start, lo: a.col_start, hi: a.col_end });
    }
    None
}

fn junction_coords_on_edge(vertex_pixel: &FxHashMap<Point, (i64, i64)>, edge: SharedEdge) -> BTreeSet<i64> {
    vertex_pixel
        .values()
        .filter(|&&(col, row)| {
            if edge.vertical {
                col == edge.fixed && row >= edge.lo && row <= edge.hi
            } else {
                row == edge.fixed && col >= edge.lo && col <= edge.hi
            }
        })
        .map(|&(col, row)| if edge.vertical { row } else { col })
        .collect()
}

struct TileEnvelope {
    index: usize,
    rect: PixelRect,
}

impl RTreeObject for TileEnvelope {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.rect.col_start, self.rect.row_start], [self.rect.col_end, self.rect.row_end])
    }
}

/// Checks every pair of tiles that are horizontally or vertically adjacent.
///
/// A plain double loop over tiles is O(n^2) in tile count, which stops
/// scaling once a raster is cut into thousands of tiles. Indexing each
/// tile's core rectangle in an `RTree`, the same spatial-index idiom the
/// teacher's `polygon_store.rs` uses for nearest-feature lookups, narrows
/// each tile's candidate neighbors to the handful whose envelopes actually
/// touch before the exact adjacency/seam check runs.
pub fn check_all_seams(outputs: &[TileOutput]) -> Result<(), Vec<SeamMismatch>> {
    let tree: RTree<TileEnvelope> =
        RTree::bulk_load(outputs.iter().enumerate().map(|(index, output)| TileEnvelope { index, rect: output.core }).collect());

    let mut mismatches = Vec::new();
    let mut checked: BTreeSet<(usize, usize)> = BTreeSet::new();
    for (i, output) in outputs.iter().enumerate() {
        let query = AABB::from_corners([output.core.col_start - 1, output.core.row_start - 1], [output.core.col_end + 1, output.core.row_end + 1]);
        for candidate in tree.locate_in_envelope_intersecting(&query) {
            let j = candidate.index;
            if j == i || !are_adjacent(output.coord, outputs[j].coord) {
                continue;
            }
            let key = if i < j { (i, j) } else { (j, i) };
            if !checked.insert(key) {
                continue;
            }
            if let Err(mismatch) = check_seam(output, &outputs[j]) {
                mismatches.push(mismatch);
            }
        }
    }
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(mismatches)
    }
}

fn are_adjacent(a: TileCoord, b: TileCoord) -> bool {
    let dc = (a.col as i64 - b.col as i64).abs();
    let dr = (a.row as i64 - b.row as i64).abs();
    (dc == 1 && dr == 0) || (dc == 0 && dr == 1)
}

/// Merges every tile's per-label polygons into one global `MultiPolygon`
/// per label, using the same divide-and-conquer pairwise union as the
/// teacher's `polygon_store.rs::merge_polygons` rather than a linear fold:
/// balancing the union tree keeps each individual union's operands from
/// growing as large as they would folding left to right over hundreds of
/// tiles. Halo overlap between adjacent tiles traces identical geometry
/// (same source pixels, same deterministic algorithm), so the union
/// collapses the duplication rather than producing artifacts.
pub fn merge_global(outputs: &[TileOutput]) -> FxHashMap<i64, MultiPolygon<f64>> {
    let mut by_label: FxHashMap<i64, Vec<MultiPolygon<f64>>> = FxHashMap::default();
    for output in outputs {
        for (label, poly) in &output.polygons.by_label {
            by_label.entry(*label).or_default().push(poly.clone());
        }
    }
    by_label.into_iter().map(|(label, polys)| (label, merge_many(polys))).collect()
}

fn merge_many(mut polygons: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    if polygons.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    while polygons.len() > 1 {
        let mut next = Vec::with_capacity(polygons.len().div_ceil(2));
        let mut it = polygons.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        polygons = next;
    }
    polygons.into_iter().next().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn adjacency_is_axis_aligned_and_unit_distance() {
        assert!(are_adjacent(TileCoord { col: 0, row: 0 }, TileCoord { col: 1, row: 0 }));
        assert!(are_adjacent(TileCoord { col: 2, row: 3 }, TileCoord { col: 2, row: 2 }));
        assert!(!are_adjacent(TileCoord { col: 0, row: 0 }, TileCoord { col: 1, row: 1 }));
        assert!(!are_adjacent(TileCoord { col: 0, row: 0 }, TileCoord { col: 0, row: 0 }));
    }

    #[test]
    fn shared_edge_detects_vertical_boundary() {
        let a = PixelRect { col_start: 0, row_start: 0, col_end: 4, row_end: 4 };
        let b = PixelRect { col_start: 4, row_start: 0, col_end: 8, row_end: 4 };
        let edge = shared_edge(a, b).unwrap();
        assert!(edge.vertical);
        assert_eq!(edge.fixed, 4);
    }

    #[test]
    fn merge_many_unions_an_odd_count_of_polygons() {
        use geo::{Coord, LineString, Polygon};
        let square = |x0: f64, y0: f64| {
            MultiPolygon::new(vec![Polygon::new(
                LineString::new(vec![
                    Coord { x: x0, y: y0 },
                    Coord { x: x0 + 1.0, y: y0 },
                    Coord { x: x0 + 1.0, y: y0 + 1.0 },
                    Coord { x: x0, y: y0 + 1.0 },
                    Coord { x: x0, y: y0 },
                ]),
                vec![],
            )])
        };
        let merged = merge_many(vec![square(0.0, 0.0), square(5.0, 0.0), square(10.0, 0.0)]);
        assert_eq!(merged.0.len(), 3);
    }
}
