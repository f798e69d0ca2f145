use crate::arc::{ArcTable, RegionRing};
use crate::error::Warning;
use crate::point::Point;
use crate::region::RingKind;
use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use rustc_hash::FxHashMap;

/// A tile's fully reassembled output: one `MultiPolygon` per label, plus
/// any non-fatal warnings raised while reconciling holes against shells.
#[derive(Debug, Default)]
pub struct TilePolygons {
    pub by_label: FxHashMap<i64, MultiPolygon<f64>>,
    pub warnings: Vec<Warning>,
}

/// Rebuilds polygons for every label present in `rings`, using `table` for
/// arc geometry. Shells are unioned together; holes are subtracted from the
/// running union rather than matched to a specific parent shell by point-
/// in-polygon testing — `geo`'s boolean ops already resolve containment
/// exactly, the same way the teacher's `polygon_store.rs::merge_polygons`
/// leans on `BooleanOps` instead of hand-rolled nesting logic.
pub fn reassemble_tile(table: &ArcTable, rings: &[RegionRing]) -> TilePolygons {
    let mut by_label_rings: FxHashMap<i64, Vec<(RingKind, LineString<f64>)>> = FxHashMap::default();
    for ring in rings {
        let line = concatenate_ring(table, ring);
        by_label_rings.entry(ring.label).or_default().push((ring.kind, line));
    }

    let mut result = TilePolygons::default();
    for (label, entries) in by_label_rings {
        let mut acc = MultiPolygon::new(vec![]);
        let (shells, holes): (Vec<_>, Vec<_>) = entries.into_iter().partition(|(kind, _)| *kind == RingKind::Shell);
        for (_, shell) in shells {
            let candidate = MultiPolygon::new(vec![Polygon::new(shell, vec![])]);
            acc = acc.union(&candidate);
        }
        for (_, hole) in holes {
            let candidate = MultiPolygon::new(vec![Polygon::new(hole, vec![])]);
            let before = acc.unsigned_area();
            let carved = acc.difference(&candidate);
            let after = carved.unsigned_area();
            if (before - after).abs() < 1e-9 * before.max(1.0) {
                result.warnings.push(Warning::HoleDemoted { label });
                acc = acc.union(&candidate);
            } else {
                acc = carved;
            }
        }
        result.by_label.insert(label, acc);
    }
    result
}

fn concatenate_ring(table: &ArcTable, ring: &RegionRing) -> LineString<f64> {
    let mut points: Vec<Point> = Vec::new();
    for arc_ref in &ring.arcs {
        let arc = table.get(arc_ref.arc);
        let mut segment = arc.points.clone();
        if arc_ref.reversed {
            segment.reverse();
        }
        if points.is_empty() {
            points.extend(segment);
        } else {
            points.extend(segment.into_iter().skip(1));
        }
    }
    if points.first() != points.last() {
        points.push(points[0]);
    }
    LineString::new(points.into_iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}
