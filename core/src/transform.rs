use crate::arc::ArcTable;
use crate::error::TileError;
use crate::point::Point;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The per-arc transform contract from spec.md §4.4: take a point sequence,
/// return a (usually shorter or smoother) point sequence. Endpoint pinning
/// and the other invariants are enforced by `TransformChain`, not by
/// individual transforms — a transform only has to do its geometric job.
pub trait ArcTransform: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, points: &[Point]) -> Vec<Point>;
}

/// Ramer-Douglas-Peucker simplification with a fixed distance tolerance.
pub struct RdpSimplify {
    pub tolerance: f64,
}

impl ArcTransform for RdpSimplify {
    fn name(&self) -> &'static str {
        "rdp"
    }

    fn apply(&self, points: &[Point]) -> Vec<Point> {
        if points.len() < 3 {
            return points.to_vec();
        }
        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[points.len() - 1] = true;
        rdp_mark(points, 0, points.len() - 1, self.tolerance, &mut keep);
        points.iter().zip(keep.iter()).filter(|(_, &k)| k).map(|(p, _)| *p).collect()
    }
}

fn rdp_mark(points: &[Point], start: usize, end: usize, tolerance: f64, keep: &mut [bool]) {
    if end <= start + 1 {
        return;
    }
    let a = points[start];
    let b = points[end];
    let mut farthest_idx = start;
    let mut farthest_dist = -1.0_f64;
    for i in start + 1..end {
        let d = perpendicular_distance(points[i], a, b);
        if d > farthest_dist {
            farthest_dist = d;
            farthest_idx = i;
        }
    }
    if farthest_dist > tolerance {
        keep[farthest_idx] = true;
        rdp_mark(points, start, farthest_idx, tolerance, keep);
        rdp_mark(points, farthest_idx, end, tolerance, keep);
    }
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
    }
    let cross = dy * (p.x - a.x) - dx * (p.y - a.y);
    cross.abs() / len2.sqrt()
}

/// Chaikin corner-cutting, endpoint-preserving variant: the first and last
/// points of the arc are left untouched across every iteration, only
/// interior corners get cut.
pub struct ChaikinSmooth {
    pub iterations: usize,
}

impl ArcTransform for ChaikinSmooth {
    fn name(&self) -> &'static str {
        "chaikin"
    }

    fn apply(&self, points: &[Point]) -> Vec<Point> {
        let mut current = points.to_vec();
        for _ in 0..self.iterations {
            current = chaikin_once(&current);
        }
        current
    }
}

fn chaikin_once(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(points[0]);
    for (p0, p1) in points.iter().copied().tuple_windows() {
        out.push(Point::new(0.75 * p0.x + 0.25 * p1.x, 0.75 * p0.y + 0.25 * p1.y));
        out.push(Point::new(0.25 * p0.x + 0.75 * p1.x, 0.25 * p0.y + 0.75 * p1.y));
    }
    out.push(points[points.len() - 1]);
    out
}

/// JSON-facing transform selector, mirroring `ShashlikConfig`'s use of a
/// plain serde struct for user-facing tuning knobs. Lets a config override
/// the default chain without recompiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ArcTransformSpec {
    Rdp { tolerance: f64 },
    Chaikin { iterations: usize },
}

impl ArcTransformSpec {
    pub fn build(&self) -> Box<dyn ArcTransform> {
        match self {
            ArcTransformSpec::Rdp { tolerance } => Box::new(RdpSimplify { tolerance: *tolerance }),
            ArcTransformSpec::Chaikin { iterations } => Box::new(ChaikinSmooth { iterations: *iterations }),
        }
    }
}

/// How far a transform's own reported endpoint may drift from the arc's
/// true endpoint before the driver treats it as a genuine pinning
/// violation rather than float noise it can snap away for free. Per
/// spec.md §4.4's "exact tie-break within a documented epsilon of zero".
const PINNING_EPSILON: f64 = 1e-9;

fn endpoint_drift(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Drives the configured transform chain over a single arc, enforcing the
/// invariants spec.md §4.4 calls fatal: endpoints pinned bitwise, at least
/// two points left, no duplicate consecutive points.
pub struct TransformChain {
    transforms: Vec<Box<dyn ArcTransform>>,
}

impl TransformChain {
    pub fn new(transforms: Vec<Box<dyn ArcTransform>>) -> Self {
        TransformChain { transforms }
    }

    pub fn default_chain(tolerance: f64, smoothing_iterations: usize) -> Self {
        TransformChain::new(vec![
            Box::new(RdpSimplify { tolerance }),
            Box::new(ChaikinSmooth { iterations: smoothing_iterations }),
        ])
    }

    pub fn from_specs(specs: &[ArcTransformSpec]) -> Self {
        TransformChain::new(specs.iter().map(ArcTransformSpec::build).collect())
    }

    /// Applies every transform in order to a single arc's points. A
    /// well-behaved transform (every one this crate ships) already leaves
    /// the endpoints alone, so the pinning check below never fires for
    /// them; it exists for a third-party `ArcTransform` that doesn't honor
    /// the contract. Drift within `PINNING_EPSILON` is snapped back to the
    /// exact original bitwise value (the float tie-break spec.md §4.4
    /// allows); drift past it is `TileError::PinningViolated` rather than
    /// a silent clobber, since forcing a badly-displaced endpoint back into
    /// place would tear the arc away from its neighbors at the junction.
    pub fn apply(&self, points: &[Point]) -> Result<Vec<Point>, TileError> {
        let original_first = points[0];
        let original_last = *points.last().expect("arc has at least one point");
        let mut current = points.to_vec();
        for transform in &self.transforms {
            let mut next = transform.apply(&current);
            if next.len() < 2 {
                return Err(TileError::RingCollapsed);
            }
            let last = next.len() - 1;
            if endpoint_drift(next[0], original_first) > PINNING_EPSILON || endpoint_drift(next[last], original_last) > PINNING_EPSILON {
                return Err(TileError::PinningViolated);
            }
            next[0] = original_first;
            next[last] = original_last;
            if next.iter().tuple_windows().any(|(a, b)| a == b) {
                return Err(TileError::DuplicateConsecutivePoints);
            }
            current = next;
        }
        Ok(current)
    }
}

/// Runs the chain over every arc in `table`, independently — arcs share no
/// mutable state, which is what lets C4 be driven per-arc across a worker
/// pool in the full pipeline (spec.md §4.4/§5). The arc's `left`/`right`
/// labels are untouched; only `points` changes.
pub fn transform_arc_table(table: &ArcTable, chain: &TransformChain) -> Result<ArcTable, TileError> {
    let mut out = ArcTable::default();
    out.arcs.reserve(table.arcs.len());
    for arc in &table.arcs {
        let points = chain.apply(&arc.points)?;
        out.arcs.push(crate::arc::Arc { left: arc.left, right: arc.right, points });
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rdp_collapses_collinear_points() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0001), Point::new(2.0, 0.0), Point::new(3.0, 0.0)];
        let simplified = RdpSimplify { tolerance: 0.01 }.apply(&pts);
        assert_eq!(simplified, vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)]);
    }

    #[test]
    fn rdp_keeps_points_outside_tolerance() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 5.0), Point::new(2.0, 0.0)];
        let simplified = RdpSimplify { tolerance: 0.01 }.apply(&pts);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn chaikin_preserves_endpoints() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)];
        let smoothed = ChaikinSmooth { iterations: 3 }.apply(&pts);
        assert_eq!(*smoothed.first().unwrap(), pts[0]);
        assert_eq!(*smoothed.last().unwrap(), *pts.last().unwrap());
        assert!(smoothed.len() > pts.len());
    }

    #[test]
    fn chain_pins_endpoints_after_every_stage() {
        let chain = TransformChain::default_chain(0.05, 2);
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.02),
            Point::new(2.0, 0.0),
            Point::new(3.0, 3.0),
        ];
        let out = chain.apply(&pts).unwrap();
        assert_eq!(*out.first().unwrap(), pts[0]);
        assert_eq!(*out.last().unwrap(), *pts.last().unwrap());
    }

    #[test]
    fn chain_rejects_collapse_to_single_point() {
        let chain = TransformChain::new(vec![Box::new(CollapseToOne)]);
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(matches!(chain.apply(&pts), Err(TileError::RingCollapsed)));
    }

    #[test]
    fn chain_rejects_a_transform_that_drags_an_endpoint_away() {
        let chain = TransformChain::new(vec![Box::new(DragFirstPoint)]);
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        assert!(matches!(chain.apply(&pts), Err(TileError::PinningViolated)));
    }

    #[test]
    fn chain_snaps_away_float_noise_within_epsilon() {
        let chain = TransformChain::new(vec![Box::new(NudgeFirstPointByEpsilon)]);
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
        let out = chain.apply(&pts).unwrap();
        assert_eq!(out[0], pts[0]);
    }

    struct CollapseToOne;
    impl ArcTransform for CollapseToOne {
        fn name(&self) -> &'static str {
            "collapse"
        }
        fn apply(&self, points: &[Point]) -> Vec<Point> {
            vec![points[0]]
        }
    }

    struct DragFirstPoint;
    impl ArcTransform for DragFirstPoint {
        fn name(&self) -> &'static str {
            "drag-first"
        }
        fn apply(&self, points: &[Point]) -> Vec<Point> {
            let mut out = points.to_vec();
            out[0] = Point::new(out[0].x + 10.0, out[0].y);
            out
        }
    }

    struct NudgeFirstPointByEpsilon;
    impl ArcTransform for NudgeFirstPointByEpsilon {
        fn name(&self) -> &'static str {
            "nudge-first"
        }
        fn apply(&self, points: &[Point]) -> Vec<Point> {
            let mut out = points.to_vec();
            out[0] = Point::new(out[0].x + PINNING_EPSILON / 10.0, out[0].y);
            out
        }
    }
}
