use crate::error::TileError;
use crate::grid::LabelGrid;
use crate::point::Point;
use rustc_hash::{FxHashMap, FxHashSet};

/// A rectangular, halo-extended view into a `LabelGrid`. Pixels outside the
/// window read as `None` regardless of what the underlying grid actually
/// contains there — the window's own edge is the truncation boundary C2
/// traces against, per spec.md §4.1/§4.6's tiling model.
pub struct PixelWindow<'a> {
    pub grid: &'a LabelGrid,
    pub col_start: i64,
    pub row_start: i64,
    pub col_end: i64,
    pub row_end: i64,
}

impl PixelWindow<'_> {
    fn label_at(&self, col: i64, row: i64) -> Option<i64> {
        if col < self.col_start || col >= self.col_end || row < self.row_start || row >= self.row_end {
            return None;
        }
        self.grid.label_at(col, row)
    }
}

/// What's on the far side of a boundary edge from its owning region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NeighborSide {
    None,
    Outside,
    Label(i64),
}

/// One raw boundary loop of a single connected component, traced at pixel
/// resolution. `neighbor_labels[i]` is the label on the far side of the
/// edge leaving `vertices[i]` towards `vertices[(i + 1) % len]` — `None`
/// means that edge borders nodata/out-of-window space. This region's own
/// label sits on the right of every edge by construction (see
/// `trace_component_boundary`), which is what lets C3 recognize the same
/// physical edge walked from two different owning regions.
#[derive(Debug, Clone)]
pub struct RingGeom {
    pub label: i64,
    pub vertices: Vec<Point>,
    pub neighbor_labels: Vec<Option<i64>>,
    pub kind: RingKind,
}

/// Whether a traced loop is an outer shell or an interior hole of its
/// component. Determined once, from the raw pixel-integer vertex loop,
/// before any affine transform or simplification touches the geometry —
/// the owner-always-on-the-right tracing convention makes a shell's raw
/// pixel-space signed area positive and a hole's negative, regardless of
/// which way the grid's affine transform happens to flip world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    Shell,
    Hole,
}

fn classify_ring(vertex_loop: &[((i64, i64), NeighborSide)]) -> RingKind {
    let n = vertex_loop.len();
    let mut sum = 0_i64;
    for i in 0..n {
        let (x0, y0) = vertex_loop[i].0;
        let (x1, y1) = vertex_loop[(i + 1) % n].0;
        sum += x0 * y1 - x1 * y0;
    }
    if sum > 0 {
        RingKind::Shell
    } else {
        RingKind::Hole
    }
}

/// Everything C2 hands to C3 for one tile.
#[derive(Debug, Clone, Default)]
pub struct ExtractedTile {
    pub rings: Vec<RingGeom>,
    /// Every vertex's originating pixel-grid coordinate, needed by C3 to
    /// tell whether a vertex sits on the tile's own (non-halo) window
    /// rectangle and must therefore be forced into a junction.
    pub vertex_pixel: FxHashMap<Point, (i64, i64)>,
}

const DIRS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Connected-component extraction (4-connectivity) plus boundary tracing
/// for every component in `window`, dropping components with fewer than
/// `min_blob_size` pixels before a boundary is ever traced for them.
pub fn extract_regions(window: &PixelWindow, min_blob_size: u32) -> Result<ExtractedTile, TileError> {
    let mut visited: FxHashSet<(i64, i64)> = FxHashSet::default();
    let mut tile = ExtractedTile::default();

    for row in window.row_start..window.row_end {
        for col in window.col_start..window.col_end {
            if visited.contains(&(col, row)) {
                continue;
            }
            let Some(label) = window.label_at(col, row) else {
                visited.insert((col, row));
                continue;
            };
            let pixels = flood_fill(window, col, row, label, &mut visited);
            if (pixels.len() as u32) < min_blob_size {
                continue;
            }
            let edges = boundary_edges(window, &pixels, label);
            let loops = trace_component_boundary(&edges)?;
            for vertex_loop in loops {
                let kind = classify_ring(&vertex_loop);
                let mut vertices = Vec::with_capacity(vertex_loop.len());
                let mut neighbor_labels = Vec::with_capacity(vertex_loop.len());
                for (pixel_vertex, neighbor) in vertex_loop {
                    let point = window.grid.vertex_to_point(pixel_vertex.0, pixel_vertex.1);
                    tile.vertex_pixel.insert(point, pixel_vertex);
                    vertices.push(point);
                    neighbor_labels.push(match neighbor {
                        NeighborSide::Outside => None,
                        NeighborSide::Label(other) => Some(other),
                        NeighborSide::None => None,
                    });
                }
                tile.rings.push(RingGeom { label, vertices, neighbor_labels, kind });
            }
        }
    }
    Ok(tile)
}

fn flood_fill(
    window: &PixelWindow,
    start_col: i64,
    start_row: i64,
    label: i64,
    visited: &mut FxHashSet<(i64, i64)>,
) -> Vec<(i64, i64)> {
    let mut stack = vec![(start_col, start_row)];
    let mut pixels = Vec::new();
    visited.insert((start_col, start_row));
    while let Some((col, row)) = stack.pop() {
        pixels.push((col, row));
        for (dx, dy) in DIRS {
            let next = (col + dx, row + dy);
            if visited.contains(&next) {
                continue;
            }
            if window.label_at(next.0, next.1) == Some(label) {
                visited.insert(next);
                stack.push(next);
            }
        }
    }
    pixels
}

/// Builds the directed boundary edge set for one component so that walking
/// any edge keeps the component's own label on the right, per the
/// right-hand convention derived for each of the four pixel sides.
fn boundary_edges(window: &PixelWindow, pixels: &[(i64, i64)], label: i64) -> FxHashMap<(i64, i64), [NeighborSide; 4]> {
    let mut edges: FxHashMap<(i64, i64), [NeighborSide; 4]> = FxHashMap::default();
    let mut set_edge = |vertex: (i64, i64), dir: u8, side: NeighborSide| {
        let entry = edges.entry(vertex).or_insert([NeighborSide::None; 4]);
        entry[dir as usize] = side;
    };
    for &(col, row) in pixels {
        let north = window.label_at(col, row - 1);
        let south = window.label_at(col, row + 1);
        let east = window.label_at(col + 1, row);
        let west = window.label_at(col - 1, row);
        if north != Some(label) {
            set_edge((col, row), 0, to_side(north));
        }
        if south != Some(label) {
            set_edge((col + 1, row + 1), 2, to_side(south));
        }
        if east != Some(label) {
            set_edge((col + 1, row), 1, to_side(east));
        }
        if west != Some(label) {
            set_edge((col, row + 1), 3, to_side(west));
        }
    }
    edges
}

fn to_side(label: Option<i64>) -> NeighborSide {
    match label {
        Some(l) => NeighborSide::Label(l),
        None => NeighborSide::Outside,
    }
}

/// Decomposes a component's boundary edge set into simple loops (the outer
/// shell plus any holes, plus extra loops where a pinch point splits the
/// component). Each directed edge is consumed by exactly one loop.
fn trace_component_boundary(
    edges: &FxHashMap<(i64, i64), [NeighborSide; 4]>,
) -> Result<Vec<Vec<((i64, i64), NeighborSide)>>, TileError> {
    let mut used: FxHashSet<((i64, i64), u8)> = FxHashSet::default();
    let mut starts: Vec<(i64, i64)> = edges.keys().copied().collect();
    starts.sort();
    let mut loops = Vec::new();
    for start_v in starts {
        for d in 0..4u8 {
            if edges[&start_v][d as usize] != NeighborSide::None && !used.contains(&(start_v, d)) {
                loops.push(trace_one_loop(start_v, d, edges, &mut used)?);
            }
        }
    }
    Ok(loops)
}

/// Walks one face of the boundary graph starting at `(start_v, start_dir)`,
/// always continuing at the edge that is clockwise-next after the reverse
/// of the edge just used. This is the standard rotation-system rule for
/// tracing simple faces out of a planar half-edge graph; at a pinch point
/// (vertex degree 4) it is exactly what keeps the two loops touching there
/// from being merged into one self-intersecting path.
fn trace_one_loop(
    start_v: (i64, i64),
    start_dir: u8,
    edges: &FxHashMap<(i64, i64), [NeighborSide; 4]>,
    used: &mut FxHashSet<((i64, i64), u8)>,
) -> Result<Vec<((i64, i64), NeighborSide)>, TileError> {
    let mut out = Vec::new();
    let mut v = start_v;
    let mut d = start_dir;
    loop {
        used.insert((v, d));
        let neighbor = edges[&v][d as usize];
        out.push((v, neighbor));
        let (dx, dy) = DIRS[d as usize];
        v = (v.0 + dx, v.1 + dy);
        let reverse = (d + 2) % 4;
        let next_dir = (1..=4u8).map(|k| (reverse + k) % 4).find(|&candidate| {
            edges.get(&v).map(|e| e[candidate as usize]) != Some(NeighborSide::None) && !used.contains(&(v, candidate))
        });
        match next_dir {
            Some(nd) => {
                if v == start_v && nd == start_dir {
                    return Ok(out);
                }
                d = nd;
            }
            None => {
                if v == start_v {
                    return Ok(out);
                }
                return Err(TileError::PinchRepairFailed);
            }
        }
    }
}
