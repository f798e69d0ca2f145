use crate::arc::{decompose_tile, ArcTable, CoreWindow, RegionRing};
use crate::config::TopologyConfig;
use crate::error::{TileError, TileFailure};
use crate::grid::LabelGrid;
use crate::reassemble::{reassemble_tile, TilePolygons};
use crate::region::{extract_regions, PixelWindow};
use crate::transform::{transform_arc_table, TransformChain};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use threadpool::ThreadPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub col: u32,
    pub row: u32,
}

/// A pixel-space rectangle, `col_end`/`row_end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub col_start: i64,
    pub row_start: i64,
    pub col_end: i64,
    pub row_end: i64,
}

/// `core` is the tile's own slice of the grid; `halo` extends it by
/// `halo_size` pixels in every direction (clamped to the grid), giving C2
/// enough context to trace boundaries that cross into the core from
/// outside it. Vertices on `core`'s own perimeter are forced junctions
/// (see `arc::CoreWindow`), which is what lets C6 stitch tiles back
/// together without re-tracing anything.
#[derive(Debug, Clone, Copy)]
pub struct TileDescriptor {
    pub coord: TileCoord,
    pub core: PixelRect,
    pub halo: PixelRect,
}

pub fn plan_tiles(grid: &LabelGrid, config: &TopologyConfig) -> Vec<TileDescriptor> {
    let tile_size = config.tile_size as i64;
    let halo = config.halo_size as i64;
    let tiles_x = (grid.width as i64 + tile_size - 1) / tile_size;
    let tiles_y = (grid.height as i64 + tile_size - 1) / tile_size;
    let mut tiles = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for row in 0..tiles_y {
        for col in 0..tiles_x {
            let core = PixelRect {
                col_start: col * tile_size,
                row_start: row * tile_size,
                col_end: ((col + 1) * tile_size).min(grid.width as i64),
                row_end: ((row + 1) * tile_size).min(grid.height as i64),
            };
            let halo_rect = PixelRect {
                col_start: (core.col_start - halo).max(0),
                row_start: (core.row_start - halo).max(0),
                col_end: (core.col_end + halo).min(grid.width as i64),
                row_end: (core.row_end + halo).min(grid.height as i64),
            };
            tiles.push(TileDescriptor {
                coord: TileCoord { col: col as u32, row: row as u32 },
                core,
                halo: halo_rect,
            });
        }
    }
    tiles
}

pub struct TileOutput {
    pub coord: TileCoord,
    pub core: PixelRect,
    pub table: ArcTable,
    pub rings: Vec<RegionRing>,
    pub polygons: TilePolygons,
    /// Carried through from C2 so C6 can check seam agreement in pixel
    /// space, which stays well-defined even under a rotated affine.
    pub vertex_pixel: rustc_hash::FxHashMap<crate::point::Point, (i64, i64)>,
}

fn process_tile(grid: &LabelGrid, config: &TopologyConfig, chain: &TransformChain, descriptor: &TileDescriptor) -> Result<TileOutput, TileError> {
    let window = PixelWindow {
        grid,
        col_start: descriptor.halo.col_start,
        row_start: descriptor.halo.row_start,
        col_end: descriptor.halo.col_end,
        row_end: descriptor.halo.row_end,
    };
    // min_blob_size is a CLI-side pre-cleaning concern (spec.md §12); the
    // core traces every component that reaches it, regardless of size.
    let extracted = extract_regions(&window, 0)?;
    let core = CoreWindow {
        col_start: descriptor.core.col_start,
        row_start: descriptor.core.row_start,
        col_end: descriptor.core.col_end,
        row_end: descriptor.core.row_end,
    };
    let (raw_table, rings) = decompose_tile(&extracted, &core);
    let table = transform_arc_table(&raw_table, chain)?;
    let polygons = reassemble_tile(&table, &rings);
    Ok(TileOutput {
        coord: descriptor.coord,
        core: descriptor.core,
        table,
        rings,
        polygons,
        vertex_pixel: extracted.vertex_pixel,
    })
}

/// Runs every tile through C2-C5 on a bounded worker pool, mirroring the
/// teacher's `tile_processor.rs`: a `threadpool::ThreadPool` feeding a
/// `sync_channel` whose bound applies backpressure so a slow consumer
/// can't let an unbounded backlog of finished tiles pile up in memory.
/// `cancel` is polled before each tile is dispatched so a caller (e.g. the
/// CLI handling Ctrl-C) can stop early without waiting for the whole grid.
pub fn run_tiles(
    grid: Arc<LabelGrid>,
    config: Arc<TopologyConfig>,
    cancel: Arc<AtomicBool>,
) -> Result<Vec<TileOutput>, Vec<TileFailure>> {
    let descriptors = plan_tiles(&grid, &config);
    let chain = Arc::new(config.transform_chain());
    let pool = ThreadPool::new(config.worker_count);
    let (tx, rx) = sync_channel(4 * config.worker_count.max(1));

    let mut dispatched = 0;
    for descriptor in descriptors {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let grid = Arc::clone(&grid);
        let config = Arc::clone(&config);
        let chain = Arc::clone(&chain);
        let tx = tx.clone();
        let cancel = Arc::clone(&cancel);
        dispatched += 1;
        pool.execute(move || {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let result = process_tile(&grid, &config, &chain, &descriptor);
            let _ = tx.send((descriptor.coord, result));
        });
    }
    drop(tx);

    let mut outputs = Vec::new();
    let mut failures = Vec::new();
    for _ in 0..dispatched {
        let Ok((coord, result)) = rx.recv() else {
            break;
        };
        match result {
            Ok(output) => outputs.push(output),
            Err(source) => failures.push(TileFailure { col: coord.col, row: coord.row, source }),
        }
    }
    pool.join();

    if failures.is_empty() {
        Ok(outputs)
    } else {
        Err(failures)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Affine;

    fn small_grid() -> LabelGrid {
        LabelGrid::new(4, 4, vec![1; 16], Some(-1), Affine::identity(), "EPSG:4326".into())
    }

    #[test]
    fn plan_tiles_covers_the_grid_without_gaps() {
        let grid = small_grid();
        let config = TopologyConfig { tile_size: 3, halo_size: 1, ..TopologyConfig::default() };
        let tiles = plan_tiles(&grid, &config);
        assert_eq!(tiles.len(), 4); // ceil(4/3)^2
        let last = tiles.last().unwrap();
        assert_eq!(last.core.col_end, 4);
        assert_eq!(last.core.row_end, 4);
    }

    #[test]
    fn halo_is_clamped_to_grid_bounds() {
        let grid = small_grid();
        let config = TopologyConfig { tile_size: 4, halo_size: 2, ..TopologyConfig::default() };
        let tiles = plan_tiles(&grid, &config);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].halo, PixelRect { col_start: 0, row_start: 0, col_end: 4, row_end: 4 });
    }

    #[test]
    fn single_tile_run_reassembles_the_whole_grid() {
        let grid = Arc::new(small_grid());
        let config = Arc::new(TopologyConfig { tile_size: 16, halo_size: 1, worker_count: 1, ..TopologyConfig::default() });
        let cancel = Arc::new(AtomicBool::new(false));
        let outputs = run_tiles(grid, config, cancel).unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].polygons.by_label.contains_key(&1));
    }
}
