use crate::config::TopologyConfig;
use crate::error::{InputShapeError, TopologyError, Warning};
use crate::grid::LabelGrid;
use crate::seam::{check_all_seams, merge_global};
use crate::tile::run_tiles;
use geo::MultiPolygon;
use rustc_hash::FxHashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The whole engine's output: one `MultiPolygon` per label that survived
/// `min_blob_size` filtering, plus every non-fatal warning raised while
/// reconciling holes against shells anywhere in the grid.
pub struct TopologyResult {
    pub polygons: FxHashMap<i64, MultiPolygon<f64>>,
    pub warnings: Vec<Warning>,
}

/// Runs the full C1-C6 pipeline over `grid`. `cancel` is checked between
/// tile dispatches so a caller can request early termination.
pub fn run(grid: LabelGrid, config: TopologyConfig, cancel: Arc<AtomicBool>) -> Result<TopologyResult, TopologyError> {
    config.validate()?;
    if grid.width == 0 || grid.height == 0 {
        return Err(TopologyError::InputShape(InputShapeError::EmptyGrid));
    }
    if grid.crs.trim().is_empty() {
        return Err(TopologyError::InputShape(InputShapeError::MissingCrs));
    }

    let expected_labels = grid.distinct_labels();
    let grid = Arc::new(grid);
    let config = Arc::new(config);

    let outputs = run_tiles(Arc::clone(&grid), Arc::clone(&config), cancel).map_err(TopologyError::Tiles)?;

    if let Err(mut mismatches) = check_all_seams(&outputs) {
        return Err(TopologyError::Seam(mismatches.remove(0)));
    }

    let mut warnings = Vec::new();
    for output in &outputs {
        warnings.extend(output.polygons.warnings.iter().cloned());
    }

    let polygons = merge_global(&outputs);
    for label in expected_labels {
        if !polygons.contains_key(&label) {
            log::warn!("label {label} present in the input grid produced no polygon (likely filtered by min_blob_size)");
        }
    }

    Ok(TopologyResult { polygons, warnings })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Affine;

    #[test]
    fn empty_grid_is_rejected_before_any_tile_runs() {
        let grid = LabelGrid::new(0, 0, vec![], None, Affine::identity(), "EPSG:4326".into());
        let result = run(grid, TopologyConfig::default(), Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(TopologyError::InputShape(InputShapeError::EmptyGrid))));
    }

    #[test]
    fn missing_crs_is_rejected() {
        let grid = LabelGrid::new(2, 2, vec![1, 1, 1, 1], None, Affine::identity(), "".into());
        let result = run(grid, TopologyConfig::default(), Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(TopologyError::InputShape(InputShapeError::MissingCrs))));
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_the_grid() {
        let grid = LabelGrid::new(2, 2, vec![1, 1, 1, 1], None, Affine::identity(), "EPSG:4326".into());
        let config = TopologyConfig { tile_size: 0, ..TopologyConfig::default() };
        let result = run(grid, config, Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(TopologyError::Config(_))));
    }

    #[test]
    fn single_square_grid_produces_one_labeled_polygon() {
        let grid = LabelGrid::new(2, 2, vec![1, 1, 1, 1], None, Affine::identity(), "EPSG:4326".into());
        let result = run(grid, TopologyConfig::default(), Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(result.polygons.len(), 1);
        assert!(result.warnings.is_empty());
    }
}
