use crate::error::ConfigError;
use crate::transform::{ArcTransformSpec, TransformChain};
use serde::{Deserialize, Serialize};

/// User-facing tuning knobs, mirroring the flat `ShashlikConfig` shape: a
/// plain serde struct with sane defaults, validated once at startup before
/// any tile work begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyConfig {
    /// Tile edge length in pixels, per spec.md §5 (excluding halo).
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Halo width in pixels added around each tile's window before tracing.
    #[serde(default = "default_halo_size")]
    pub halo_size: u32,
    /// Worker thread count for the tile pool.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Minimum surviving component size in pixels. Carried through the
    /// config only — per spec.md §12's Open Question resolution this is a
    /// strictly pre-core cleaning pass the CLI runs on the raster before
    /// handing it to the engine; `core` never reads this field itself, so
    /// a blob that reaches C2 is traced regardless of size.
    #[serde(default)]
    pub min_blob_size: u32,
    /// The arc transform chain applied by C4. `None` uses the built-in
    /// RDP + Chaikin default; `Some` lets a config fully replace it,
    /// including disabling it with an empty list.
    #[serde(default)]
    pub transforms: Option<Vec<ArcTransformSpec>>,
    /// Ground sample distance of one pixel, in the grid's planar units.
    /// Drives the default RDP tolerance; per spec.md §6 there's no
    /// universal default for this one, since it's a property of the data,
    /// not a tuning knob — `1.0` (one planar unit per pixel) is used as the
    /// neutral fallback for a config that doesn't set it.
    #[serde(default = "default_meters_per_pixel")]
    pub meters_per_pixel: f64,
    /// Unitless multiplier on `meters_per_pixel` that gives the default
    /// RDP tolerance, per spec.md §6.
    #[serde(default = "default_simplification_pixel_window")]
    pub simplification_pixel_window: f64,
    #[serde(default = "default_smoothing_iterations")]
    pub smoothing_iterations: usize,
}

fn default_tile_size() -> u32 {
    256
}

fn default_halo_size() -> u32 {
    1
}

fn default_worker_count() -> usize {
    4
}

fn default_meters_per_pixel() -> f64 {
    1.0
}

fn default_simplification_pixel_window() -> f64 {
    2.0
}

fn default_smoothing_iterations() -> usize {
    5
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            tile_size: default_tile_size(),
            halo_size: default_halo_size(),
            worker_count: default_worker_count(),
            min_blob_size: 0,
            transforms: None,
            meters_per_pixel: default_meters_per_pixel(),
            simplification_pixel_window: default_simplification_pixel_window(),
            smoothing_iterations: default_smoothing_iterations(),
        }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::InvalidTileSize);
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        Ok(())
    }

    /// The RDP tolerance the default chain uses, per spec.md §6:
    /// `simplification_pixel_window × meters_per_pixel`.
    pub fn simplification_tolerance(&self) -> f64 {
        self.simplification_pixel_window * self.meters_per_pixel
    }

    /// Builds the arc transform chain this config describes: an explicit
    /// `transforms` list wins, otherwise the default RDP + Chaikin pair
    /// parameterized by `simplification_tolerance()` / `smoothing_iterations`.
    pub fn transform_chain(&self) -> TransformChain {
        match &self.transforms {
            Some(specs) => TransformChain::from_specs(specs),
            None => TransformChain::default_chain(self.simplification_tolerance(), self.smoothing_iterations),
        }
    }
}
