//! Raster-to-vector shared-boundary topology engine: turns a categorical
//! label raster into a set of polygons, one per label, whose shared
//! boundaries are decomposed into deduplicated arcs so that adjacent
//! regions never drift apart under simplification or smoothing.

pub mod arc;
pub mod config;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod point;
pub mod reassemble;
pub mod region;
pub mod seam;
pub mod tile;
pub mod transform;

pub use config::TopologyConfig;
pub use error::{ConfigError, InputShapeError, SeamMismatch, TileError, TileFailure, TopologyError, Warning};
pub use grid::{Affine, LabelGrid};
pub use pipeline::{run, TopologyResult};
pub use point::Point;
