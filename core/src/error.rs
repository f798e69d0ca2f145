use thiserror::Error;

/// Configuration is rejected before any tile is touched.
#[derive(Debug, Clone, Copy, Error)]
pub enum ConfigError {
    #[error("tile size must be positive")]
    InvalidTileSize,
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,
}

/// The raster handed to the engine doesn't describe a usable input.
#[derive(Debug, Clone, Copy, Error)]
pub enum InputShapeError {
    #[error("label grid has no pixels")]
    EmptyGrid,
    #[error("label grid is missing a coordinate reference system")]
    MissingCrs,
}

/// A single tile failed somewhere between C2 and C5.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    #[error("arc transform violated endpoint pinning")]
    PinningViolated,
    #[error("ring collapsed to fewer than 3 distinct points after simplification")]
    RingCollapsed,
    #[error("a transform produced duplicate consecutive points")]
    DuplicateConsecutivePoints,
    #[error("component has non-simple topology that pinch repair could not resolve")]
    PinchRepairFailed,
}

/// Two neighboring tiles disagree about the vertices on their shared seam.
/// Per spec this should be unreachable given forced junctioning; seeing it
/// means the tiler or decomposer has a bug.
#[derive(Debug, Clone, Error)]
#[error("tiles ({a_col},{a_row}) and ({b_col},{b_row}) disagree on their shared seam vertex set")]
pub struct SeamMismatch {
    pub a_col: u32,
    pub a_row: u32,
    pub b_col: u32,
    pub b_row: u32,
}

/// A tile-scoped failure, tagged with the tile it happened in so the
/// orchestrator can report `(col, row)` per spec.md §4.1/§7.
#[derive(Debug, Clone, Error)]
#[error("tile ({col}, {row}) failed")]
pub struct TileFailure {
    pub col: u32,
    pub row: u32,
    #[source]
    pub source: TileError,
}

/// Top-level classified failure, one variant per spec.md §7 error kind.
/// The CLI maps this 1:1 onto the exit codes from spec.md §6.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("input shape error")]
    InputShape(#[from] InputShapeError),
    #[error("{} tile(s) failed", .0.len())]
    Tiles(Vec<TileFailure>),
    #[error(transparent)]
    Seam(#[from] SeamMismatch),
}

impl TopologyError {
    /// Exit code per spec.md §6: 0 success (not a variant here), 1 config,
    /// 2 I/O / input-shape, 3 tile failure (seam mismatches are reported
    /// as tile failures from the caller's point of view — both indicate
    /// the run produced no output).
    pub fn exit_code(&self) -> i32 {
        match self {
            TopologyError::Config(_) => 1,
            TopologyError::InputShape(_) => 2,
            TopologyError::Tiles(_) => 3,
            TopologyError::Seam(_) => 3,
        }
    }
}

/// A non-fatal condition surfaced alongside a successful result, per
/// spec.md §7's "Reassembly warning" kind. Reassembly resolves shell/hole
/// containment with `geo`'s boolean ops rather than point-in-polygon
/// nesting, so the only warning that can actually fire here is a hole that
/// turned out not to carve anything out of the unioned shells.
#[derive(Debug, Clone)]
pub enum Warning {
    HoleDemoted { label: i64 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::HoleDemoted { label } => {
                write!(f, "label {label}: hole demoted to shell, no enclosing shell found")
            }
        }
    }
}
