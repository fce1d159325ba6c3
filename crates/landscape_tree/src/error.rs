//! Error types for tree construction, occupant bookkeeping and checkpoints.
//!
//! Broken preconditions (malformed shapes, lookups outside the domain) are not
//! represented here; those panic at the call site.

use crate::cell::CellId;
use landscape_types::OccupantId;
use thiserror::Error;

/// Structural configuration problems, detected once before the tree is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Unsupported dimension {0}: only 2 and 3 dimensional trees are supported")]
    UnsupportedDimension(usize),

    #[error("{field} must be finite and positive, got {value}")]
    NonPositiveSize { field: &'static str, value: f64 },

    #[error("Cells per axis must be at least 2, got {0}")]
    TooFewCells(u32),

    #[error("Cells per axis must be a power of two, got {0}")]
    NonPowerOfTwo(u32),

    #[error(
        "Minimum cell size {min_cell_size} is inconsistent with root size {root_size} split into {cells_per_axis} cells per axis"
    )]
    InconsistentMinCellSize {
        root_size: f64,
        cells_per_axis: u32,
        min_cell_size: f64,
    },

    #[error("Tree would hold {cells} cells, more than the supported {limit}")]
    TooManyCells { cells: u128, limit: u128 },
}

/// Recoverable failures of occupant operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("Position {position:?} lies outside the terrain domain")]
    OutsideDomain { position: Vec<f64> },

    #[error("{cell} is an obstacle and cannot hold occupants")]
    ObstacleCell { cell: CellId },

    #[error("Occupant {0} is already in the tree")]
    DuplicateOccupant(OccupantId),

    #[error("Occupant {0} is not in the tree")]
    UnknownOccupant(OccupantId),
}

/// Problems restoring a tree from a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot configuration is invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot was taken from a {found}-dimensional tree, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Snapshot holds {found} cells, the configured tree has {expected}")]
    CellCountMismatch { expected: usize, found: usize },

    #[error("Snapshot cell {index} does not match the tree structure")]
    StructureMismatch { index: usize },

    #[error("Snapshot cell {index} carries leaf content but is not a leaf")]
    ContentOnBranch { index: usize },

    #[error("Snapshot cell {index} references moisture source {source_index}, but only {table_len} exist")]
    DanglingMoisture {
        index: usize,
        source_index: usize,
        table_len: usize,
    },

    #[error("Snapshot cell {index} holds occupant {occupant} whose position lies in another cell")]
    MisplacedOccupant { index: usize, occupant: OccupantId },

    #[error("Snapshot occupant could not be restored: {0}")]
    Occupant(#[from] TerrainError),
}

/// Failures encoding or decoding a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint could not be restored: {0}")]
    Snapshot(#[from] SnapshotError),
}
