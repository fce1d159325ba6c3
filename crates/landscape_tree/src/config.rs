//! Tree shape configuration.

use crate::error::ConfigError;
use crate::geometry::GEOMETRY_EPSILON;
use serde::{Deserialize, Serialize};

/// Upper bound on the number of cells a tree may allocate
pub const MAX_TREE_CELLS: u128 = 1 << 26;

/// Domain size and resolution of a tree.
///
/// The root is a cube of edge `root_size` anchored at the origin, split into
/// `cells_per_axis` leaves along every axis. The depth follows from the
/// number of halvings needed to reach `min_cell_size`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub root_size: f64,
    pub cells_per_axis: u32,
    pub min_cell_size: f64,
}

impl TreeConfig {
    pub fn new(root_size: f64, cells_per_axis: u32, min_cell_size: f64) -> Self {
        Self {
            root_size,
            cells_per_axis,
            min_cell_size,
        }
    }

    /// Derives the number of cells per axis from the two sizes
    pub fn from_min_cell_size(root_size: f64, min_cell_size: f64) -> Self {
        let cells = if min_cell_size > 0.0 {
            (root_size / min_cell_size).round().clamp(0.0, u32::MAX as f64) as u32
        } else {
            0
        };
        Self::new(root_size, cells, min_cell_size)
    }

    pub fn validate(&self, dimensions: usize) -> Result<(), ConfigError> {
        if !(2..=3).contains(&dimensions) {
            return Err(ConfigError::UnsupportedDimension(dimensions));
        }
        for (field, value) in [("root_size", self.root_size), ("min_cell_size", self.min_cell_size)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositiveSize { field, value });
            }
        }
        if self.cells_per_axis < 2 {
            return Err(ConfigError::TooFewCells(self.cells_per_axis));
        }
        if !self.cells_per_axis.is_power_of_two() {
            return Err(ConfigError::NonPowerOfTwo(self.cells_per_axis));
        }

        let implied = self.cells_per_axis as f64 * self.min_cell_size;
        if (implied - self.root_size).abs() > GEOMETRY_EPSILON * self.root_size.max(1.0) {
            return Err(ConfigError::InconsistentMinCellSize {
                root_size: self.root_size,
                cells_per_axis: self.cells_per_axis,
                min_cell_size: self.min_cell_size,
            });
        }

        let cells = total_cells(self.max_depth(), dimensions);
        if cells > MAX_TREE_CELLS {
            return Err(ConfigError::TooManyCells {
                cells,
                limit: MAX_TREE_CELLS,
            });
        }
        Ok(())
    }

    /// Depth of the leaves; the root is depth 0
    pub fn max_depth(&self) -> u32 {
        self.cells_per_axis.trailing_zeros()
    }

    /// Edge length of cells at `depth`
    pub fn cell_size(&self, depth: u32) -> f64 {
        self.root_size / (1u64 << depth) as f64
    }

    /// Edge lengths for every depth from the root down to the leaves
    pub fn cell_sizes(&self) -> Vec<f64> {
        (0..=self.max_depth()).map(|depth| self.cell_size(depth)).collect()
    }
}

/// Cells in a complete tree of the given depth
pub(crate) fn total_cells(max_depth: u32, dimensions: usize) -> u128 {
    (0..=max_depth)
        .map(|depth| 1u128 << (depth as usize * dimensions))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_from_sizes() {
        let config = TreeConfig::from_min_cell_size(16.0, 1.0);
        assert_eq!(config.cells_per_axis, 16);
        assert!(config.validate(2).is_ok());
        assert_eq!(config.max_depth(), 4);
        assert_eq!(config.cell_sizes(), vec![16.0, 8.0, 4.0, 2.0, 1.0]);
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        let config = TreeConfig::new(12.0, 12, 1.0);
        assert_eq!(config.validate(2), Err(ConfigError::NonPowerOfTwo(12)));
    }

    #[test]
    fn test_inconsistent_min_cell_size_rejected() {
        let config = TreeConfig::new(16.0, 8, 1.0);
        assert!(matches!(
            config.validate(3),
            Err(ConfigError::InconsistentMinCellSize { .. })
        ));
    }

    #[test]
    fn test_other_structural_errors() {
        assert_eq!(
            TreeConfig::new(16.0, 16, 1.0).validate(4),
            Err(ConfigError::UnsupportedDimension(4))
        );
        assert_eq!(
            TreeConfig::new(2.0, 1, 2.0).validate(2),
            Err(ConfigError::TooFewCells(1))
        );
        assert!(matches!(
            TreeConfig::new(-1.0, 2, 1.0).validate(2),
            Err(ConfigError::NonPositiveSize { field: "root_size", .. })
        ));
        assert!(matches!(
            TreeConfig::new(65536.0, 65536, 1.0).validate(3),
            Err(ConfigError::TooManyCells { .. })
        ));
    }

    #[test]
    fn test_total_cells() {
        assert_eq!(total_cells(1, 2), 5);
        assert_eq!(total_cells(2, 3), 1 + 8 + 64);
    }
}
