//! Radius-bounded queries over the tree.
//!
//! Every query walks from the root and splits cells three ways against the
//! query sphere: cells it misses are pruned, cells it swallows are collected
//! wholesale, and the rest are recursed into (or tested exactly at a leaf).

mod neighbours;
mod radius;
mod resources;

pub use neighbours::NeighbourCell;
pub use resources::ResourceHit;

use crate::cell::CellId;
use crate::geometry::Sphere;
use crate::tree::SpatialTree;
use serde::Serialize;

/// Work done by one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    pub cells_visited: usize,
    /// Subtrees skipped because the sphere misses them or they hold nothing
    pub cells_pruned: usize,
    /// Subtrees inside the sphere, collected without distance tests
    pub cells_fully_collected: usize,
    pub distance_tests: usize,
}

impl<const D: usize> SpatialTree<D> {
    /// Leaves whose effective area the sphere reaches
    pub(crate) fn touched_leaves(&self, sphere: &Sphere<D>) -> Vec<CellId> {
        let mut leaves = Vec::new();
        let mut pending = vec![self.root()];
        while let Some(id) = pending.pop() {
            let cell = &self.cells[id.0];
            if !sphere.intersects_box(cell.effective_area()) {
                continue;
            }
            if cell.is_leaf() {
                leaves.push(id);
            } else {
                pending.extend(cell.children().iter().copied());
            }
        }
        leaves
    }
}
