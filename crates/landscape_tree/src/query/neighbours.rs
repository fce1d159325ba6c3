use crate::cell::CellId;
use crate::geometry::{CellCoverage, Sphere};
use crate::tree::SpatialTree;

/// Cell reached by a sphere, tagged `Full` when the sphere swallows it and
/// `Partial` otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighbourCell {
    pub cell: CellId,
    pub coverage: CellCoverage,
}

impl<const D: usize> SpatialTree<D> {
    /// Cells at `max_search_depth` (or leaves, when the tree is shallower) that
    /// the sphere reaches, skipping obstacles
    pub fn query_neighbour_cells(&self, sphere: &Sphere<D>, max_search_depth: u32) -> Vec<NeighbourCell> {
        let depth = max_search_depth.min(self.max_depth());
        let mut found = Vec::new();
        self.collect_neighbours(self.root(), sphere, depth, &mut found);
        found
    }

    fn collect_neighbours(&self, id: CellId, sphere: &Sphere<D>, depth: u32, found: &mut Vec<NeighbourCell>) {
        let cell = &self.cells[id.0];
        if !sphere.intersects_box(cell.effective_area()) || self.is_obstacle(id) {
            return;
        }
        if cell.depth() == depth {
            let coverage = if sphere.covers_box(cell.effective_area()) {
                CellCoverage::Full
            } else {
                CellCoverage::Partial
            };
            found.push(NeighbourCell { cell: id, coverage });
            return;
        }
        for &child in cell.children() {
            self.collect_neighbours(child, sphere, depth, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::geometry::{make_sphere, Aabb, Point, Shape};
    use crate::patch::Patch;

    #[test]
    fn test_cells_tagged_by_coverage() {
        let tree = SpatialTree::<2>::new(TreeConfig::new(16.0, 16, 1.0)).unwrap();
        let sphere = make_sphere(Point::new([8.0, 8.0]), 1.5);
        let cells = tree.query_neighbour_cells(&sphere, 4);

        let full: Vec<_> = cells
            .iter()
            .filter(|neighbour| neighbour.coverage == CellCoverage::Full)
            .collect();
        assert_eq!(full.len(), 4);
        // the 4x4 block of leaves around the centre
        assert_eq!(cells.len(), 16);
        assert!(cells.iter().all(|neighbour| tree.cell(neighbour.cell).is_leaf()));
    }

    #[test]
    fn test_depth_limit_and_obstacles() {
        let mut tree = SpatialTree::<2>::new(TreeConfig::new(16.0, 16, 1.0)).unwrap();
        let blocked = Aabb::new(Point::new([8.0, 8.0]), Point::new([12.0, 12.0]));
        tree.apply_patch(&Patch::obstacle(1, Shape::Box(blocked)));

        let sphere = make_sphere(Point::new([8.0, 8.0]), 3.0);
        let cells = tree.query_neighbour_cells(&sphere, 2);
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|neighbour| tree.cell(neighbour.cell).depth() == 2));
        assert!(cells.iter().all(|neighbour| neighbour.coverage == CellCoverage::Partial));
        assert!(cells.iter().all(|neighbour| !tree.is_obstacle(neighbour.cell)));
    }
}
