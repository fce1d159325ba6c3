//! The spatial tree facade: construction, navigation and read access to the
//! effective state of every cell.

use crate::cell::{CellId, CellKind, CellVariant, LeafContents, TerrainCell};
use crate::config::{total_cells, TreeConfig};
use crate::error::ConfigError;
use crate::geometry::{make_box, Aabb, CellCoverage, Point, TreePoint};
use crate::moisture::{MoistureSlot, MoistureSource, MoistureTable};
use landscape_types::{OccupantId, Priority, ResourceSpeciesId};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, info, trace};

/// Recursive partition of a D-dimensional cube into `2^D`-ary cells.
///
/// The structure is fixed at construction. Content (occupants, obstacles,
/// moisture, resources) changes through patches, occupant operations and
/// [`SpatialTree::advance_timestep`].
#[derive(Debug, Clone)]
pub struct SpatialTree<const D: usize> {
    pub(crate) config: TreeConfig,
    /// Arena in pre-order: every subtree occupies a contiguous index range
    pub(crate) cells: Vec<TerrainCell<D>>,
    /// Cells in a subtree rooted at each depth
    pub(crate) subtree_sizes: Vec<usize>,
    pub(crate) moisture: MoistureTable,
    pub(crate) occupant_index: HashMap<OccupantId, CellId>,
    /// Monotonic counter stamped on content so equal priorities keep the earliest patch
    pub(crate) sequence: u64,
}

/// Planar tree
pub type PlanarTree = SpatialTree<2>;
/// Volumetric tree
pub type VolumetricTree = SpatialTree<3>;

/// Average moisture state over the leaves of a subtree that have one
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoistureSummary {
    pub temperature: f64,
    pub relative_humidity: f64,
    /// Fraction of leaves with an effective moisture source
    pub covered_fraction: f64,
}

impl<const D: usize> SpatialTree<D> {
    /// Builds the complete tree described by `config`
    pub fn new(config: TreeConfig) -> Result<Self, ConfigError> {
        config.validate(D)?;
        let max_depth = config.max_depth();
        let capacity = total_cells(max_depth, D) as usize;
        let subtree_sizes = (0..=max_depth)
            .map(|depth| total_cells(max_depth - depth, D) as usize)
            .collect();

        let mut tree = Self {
            config,
            cells: Vec::with_capacity(capacity),
            subtree_sizes,
            moisture: MoistureTable::new(),
            occupant_index: HashMap::new(),
            sequence: 0,
        };
        let root_area = Aabb::cube(Point::splat(0.0), config.root_size);
        tree.build(None, TreePoint::new([0; D], 0), root_area);

        info!(
            "🌍 Built {}D spatial tree: root size {}, {} cells per axis, depth {}, {} cells",
            D,
            config.root_size,
            config.cells_per_axis,
            max_depth,
            tree.cells.len()
        );
        Ok(tree)
    }

    fn build(&mut self, parent: Option<CellId>, position: TreePoint<D>, area: Aabb<D>) -> CellId {
        let id = CellId(self.cells.len());
        let depth = position.depth();
        let variant = match parent {
            None => CellVariant::Root { children: Vec::new() },
            Some(parent) if depth == self.config.max_depth() => CellVariant::Leaf {
                parent,
                contents: LeafContents::default(),
            },
            Some(parent) => CellVariant::Branch {
                parent,
                children: Vec::new(),
            },
        };
        let is_leaf = matches!(variant, CellVariant::Leaf { .. });
        self.cells.push(TerrainCell::new(
            position,
            self.config.cell_size(depth),
            area,
            variant,
        ));

        if !is_leaf {
            let built: Vec<CellId> = (0..(1usize << D))
                .map(|index| self.build(Some(id), position.child(index), area.child(index)))
                .collect();
            match &mut self.cells[id.0].variant {
                CellVariant::Root { children } | CellVariant::Branch { children, .. } => *children = built,
                CellVariant::Leaf { .. } => unreachable!("leaf cells never receive children"),
            }
        }
        id
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> CellId {
        CellId(0)
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Panics if `id` does not belong to this tree
    pub fn cell(&self, id: CellId) -> &TerrainCell<D> {
        &self.cells[id.0]
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &TerrainCell<D>)> {
        self.cells.iter().enumerate().map(|(index, cell)| (CellId(index), cell))
    }

    pub fn leaves(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_leaf())
            .map(|(index, _)| CellId(index))
    }

    pub fn leaf_count(&self) -> usize {
        (self.config.cells_per_axis as usize).pow(D as u32)
    }

    /// Arena range covered by the subtree rooted at `id`
    pub(crate) fn subtree_range(&self, id: CellId) -> Range<usize> {
        let depth = self.cells[id.0].depth() as usize;
        id.0..id.0 + self.subtree_sizes[depth]
    }

    /// Leaves of the subtree rooted at `id`
    pub fn leaves_under(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.subtree_range(id)
            .filter(move |&index| self.cells[index].is_leaf())
            .map(CellId)
    }

    pub(crate) fn leaves_in_subtree(&self, id: CellId) -> usize {
        let levels_below = self.max_depth() - self.cells[id.0].depth();
        1usize << (levels_below as usize * D)
    }

    /// `id` followed by its ancestors up to the root
    pub fn lineage(&self, id: CellId) -> impl Iterator<Item = CellId> + '_ {
        std::iter::successors(Some(id), move |current| self.cells[current.0].parent())
    }

    /// Root box grown by the geometry epsilon so the domain's upper faces resolve
    pub fn domain(&self) -> Aabb<D> {
        make_box(Point::splat(0.0), Point::splat(self.config.root_size), true)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Leaf whose effective area holds `point`, or `None` outside the domain
    pub fn locate(&self, point: &Point<D>) -> Option<CellId> {
        if !point.is_finite() || !self.domain().contains_point(point) {
            return None;
        }
        let mut current = self.root();
        loop {
            let cell = &self.cells[current.0];
            match cell.children() {
                [] => return Some(current),
                children => current = children[cell.effective_area().child_index(point)],
            }
        }
    }

    /// Leaf whose effective area holds `point`.
    ///
    /// Panics when the point lies outside the root; use [`SpatialTree::locate`]
    /// for a checked lookup.
    pub fn get_cell(&self, point: &Point<D>) -> CellId {
        self.locate(point).unwrap_or_else(|| {
            panic!(
                "point {:?} lies outside the terrain domain [0, {}]",
                point.coords(),
                self.config.root_size
            )
        })
    }

    /// Cell at integer coordinates and depth, `None` when out of range
    pub fn cell_at(&self, position: &TreePoint<D>) -> Option<CellId> {
        let depth = position.depth();
        if depth > self.max_depth() || position.axis().iter().any(|&axis| axis >= (1u32 << depth)) {
            return None;
        }
        let mut current = self.root();
        for level in 0..depth {
            let shift = depth - 1 - level;
            let index = position
                .axis()
                .iter()
                .enumerate()
                .fold(0usize, |index, (axis, value)| index | ((((value >> shift) & 1) as usize) << axis));
            current = self.cells[current.0].children()[index];
        }
        Some(current)
    }

    /// Same-depth neighbour one step along `axis` (`step` is usually ±1)
    pub fn neighbour(&self, id: CellId, axis: usize, step: i64) -> Option<CellId> {
        if axis >= D {
            return None;
        }
        let moved = self.cells[id.0].position().offset(axis, step)?;
        self.cell_at(&moved)
    }

    // ========================================================================
    // Effective content
    // ========================================================================

    /// Highest obstacle priority recorded on `id` or an ancestor
    pub fn obstacle_priority(&self, id: CellId) -> Option<Priority> {
        self.lineage(id).filter_map(|cell| self.cells[cell.0].obstacle).max()
    }

    /// Fraction of this subtree's leaves that are obstacles
    pub fn obstacle_fraction(&self, id: CellId) -> f64 {
        if self.obstacle_priority(id).is_some() {
            return 1.0;
        }
        self.cells[id.0].obstacle_leaves as f64 / self.leaves_in_subtree(id) as f64
    }

    /// Obstacle summary of a subtree: `MajorityPartial` once more than half of
    /// its leaves are obstacles, `Full` when all of them are
    pub fn obstacle_coverage(&self, id: CellId) -> CellCoverage {
        let fraction = self.obstacle_fraction(id);
        if fraction >= 1.0 {
            CellCoverage::Full
        } else if fraction > 0.5 {
            CellCoverage::MajorityPartial
        } else if fraction > 0.0 {
            CellCoverage::Partial
        } else {
            CellCoverage::None
        }
    }

    /// A leaf is an obstacle when it or an ancestor carries an obstacle record;
    /// a branch when every leaf below it is one
    pub fn is_obstacle(&self, id: CellId) -> bool {
        self.obstacle_fraction(id) >= 1.0
    }

    /// Winning moisture slot along the lineage: highest priority, earliest on ties
    pub fn moisture_slot(&self, id: CellId) -> Option<MoistureSlot> {
        self.lineage(id)
            .filter_map(|cell| self.cells[cell.0].moisture)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.sequence.cmp(&a.sequence)))
    }

    pub fn moisture_priority(&self, id: CellId) -> Option<Priority> {
        self.moisture_slot(id).map(|slot| slot.priority)
    }

    /// Moisture source read by `id`, forwarding to the owning ancestor if needed
    pub fn moisture(&self, id: CellId) -> Option<&MoistureSource> {
        self.moisture_slot(id)
            .and_then(|slot| self.moisture.get(slot.source))
    }

    pub fn moisture_table(&self) -> &MoistureTable {
        &self.moisture
    }

    /// Drops moisture sources that no cell slot refers to and renumbers the
    /// remaining slots. Returns how many sources were dropped.
    pub(crate) fn prune_moisture_sources(&mut self) -> usize {
        let mut referenced = vec![false; self.moisture.len()];
        for slot in self.cells.iter().filter_map(|cell| cell.moisture) {
            if let Some(flag) = referenced.get_mut(slot.source.index()) {
                *flag = true;
            }
        }
        let dropped = referenced.iter().filter(|&&flag| !flag).count();
        if dropped == 0 {
            return 0;
        }

        let remap = self.moisture.retain_referenced(&referenced);
        for cell in &mut self.cells {
            cell.moisture = cell.moisture.and_then(|slot| {
                let source = remap.get(slot.source.index()).copied().flatten()?;
                Some(MoistureSlot { source, ..slot })
            });
        }
        trace!("🧹 Dropped {} unreferenced moisture sources", dropped);
        dropped
    }

    /// Resource capacity granted by moisture: density times measure where a
    /// source applies, otherwise the sum over the children
    pub fn moisture_capacity(&self, id: CellId) -> f64 {
        let cell = &self.cells[id.0];
        match self.moisture(id) {
            Some(source) => source.capacity_for(cell.effective_area().measure()),
            None => cell
                .children()
                .iter()
                .map(|&child| self.moisture_capacity(child))
                .sum(),
        }
    }

    /// Average temperature and humidity over the leaves below `id`
    pub fn moisture_summary(&self, id: CellId) -> Option<MoistureSummary> {
        let mut count = 0usize;
        let mut temperature = 0.0;
        let mut humidity = 0.0;
        let leaves = self.leaves_in_subtree(id);
        for leaf in self.leaves_under(id) {
            if let Some(source) = self.moisture(leaf) {
                count += 1;
                temperature += source.temperature;
                humidity += source.relative_humidity;
            }
        }
        (count > 0).then(|| MoistureSummary {
            temperature: temperature / count as f64,
            relative_humidity: humidity / count as f64,
            covered_fraction: count as f64 / leaves as f64,
        })
    }

    /// Highest resource priority for `species` recorded on `id` or an ancestor
    pub fn resource_priority(&self, id: CellId, species: ResourceSpeciesId) -> Option<Priority> {
        self.lineage(id)
            .filter_map(|cell| self.cells[cell.0].own_resource_priority(species))
            .max()
    }

    pub fn kind(&self, id: CellId) -> CellKind {
        self.cells[id.0].kind()
    }

    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    // ========================================================================
    // Timestep
    // ========================================================================

    /// Mutation phase of one simulated timestep: every moisture source is
    /// refreshed once and every resource regrows once
    pub fn advance_timestep(&mut self, timestep: u32) {
        self.moisture.update_all(timestep);
        let regrown = self.regrow_resources();
        debug!(
            "⏱️ Timestep {}: refreshed {} moisture sources, regrew {:.3} biomass",
            timestep,
            self.moisture.len(),
            regrown
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GEOMETRY_EPSILON;

    fn planar() -> PlanarTree {
        SpatialTree::new(TreeConfig::new(16.0, 16, 1.0)).unwrap()
    }

    #[test]
    fn test_depth_and_leaf_count() {
        let tree = planar();
        assert_eq!(tree.max_depth(), 4);
        assert_eq!(tree.leaves().count(), 256);
        assert_eq!(tree.leaf_count(), 256);
        assert_eq!(tree.cell_count(), 1 + 4 + 16 + 64 + 256);
    }

    #[test]
    fn test_get_cell_on_leaf_center() {
        let tree = planar();
        let leaf = tree.get_cell(&Point::new([3.5, 5.5]));
        let cell = tree.cell(leaf);
        assert_eq!(cell.kind(), CellKind::Leaf);
        assert_eq!(cell.position(), &TreePoint::new([3, 5], 4));
        assert_eq!(tree.cell_at(&TreePoint::new([3, 5], 4)), Some(leaf));
    }

    #[test]
    fn test_cell_size_halves_per_depth() {
        let tree = SpatialTree::<3>::new(TreeConfig::new(8.0, 8, 1.0)).unwrap();
        for (_, cell) in tree.cells() {
            let expected = 8.0 / f64::from(1u32 << cell.depth());
            assert_eq!(cell.size(), expected);
            for axis in 0..3 {
                assert!((cell.effective_area().extent(axis) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_children_measure_sums_to_parent() {
        let tree = SpatialTree::<3>::new(TreeConfig::new(4.0, 4, 1.0)).unwrap();
        for (_, cell) in tree.cells() {
            if cell.is_leaf() {
                continue;
            }
            assert_eq!(cell.children().len(), 8);
            let total: f64 = cell
                .children()
                .iter()
                .map(|&child| tree.cell(child).effective_area().measure())
                .sum();
            assert!((total - cell.effective_area().measure()).abs() < GEOMETRY_EPSILON);
        }
    }

    #[test]
    fn test_upper_boundary_resolves_to_last_leaf() {
        let tree = planar();
        let corner = tree.get_cell(&Point::new([16.0, 16.0]));
        assert_eq!(tree.cell(corner).position(), &TreePoint::new([15, 15], 4));
        assert!(tree.locate(&Point::new([16.1, 0.0])).is_none());
        assert!(tree.locate(&Point::new([f64::NAN, 0.0])).is_none());
    }

    #[test]
    #[should_panic(expected = "outside the terrain domain")]
    fn test_get_cell_outside_domain_panics() {
        planar().get_cell(&Point::new([-1.0, 3.0]));
    }

    #[test]
    fn test_lineage_and_subtree_ranges() {
        let tree = planar();
        let leaf = tree.get_cell(&Point::new([10.2, 1.7]));
        let lineage: Vec<CellId> = tree.lineage(leaf).collect();
        assert_eq!(lineage.len(), 5);
        assert_eq!(*lineage.last().unwrap(), tree.root());
        for window in lineage.windows(2) {
            assert!(tree.subtree_range(window[1]).contains(&window[0].index()));
        }
        assert_eq!(tree.leaves_under(lineage[2]).count(), 16);
    }

    #[test]
    fn test_neighbours() {
        let tree = planar();
        let leaf = tree.cell_at(&TreePoint::new([0, 7], 4)).unwrap();
        assert_eq!(tree.neighbour(leaf, 0, -1), None);
        let right = tree.neighbour(leaf, 0, 1).unwrap();
        assert_eq!(tree.cell(right).position(), &TreePoint::new([1, 7], 4));
        let up = tree.neighbour(leaf, 1, 1).unwrap();
        assert_eq!(tree.cell(up).position(), &TreePoint::new([0, 8], 4));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(SpatialTree::<2>::new(TreeConfig::new(10.0, 10, 1.0)).is_err());
        assert!(SpatialTree::<4>::new(TreeConfig::new(4.0, 4, 1.0)).is_err());
    }
}
