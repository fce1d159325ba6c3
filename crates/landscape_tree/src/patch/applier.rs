use super::{Patch, PatchContent, ResourcePatch};
use crate::cell::CellId;
use crate::geometry::{cell_coverage, CellCoverage, Shape};
use crate::habitat::{HabitatDomain, HabitatSlot};
use crate::moisture::{MoistureId, MoistureSlot};
use crate::tree::SpatialTree;
use landscape_types::Priority;
use tracing::{debug, trace, warn};

/// Patch content with its moisture source already placed in the table
enum Placed<'a> {
    Obstacle,
    Moisture(MoistureId),
    Resource(&'a ResourcePatch),
    Habitat(&'a HabitatDomain),
}

fn outranks(priority: Priority, current: Option<Priority>) -> bool {
    current.map_or(true, |current| priority > current)
}

impl<const D: usize> SpatialTree<D> {
    /// Applies one patch to the whole tree.
    ///
    /// A cell only takes the content when the patch priority is strictly
    /// greater than the priority currently in effect there for the same
    /// content type, so of two equal-priority patches the first one applied
    /// wins. Returns whether any cell changed.
    pub fn apply_patch(&mut self, patch: &Patch<D>) -> bool {
        let placed = match &patch.content {
            PatchContent::Obstacle => Placed::Obstacle,
            PatchContent::Moisture(source) => Placed::Moisture(self.moisture.push(source.clone())),
            PatchContent::Resource(resource) => Placed::Resource(resource),
            PatchContent::HabitatDomain(domain) => Placed::Habitat(domain),
        };

        let applied = self.apply_at(self.root(), patch.priority, &patch.shape, &placed);
        if matches!(placed, Placed::Moisture(_)) {
            self.prune_moisture_sources();
        }
        if applied {
            debug!("🧩 Applied {} patch with priority {}", patch.kind(), patch.priority);
        } else {
            warn!(
                "⚠️ {} patch with priority {} did not change any cell",
                patch.kind(),
                patch.priority
            );
        }
        applied
    }

    fn apply_at(&mut self, id: CellId, priority: Priority, shape: &Shape<D>, placed: &Placed<'_>) -> bool {
        let area = *self.cells[id.0].effective_area();
        let (coverage, percent) = cell_coverage(shape, &area);
        match coverage {
            CellCoverage::None => false,
            CellCoverage::Full => self.apply_full(id, priority, placed),
            CellCoverage::Partial | CellCoverage::MajorityPartial => {
                if self.cells[id.0].is_leaf() {
                    return self.apply_partial_leaf(id, priority, coverage, percent, placed);
                }
                let children = self.cells[id.0].children().to_vec();
                children
                    .into_iter()
                    .fold(false, |applied, child| self.apply_at(child, priority, shape, placed) | applied)
            }
        }
    }

    /// Full coverage: the record goes on this cell alone and its descendants
    /// read it through the lineage
    fn apply_full(&mut self, id: CellId, priority: Priority, placed: &Placed<'_>) -> bool {
        match placed {
            Placed::Obstacle => self.place_obstacle(id, priority),
            Placed::Moisture(source) => self.place_moisture(id, priority, *source),
            Placed::Habitat(domain) => self.place_habitat(id, priority, domain),
            Placed::Resource(resource) => {
                if self.is_obstacle(id) || !outranks(priority, self.resource_priority(id, resource.species)) {
                    trace!("{} keeps its {} resource", id, resource.species);
                    return false;
                }
                self.cells[id.0].resource_priorities.insert(resource.species, priority);
                let leaves: Vec<CellId> = self.leaves_under(id).collect();
                for leaf in leaves {
                    if self.is_obstacle(leaf) {
                        continue;
                    }
                    let shadowed = self
                        .lineage(leaf)
                        .take_while(|&cell| cell != id)
                        .filter_map(|cell| self.cells[cell.0].own_resource_priority(resource.species))
                        .any(|existing| existing >= priority);
                    if shadowed {
                        continue;
                    }
                    let measure = self.cells[leaf.0].effective_area().measure();
                    let source = resource.source_with_capacity(resource.base_capacity(measure));
                    self.set_leaf_resource(leaf, source);
                }
                trace!("{} takes resource {} at priority {}", id, resource.species, priority);
                true
            }
        }
    }

    /// Partial coverage at the deepest level. Obstacles, moisture and habitat
    /// need a majority of the leaf; resources scale with the covered share.
    fn apply_partial_leaf(
        &mut self,
        leaf: CellId,
        priority: Priority,
        coverage: CellCoverage,
        percent: f64,
        placed: &Placed<'_>,
    ) -> bool {
        match placed {
            Placed::Obstacle | Placed::Moisture(_) | Placed::Habitat(_) if coverage != CellCoverage::MajorityPartial => {
                trace!("{} covered {:.3}, below majority", leaf, percent);
                false
            }
            Placed::Obstacle => self.place_obstacle(leaf, priority),
            Placed::Moisture(source) => self.place_moisture(leaf, priority, *source),
            Placed::Habitat(domain) => self.place_habitat(leaf, priority, domain),
            Placed::Resource(resource) => {
                if self.is_obstacle(leaf) || !outranks(priority, self.resource_priority(leaf, resource.species)) {
                    return false;
                }
                let measure = self.cells[leaf.0].effective_area().measure();
                let capacity = percent * resource.base_capacity(measure);
                self.cells[leaf.0].resource_priorities.insert(resource.species, priority);
                self.set_leaf_resource(leaf, resource.source_with_capacity(capacity));
                trace!("{} takes {:.3} of resource {} capacity", leaf, percent, resource.species);
                true
            }
        }
    }

    fn place_obstacle(&mut self, id: CellId, priority: Priority) -> bool {
        let current = self.obstacle_priority(id);
        if !outranks(priority, current) {
            return false;
        }
        self.cells[id.0].obstacle = Some(priority);
        if current.is_none() {
            let leaves = self.leaves_in_subtree(id);
            let newly_blocked = leaves - self.cells[id.0].obstacle_leaves;
            self.cells[id.0].obstacle_leaves = leaves;
            let mut ancestor = self.cells[id.0].parent();
            while let Some(cell) = ancestor {
                self.cells[cell.0].obstacle_leaves += newly_blocked;
                ancestor = self.cells[cell.0].parent();
            }
            let blocked: Vec<CellId> = self.leaves_under(id).collect();
            for leaf in blocked {
                self.clear_leaf_resources(leaf);
            }
        }
        trace!("{} becomes an obstacle at priority {}", id, priority);
        true
    }

    fn place_moisture(&mut self, id: CellId, priority: Priority, source: MoistureId) -> bool {
        if !outranks(priority, self.moisture_priority(id)) {
            return false;
        }
        let sequence = self.next_sequence();
        self.cells[id.0].moisture = Some(MoistureSlot {
            source,
            priority,
            sequence,
        });
        // lower slots below can never win again
        for index in self.subtree_range(id).skip(1) {
            let cell = &mut self.cells[index];
            if cell.moisture.map_or(false, |slot| slot.priority < priority) {
                cell.moisture = None;
            }
        }
        trace!("{} reads moisture source {} at priority {}", id, source.index(), priority);
        true
    }

    fn place_habitat(&mut self, id: CellId, priority: Priority, domain: &HabitatDomain) -> bool {
        if !outranks(priority, self.habitat_priority(id)) {
            return false;
        }
        let sequence = self.next_sequence();
        self.cells[id.0].habitat = Some(HabitatSlot {
            priority,
            sequence,
            domain: domain.clone(),
        });
        for index in self.subtree_range(id).skip(1) {
            let cell = &mut self.cells[index];
            if cell.habitat.as_ref().map_or(false, |slot| slot.priority < priority) {
                cell.habitat = None;
            }
        }
        trace!("{} takes a habitat domain at priority {}", id, priority);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::geometry::{make_sphere, Aabb, Point, TreePoint};
    use crate::moisture::MoistureSource;
    use landscape_types::ResourceSpeciesId;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const GRASS: ResourceSpeciesId = ResourceSpeciesId(7);

    fn planar() -> SpatialTree<2> {
        SpatialTree::new(TreeConfig::new(16.0, 16, 1.0)).unwrap()
    }

    fn boxed(min: [f64; 2], max: [f64; 2]) -> Shape<2> {
        Shape::Box(Aabb::new(Point::new(min), Point::new(max)))
    }

    fn leaf(tree: &SpatialTree<2>, x: u32, y: u32) -> CellId {
        tree.cell_at(&TreePoint::new([x, y], 4)).unwrap()
    }

    #[test]
    fn test_obstacle_on_exact_leaf_area() {
        let mut tree = planar();
        let target = leaf(&tree, 6, 9);
        let shape = Shape::Box(*tree.cell(target).effective_area());
        assert!(tree.apply_patch(&Patch::obstacle(1, shape)));

        assert!(tree.is_obstacle(target));
        let parent = tree.cell(target).parent().unwrap();
        for &sibling in tree.cell(parent).children() {
            if sibling != target {
                assert!(!tree.is_obstacle(sibling));
            }
        }
        assert_eq!(tree.leaves().filter(|&id| tree.is_obstacle(id)).count(), 1);
        assert!((tree.obstacle_fraction(parent) - 0.25).abs() < 1e-12);
        assert!((tree.obstacle_fraction(tree.root()) - 1.0 / 256.0).abs() < 1e-12);
        assert_eq!(tree.obstacle_coverage(parent), CellCoverage::Partial);
        assert_eq!(tree.obstacle_coverage(target), CellCoverage::Full);
    }

    #[test]
    fn test_obstacle_summary_of_branch() {
        let mut tree = planar();
        let target = leaf(&tree, 2, 2);
        let parent = tree.cell(target).parent().unwrap();
        assert_eq!(tree.obstacle_coverage(parent), CellCoverage::None);

        let siblings: Vec<CellId> = tree.cell(parent).children().to_vec();
        for (placed, &sibling) in siblings.iter().enumerate() {
            tree.apply_patch(&Patch::obstacle(1, Shape::Box(*tree.cell(sibling).effective_area())));
            let expected = match placed {
                0 | 1 => CellCoverage::Partial,
                2 => CellCoverage::MajorityPartial,
                _ => CellCoverage::Full,
            };
            assert_eq!(tree.obstacle_coverage(parent), expected);
        }
        assert!(tree.is_obstacle(parent));
    }

    #[test]
    fn test_full_obstacle_on_branch_counts_every_leaf() {
        let mut tree = planar();
        let leaf_first = leaf(&tree, 0, 0);
        tree.apply_patch(&Patch::obstacle(1, Shape::Box(*tree.cell(leaf_first).effective_area())));
        tree.apply_patch(&Patch::obstacle(2, boxed([0.0, 0.0], [8.0, 8.0])));

        let quadrant = tree.cell(tree.root()).children()[0];
        assert!(tree.is_obstacle(quadrant));
        assert_eq!(tree.cell(quadrant).own_obstacle(), Some(2));
        assert!((tree.obstacle_fraction(tree.root()) - 0.25).abs() < 1e-12);
        assert_eq!(tree.leaves().filter(|&id| tree.is_obstacle(id)).count(), 64);
    }

    #[test]
    fn test_higher_priority_moisture_wins_despite_lower_coverage() {
        let mut tree = planar();
        let target = leaf(&tree, 2, 2);
        let dry = MoistureSource::constant(20.0, 0.3, 1.0);
        let wet = MoistureSource::constant(18.0, 0.9, 2.0);

        assert!(tree.apply_patch(&Patch::moisture(3, boxed([2.0, 2.0], [3.0, 3.0]), dry)));
        assert!(tree.apply_patch(&Patch::moisture(5, boxed([2.0, 2.0], [2.6, 3.0]), wet.clone())));

        assert_eq!(tree.moisture_priority(target), Some(5));
        assert_eq!(tree.moisture(target), Some(&wet));
        assert_eq!(tree.moisture_table().len(), 1);
    }

    #[test]
    fn test_minority_moisture_coverage_is_ignored() {
        let mut tree = planar();
        let source = MoistureSource::constant(20.0, 0.5, 1.0);
        assert!(!tree.apply_patch(&Patch::moisture(1, boxed([2.0, 2.0], [2.3, 3.0]), source)));
        assert!(tree.moisture(leaf(&tree, 2, 2)).is_none());
        assert!(tree.moisture_table().is_empty());
    }

    #[test]
    fn test_equal_priority_keeps_first_applied() {
        let mut tree = planar();
        let first = MoistureSource::constant(10.0, 0.1, 1.0);
        let second = MoistureSource::constant(30.0, 0.8, 1.0);
        let target = leaf(&tree, 1, 1);

        tree.apply_patch(&Patch::moisture(4, boxed([1.0, 1.0], [2.0, 2.0]), first.clone()));
        tree.apply_patch(&Patch::moisture(4, boxed([0.0, 0.0], [4.0, 4.0]), second.clone()));
        assert_eq!(tree.moisture(target), Some(&first));
        assert_eq!(tree.moisture(leaf(&tree, 3, 3)), Some(&second));

        tree.apply_patch(&Patch::resource(2, boxed([8.0, 8.0], [9.0, 9.0]), ResourcePatch::new(GRASS, 1.0)));
        tree.apply_patch(&Patch::resource(2, boxed([8.0, 8.0], [9.0, 9.0]), ResourcePatch::new(GRASS, 5.0)));
        let grass = tree.resource(leaf(&tree, 8, 8), GRASS).unwrap();
        assert!((grass.capacity() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_moisture_on_branch_is_shared() {
        let mut tree = planar();
        let source = MoistureSource {
            temperature_cycle: vec![10.0, 12.0],
            ..MoistureSource::constant(10.0, 0.5, 1.0)
        };
        assert!(tree.apply_patch(&Patch::moisture(1, boxed([8.0, 0.0], [16.0, 8.0]), source)));

        let branch = tree.cell(tree.root()).children()[1];
        assert!(tree.cell(branch).own_moisture().is_some());
        for id in tree.leaves_under(branch) {
            assert!(tree.cell(id).own_moisture().is_none());
            assert_eq!(tree.moisture_slot(id).unwrap().source.index(), 0);
        }

        tree.advance_timestep(1);
        for id in tree.leaves_under(branch) {
            assert_eq!(tree.moisture(id).unwrap().temperature, 12.0);
        }
        assert!((tree.moisture_capacity(branch) - 64.0).abs() < 1e-9);
        let summary = tree.moisture_summary(tree.root()).unwrap();
        assert!((summary.covered_fraction - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_replaced_moisture_sources_are_dropped() {
        let mut tree = planar();
        let domain = boxed([0.0, 0.0], [16.0, 16.0]);
        for priority in 1..=500 {
            let source = MoistureSource::constant(f64::from(priority), 0.5, 1.0);
            assert!(tree.apply_patch(&Patch::moisture(priority, domain.clone(), source)));
        }
        assert_eq!(tree.moisture_table().len(), 1);
        assert_eq!(tree.moisture(leaf(&tree, 3, 3)).unwrap().temperature, 500.0);

        let referenced = tree.cells().filter(|(_, cell)| cell.own_moisture().is_some()).count();
        assert_eq!(referenced, tree.moisture_table().len());
    }

    #[test]
    fn test_shadowed_moisture_below_is_dropped() {
        let mut tree = planar();
        let target = leaf(&tree, 4, 4);
        let low = MoistureSource::constant(1.0, 0.1, 1.0);
        let nested = MoistureSource::constant(2.0, 0.2, 1.0);
        let high = MoistureSource::constant(3.0, 0.3, 1.0);
        tree.apply_patch(&Patch::moisture(1, Shape::Box(*tree.cell(target).effective_area()), low));
        tree.apply_patch(&Patch::moisture(9, boxed([4.0, 4.0], [6.0, 6.0]), nested.clone()));
        assert!(tree.apply_patch(&Patch::moisture(5, boxed([0.0, 0.0], [8.0, 8.0]), high.clone())));

        assert!(tree.cell(target).own_moisture().is_none());
        assert_eq!(tree.moisture(target), Some(&nested));
        assert_eq!(tree.moisture(leaf(&tree, 0, 0)), Some(&high));
        assert_eq!(tree.moisture_table().len(), 2);
        for (_, cell) in tree.cells() {
            if let Some(slot) = cell.own_moisture() {
                assert!(tree.moisture_table().get(slot.source).is_some());
            }
        }
    }

    #[test]
    fn test_obstacle_removes_resources_below() {
        let mut tree = planar();
        let mut grass = ResourcePatch::new(GRASS, 2.0);
        grass.initial_biomass_fraction = 0.5;
        tree.apply_patch(&Patch::resource(1, boxed([0.0, 0.0], [8.0, 8.0]), grass));
        let centre = Point::new([2.0, 2.0]);
        assert!(tree.available_resource_in_radius(&centre, 1.0, GRASS) > 0.0);

        assert!(tree.apply_patch(&Patch::obstacle(1, boxed([0.0, 0.0], [4.0, 4.0]))));
        let blocked: Vec<CellId> = tree.leaves().filter(|&id| tree.is_obstacle(id)).collect();
        assert_eq!(blocked.len(), 16);
        for id in blocked {
            assert!(tree.resource(id, GRASS).is_none());
        }
        assert_eq!(tree.available_resource_in_radius(&centre, 1.0, GRASS), 0.0);
        assert!((tree.total_resource_capacity() - 48.0 * 2.0).abs() < 1e-9);
        assert!((tree.total_resource_biomass(GRASS) - 48.0).abs() < 1e-9);
        let quadrant = tree.cell(tree.root()).children()[0];
        assert!((tree.resource_biomass_in(quadrant, GRASS) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_resource_scales_capacity() {
        let mut tree = planar();
        let target = leaf(&tree, 0, 0);
        let patch = Patch::resource(1, boxed([0.0, 0.0], [0.3, 1.0]), ResourcePatch::new(GRASS, 10.0));
        assert!(tree.apply_patch(&patch));

        let grass = tree.resource(target, GRASS).unwrap();
        assert!((grass.capacity() - 0.3 * 10.0).abs() < 1e-9);
        assert!((tree.total_resource_biomass(GRASS) - 3.0).abs() < 1e-9);
        assert_eq!(tree.resource_priority(target, GRASS), Some(1));
    }

    #[test]
    fn test_full_resource_distributes_per_leaf() {
        let mut tree = planar();
        let mut patch = ResourcePatch::new(GRASS, 2.0);
        patch.initial_biomass_fraction = 0.5;
        let blocked = leaf(&tree, 0, 0);
        tree.apply_patch(&Patch::obstacle(1, Shape::Box(*tree.cell(blocked).effective_area())));
        let favoured = leaf(&tree, 1, 1);
        tree.apply_patch(&Patch::resource(9, boxed([1.0, 1.0], [2.0, 2.0]), ResourcePatch::new(GRASS, 100.0)));

        assert!(tree.apply_patch(&Patch::resource(3, boxed([0.0, 0.0], [4.0, 4.0]), patch)));
        assert!(tree.resource(blocked, GRASS).is_none());
        assert!((tree.resource(favoured, GRASS).unwrap().capacity() - 100.0).abs() < 1e-9);
        let plain = tree.resource(leaf(&tree, 3, 2), GRASS).unwrap();
        assert!((plain.capacity() - 2.0).abs() < 1e-9);
        assert!((plain.biomass() - 1.0).abs() < 1e-9);
        assert!((tree.total_resource_capacity() - (100.0 + 14.0 * 2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_content_types_keep_separate_priorities() {
        let mut tree = planar();
        let target = leaf(&tree, 5, 5);
        let shape = Shape::Box(*tree.cell(target).effective_area());
        tree.apply_patch(&Patch::moisture(50, shape.clone(), MoistureSource::constant(1.0, 1.0, 1.0)));
        assert!(tree.apply_patch(&Patch::obstacle(1, shape.clone())));
        assert_eq!(tree.obstacle_priority(target), Some(1));
        assert_eq!(tree.moisture_priority(target), Some(50));
        assert!(!tree.apply_patch(&Patch::resource(2, shape, ResourcePatch::new(GRASS, 1.0))));
        assert_eq!(tree.resource_priority(target, GRASS), None);
    }

    #[test]
    fn test_polygon_patch_reaches_only_overlapping_leaves() {
        let mut tree = planar();
        let triangle = Shape::polygon(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        assert!(tree.apply_patch(&Patch::resource(1, triangle, ResourcePatch::new(GRASS, 1.0))));
        assert!((tree.total_resource_capacity() - 8.0).abs() < 1e-6);
        assert!(tree.resource(leaf(&tree, 3, 3), GRASS).is_none());
        let diagonal = tree.resource(leaf(&tree, 1, 2), GRASS).unwrap();
        assert!((diagonal.capacity() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_volumetric_patch() {
        let mut tree = SpatialTree::<3>::new(TreeConfig::new(4.0, 4, 1.0)).unwrap();
        let area = Aabb::new(Point::new([0.0, 0.0, 0.0]), Point::new([2.0, 2.0, 2.0]));
        assert!(tree.apply_patch(&Patch::obstacle(1, Shape::Box(area))));
        assert_eq!(tree.leaves().filter(|&id| tree.is_obstacle(id)).count(), 8);
        assert!((tree.obstacle_fraction(tree.root()) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_full_coverage_is_inherited_by_descendants() {
        let tree = planar();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..40 {
            let corner = Point::new([rng.gen_range(-2.0..16.0), rng.gen_range(-2.0..16.0)]);
            let extent = [rng.gen_range(0.5..12.0), rng.gen_range(0.5..12.0)];
            let shape = boxed(*corner.coords(), [corner[0] + extent[0], corner[1] + extent[1]]);
            let sphere = make_sphere(corner, rng.gen_range(1.0..12.0));
            for (id, cell) in tree.cells() {
                let shape_full = cell_coverage(&shape, cell.effective_area()).0 == CellCoverage::Full;
                let sphere_full = sphere.covers_box(cell.effective_area());
                for index in tree.subtree_range(id) {
                    let below = tree.cell(CellId(index)).effective_area();
                    if shape_full {
                        assert_eq!(cell_coverage(&shape, below).0, CellCoverage::Full);
                    }
                    if sphere_full {
                        assert!(sphere.covers_box(below));
                    }
                }
            }
        }
    }

    #[test]
    fn test_circle_patch_classifies_interior_leaves_as_full() {
        let mut tree = planar();
        let circle = Shape::circle(&make_sphere(Point::new([8.0, 8.0]), 5.0));
        assert!(tree.apply_patch(&Patch::obstacle(1, circle)));
        assert!(tree.is_obstacle(tree.get_cell(&Point::new([8.5, 8.5]))));
        assert!(!tree.is_obstacle(tree.get_cell(&Point::new([0.5, 0.5]))));
        assert!(!tree.is_obstacle(tree.get_cell(&Point::new([15.5, 8.5]))));
    }
}
