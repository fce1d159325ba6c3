//! Leaf resource sources and the bottom-up biomass and capacity aggregates.

use crate::cell::{CellId, ResourceSource};
use crate::geometry::{make_sphere, Point};
use crate::tree::SpatialTree;
use landscape_types::ResourceSpeciesId;
use tracing::trace;

impl<const D: usize> SpatialTree<D> {
    pub fn resource(&self, id: CellId, species: ResourceSpeciesId) -> Option<&ResourceSource> {
        self.cells[id.0].contents()?.resource(species)
    }

    /// Biomass of `species` summed over the whole tree
    pub fn total_resource_biomass(&self, species: ResourceSpeciesId) -> f64 {
        self.cells[self.root().0].resource_biomass(species)
    }

    /// Sum of every leaf resource capacity in the tree
    pub fn total_resource_capacity(&self) -> f64 {
        self.cells[self.root().0].max_resource_capacity()
    }

    pub fn resource_biomass_in(&self, id: CellId, species: ResourceSpeciesId) -> f64 {
        self.cells[id.0].resource_biomass(species)
    }

    /// Grazes the leaf holding `point`; returns the biomass actually removed
    pub fn consume_resource(&mut self, point: &Point<D>, species: ResourceSpeciesId, amount: f64) -> f64 {
        match self.locate(point) {
            Some(leaf) => self.consume_at(leaf, species, amount),
            None => 0.0,
        }
    }

    /// Grazes every leaf the sphere touches, taking from each in proportion to
    /// its available biomass; returns the total removed
    pub fn consume_resource_in_radius(
        &mut self,
        point: &Point<D>,
        radius: f64,
        species: ResourceSpeciesId,
        amount: f64,
    ) -> f64 {
        let sphere = make_sphere(*point, radius);
        let available: Vec<(CellId, f64)> = self
            .touched_leaves(&sphere)
            .into_iter()
            .filter_map(|leaf| {
                let biomass = self.resource(leaf, species)?.available_biomass();
                (biomass > 0.0).then_some((leaf, biomass))
            })
            .collect();

        let total: f64 = available.iter().map(|(_, biomass)| biomass).sum();
        if total <= 0.0 || amount <= 0.0 {
            return 0.0;
        }
        let wanted = amount.min(total);
        available
            .into_iter()
            .map(|(leaf, biomass)| self.consume_at(leaf, species, wanted * biomass / total))
            .sum()
    }

    fn consume_at(&mut self, leaf: CellId, species: ResourceSpeciesId, amount: f64) -> f64 {
        let taken = self.cells[leaf.0]
            .contents_mut()
            .and_then(|contents| contents.resource_mut(species))
            .map_or(0.0, |source| source.consume(amount));
        if taken > 0.0 {
            self.bubble_resource_delta(leaf, species, 0.0, -taken);
        }
        taken
    }

    /// Replaces a leaf's source for the species and forwards the capacity and
    /// biomass changes to the root
    pub(crate) fn set_leaf_resource(&mut self, leaf: CellId, source: ResourceSource) {
        let species = source.species();
        let (capacity, biomass) = (source.capacity(), source.biomass());
        let Some(contents) = self.cells[leaf.0].contents_mut() else {
            unreachable!("resource sources are only stored on leaves");
        };
        let (old_capacity, old_biomass) = contents
            .set_resource(source)
            .map_or((0.0, 0.0), |old| (old.capacity(), old.biomass()));
        self.bubble_resource_delta(leaf, species, capacity - old_capacity, biomass - old_biomass);
    }

    /// Removes every source from a leaf and takes their capacity and biomass
    /// out of the aggregates
    pub(crate) fn clear_leaf_resources(&mut self, leaf: CellId) {
        let cleared = match self.cells[leaf.0].contents_mut() {
            Some(contents) => contents.clear_resources(),
            None => return,
        };
        for (species, source) in cleared {
            self.bubble_resource_delta(leaf, species, -source.capacity(), -source.biomass());
        }
    }

    pub(crate) fn bubble_resource_delta(
        &mut self,
        leaf: CellId,
        species: ResourceSpeciesId,
        capacity_delta: f64,
        biomass_delta: f64,
    ) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let cell = &mut self.cells[id.0];
            cell.max_resource_capacity = (cell.max_resource_capacity + capacity_delta).max(0.0);
            let total = cell.resource_biomass.entry(species).or_insert(0.0);
            *total = (*total + biomass_delta).max(0.0);
            current = cell.parent();
        }
    }

    /// Logistic regrowth of every leaf source; returns the total biomass gained
    pub(crate) fn regrow_resources(&mut self) -> f64 {
        let mut regrown = 0.0;
        for index in 0..self.cells.len() {
            let Some(contents) = self.cells[index].contents_mut() else {
                continue;
            };
            let deltas: Vec<(ResourceSpeciesId, f64)> = contents
                .resources_mut()
                .map(|source| (source.species(), source.regrow()))
                .filter(|(_, delta)| *delta != 0.0)
                .collect();
            for (species, delta) in deltas {
                regrown += delta;
                self.bubble_resource_delta(CellId(index), species, 0.0, delta);
            }
        }
        trace!("Regrew {:.3} resource biomass", regrown);
        regrown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;

    const GRASS: ResourceSpeciesId = ResourceSpeciesId(1);

    fn seeded() -> SpatialTree<2> {
        let mut tree = SpatialTree::new(TreeConfig::new(8.0, 8, 1.0)).unwrap();
        let leaves: Vec<CellId> = tree.leaves().collect();
        for leaf in leaves {
            tree.set_leaf_resource(leaf, ResourceSource::new(GRASS, 2.0, 1.0, 0.5, 0.2, false));
        }
        tree
    }

    #[test]
    fn test_aggregates_bubble_to_root() {
        let tree = seeded();
        assert!((tree.total_resource_biomass(GRASS) - 64.0).abs() < 1e-9);
        assert!((tree.total_resource_capacity() - 128.0).abs() < 1e-9);
        let quadrant = tree.cell(tree.root()).children()[0];
        assert!((tree.resource_biomass_in(quadrant, GRASS) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_consume_at_point_respects_edible_fraction() {
        let mut tree = seeded();
        // capacity 2 with half inedible leaves nothing available at biomass 1
        assert_eq!(tree.consume_resource(&Point::new([0.5, 0.5]), GRASS, 1.0), 0.0);

        let leaf = tree.get_cell(&Point::new([0.5, 0.5]));
        tree.set_leaf_resource(leaf, ResourceSource::new(GRASS, 2.0, 2.0, 0.5, 0.0, false));
        let taken = tree.consume_resource(&Point::new([0.5, 0.5]), GRASS, 5.0);
        assert!((taken - 1.0).abs() < 1e-12);
        assert!((tree.total_resource_biomass(GRASS) - 64.0).abs() < 1e-9);
        assert_eq!(tree.consume_resource(&Point::new([50.0, 0.5]), GRASS, 5.0), 0.0);
    }

    #[test]
    fn test_consume_in_radius_is_proportional() {
        let mut tree = SpatialTree::<2>::new(TreeConfig::new(8.0, 8, 1.0)).unwrap();
        let rich = tree.get_cell(&Point::new([3.5, 3.5]));
        let poor = tree.get_cell(&Point::new([4.5, 3.5]));
        tree.set_leaf_resource(rich, ResourceSource::new(GRASS, 10.0, 9.0, 1.0, 0.0, false));
        tree.set_leaf_resource(poor, ResourceSource::new(GRASS, 10.0, 3.0, 1.0, 0.0, false));

        let taken = tree.consume_resource_in_radius(&Point::new([4.0, 3.5]), 0.6, GRASS, 4.0);
        assert!((taken - 4.0).abs() < 1e-9);
        assert!((tree.resource(rich, GRASS).unwrap().biomass() - 6.0).abs() < 1e-9);
        assert!((tree.resource(poor, GRASS).unwrap().biomass() - 2.0).abs() < 1e-9);
        assert!((tree.total_resource_biomass(GRASS) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_timestep_regrowth_updates_totals() {
        let mut tree = seeded();
        tree.advance_timestep(1);
        // logistic step: 1 + 0.2 * 1 * (1 - 1/2) per leaf
        assert!((tree.total_resource_biomass(GRASS) - 64.0 * 1.1).abs() < 1e-9);
        let leaf = tree.get_cell(&Point::new([7.5, 7.5]));
        assert!((tree.resource(leaf, GRASS).unwrap().biomass() - 1.1).abs() < 1e-12);
    }
}
