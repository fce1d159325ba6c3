//! Occupant bookkeeping: insertion, removal, migration and population counts.

use crate::cell::{Animal, CellId};
use crate::error::TerrainError;
use crate::geometry::Point;
use crate::tree::SpatialTree;
use landscape_types::{AnimalSpeciesId, LifeStage, OccupantId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Per-species, per-life-stage occupant counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationCensus {
    counts: BTreeMap<AnimalSpeciesId, BTreeMap<LifeStage, usize>>,
}

impl PopulationCensus {
    pub fn count(&self, species: AnimalSpeciesId, life_stage: LifeStage) -> usize {
        self.counts
            .get(&species)
            .and_then(|stages| stages.get(&life_stage))
            .copied()
            .unwrap_or(0)
    }

    pub fn species_total(&self, species: AnimalSpeciesId) -> usize {
        self.counts
            .get(&species)
            .map_or(0, |stages| stages.values().sum())
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|stages| stages.values()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnimalSpeciesId, LifeStage, usize)> + '_ {
        self.counts.iter().flat_map(|(&species, stages)| {
            stages.iter().map(move |(&stage, &count)| (species, stage, count))
        })
    }

    fn add(&mut self, species: AnimalSpeciesId, life_stage: LifeStage, count: usize) {
        *self
            .counts
            .entry(species)
            .or_default()
            .entry(life_stage)
            .or_default() += count;
    }

    fn merge(&mut self, other: PopulationCensus) {
        for (species, stage, count) in other.iter() {
            self.add(species, stage, count);
        }
    }
}

impl<const D: usize> SpatialTree<D> {
    /// Places an occupant in the leaf that owns its position
    pub fn insert_occupant(&mut self, animal: Animal<D>) -> Result<CellId, TerrainError> {
        if self.occupant_index.contains_key(&animal.id()) {
            return Err(TerrainError::DuplicateOccupant(animal.id()));
        }
        let leaf = self.leaf_for_occupant(animal.position())?;
        let id = animal.id();
        self.store_in_leaf(leaf, animal);
        self.occupant_index.insert(id, leaf);
        self.bubble_occupant_delta(leaf, 1);
        trace!("Inserted occupant {} into {}", id, leaf);
        Ok(leaf)
    }

    /// Puts a saved occupant back into the leaf it was recorded in. Obstacles
    /// placed after the occupant arrived do not evict it.
    pub(crate) fn restore_occupant(&mut self, leaf: CellId, animal: Animal<D>) -> Result<CellId, TerrainError> {
        if self.occupant_index.contains_key(&animal.id()) {
            return Err(TerrainError::DuplicateOccupant(animal.id()));
        }
        let id = animal.id();
        self.store_in_leaf(leaf, animal);
        self.occupant_index.insert(id, leaf);
        self.bubble_occupant_delta(leaf, 1);
        Ok(leaf)
    }

    pub fn remove_occupant(&mut self, id: OccupantId) -> Result<Animal<D>, TerrainError> {
        let leaf = self
            .occupant_index
            .get(&id)
            .copied()
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let animal = self.take_from_leaf(leaf, id)?;
        self.occupant_index.remove(&id);
        self.bubble_occupant_delta(leaf, -1);
        trace!("Removed occupant {} from {}", id, leaf);
        Ok(animal)
    }

    /// Moves an occupant, migrating it to another leaf when needed. On error the
    /// occupant stays where it was.
    pub fn move_occupant(&mut self, id: OccupantId, position: Point<D>) -> Result<CellId, TerrainError> {
        let from = self
            .occupant_index
            .get(&id)
            .copied()
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let to = self.leaf_for_occupant(&position)?;

        let mut animal = self.take_from_leaf(from, id)?;
        animal.set_position(position);
        self.store_in_leaf(to, animal);
        if from != to {
            self.occupant_index.insert(id, to);
            self.bubble_occupant_delta(from, -1);
            self.bubble_occupant_delta(to, 1);
        }
        Ok(to)
    }

    /// Re-buckets an occupant under a new life stage
    pub fn set_life_stage(&mut self, id: OccupantId, life_stage: LifeStage) -> Result<(), TerrainError> {
        let leaf = self
            .occupant_index
            .get(&id)
            .copied()
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let mut animal = self.take_from_leaf(leaf, id)?;
        animal.set_life_stage(life_stage);
        self.store_in_leaf(leaf, animal);
        Ok(())
    }

    pub fn set_occupant_biomass(&mut self, id: OccupantId, biomass: f64) -> Result<(), TerrainError> {
        let leaf = self
            .occupant_index
            .get(&id)
            .copied()
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let key = self
            .occupant(id)
            .map(|animal| *animal.key())
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let animal = self.cells[leaf.0]
            .contents_mut()
            .and_then(|contents| contents.animal_mut(&key, id))
            .ok_or(TerrainError::UnknownOccupant(id))?;
        animal.set_biomass(biomass);
        Ok(())
    }

    pub fn occupant(&self, id: OccupantId) -> Option<&Animal<D>> {
        let leaf = self.occupant_index.get(&id)?;
        self.cells[leaf.0]
            .contents()?
            .animals()
            .find(|animal| animal.id() == id)
    }

    pub fn occupant_cell(&self, id: OccupantId) -> Option<CellId> {
        self.occupant_index.get(&id).copied()
    }

    pub fn occupant_count(&self) -> usize {
        self.cells[self.root().0].occupant_count
    }

    /// Per-species, per-life-stage counts folded bottom-up from the leaves
    pub fn obtain_aggregate_population(&self) -> PopulationCensus {
        self.census_of(self.root())
    }

    fn census_of(&self, id: CellId) -> PopulationCensus {
        let cell = &self.cells[id.0];
        if let Some(contents) = cell.contents() {
            let mut census = PopulationCensus::default();
            for (key, bucket) in contents.buckets() {
                census.add(key.species, key.life_stage, bucket.len());
            }
            return census;
        }
        let mut census = PopulationCensus::default();
        if cell.occupant_count == 0 {
            return census;
        }
        for &child in cell.children() {
            census.merge(self.census_of(child));
        }
        census
    }

    fn leaf_for_occupant(&self, position: &Point<D>) -> Result<CellId, TerrainError> {
        let leaf = self.locate(position).ok_or_else(|| TerrainError::OutsideDomain {
            position: position.coords().to_vec(),
        })?;
        if self.is_obstacle(leaf) {
            return Err(TerrainError::ObstacleCell { cell: leaf });
        }
        Ok(leaf)
    }

    fn store_in_leaf(&mut self, leaf: CellId, animal: Animal<D>) {
        match self.cells[leaf.0].contents_mut() {
            Some(contents) => contents.insert_animal(animal),
            None => unreachable!("occupants are only routed to leaves"),
        }
    }

    fn take_from_leaf(&mut self, leaf: CellId, id: OccupantId) -> Result<Animal<D>, TerrainError> {
        let contents = self.cells[leaf.0]
            .contents_mut()
            .ok_or(TerrainError::UnknownOccupant(id))?;
        let key = contents
            .animals()
            .find(|animal| animal.id() == id)
            .map(|animal| *animal.key())
            .ok_or(TerrainError::UnknownOccupant(id))?;
        contents
            .remove_animal(&key, id)
            .ok_or(TerrainError::UnknownOccupant(id))
    }

    /// Forwards an occupant count change from a leaf up to the root
    fn bubble_occupant_delta(&mut self, leaf: CellId, delta: isize) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let cell = &mut self.cells[id.0];
            cell.occupant_count = cell.occupant_count.saturating_add_signed(delta);
            current = cell.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use landscape_types::{AnimalKey, Gender, Instar};

    fn key(species: u32, stage: LifeStage) -> AnimalKey {
        AnimalKey::new(stage, AnimalSpeciesId(species), Instar(1), Gender::Female)
    }

    fn tree() -> SpatialTree<2> {
        SpatialTree::new(TreeConfig::new(16.0, 16, 1.0)).unwrap()
    }

    #[test]
    fn test_insert_routes_to_leaf_and_bubbles_counts() {
        let mut tree = tree();
        let animal = Animal::new(Point::new([3.5, 5.5]), key(1, LifeStage::Active), 2.0);
        let id = animal.id();
        let leaf = tree.insert_occupant(animal).unwrap();

        assert_eq!(leaf, tree.get_cell(&Point::new([3.5, 5.5])));
        for cell in tree.lineage(leaf).collect::<Vec<_>>() {
            assert_eq!(tree.cell(cell).occupant_count(), 1);
        }
        assert_eq!(tree.occupant(id).map(Animal::biomass), Some(2.0));
        assert_eq!(tree.occupant_cell(id), Some(leaf));
    }

    #[test]
    fn test_insert_failures() {
        let mut tree = tree();
        let outside = Animal::new(Point::new([20.0, 1.0]), key(1, LifeStage::Active), 1.0);
        assert!(matches!(
            tree.insert_occupant(outside),
            Err(TerrainError::OutsideDomain { .. })
        ));

        let animal = Animal::new(Point::new([1.0, 1.0]), key(1, LifeStage::Active), 1.0);
        let duplicate = animal.clone();
        tree.insert_occupant(animal).unwrap();
        assert!(matches!(
            tree.insert_occupant(duplicate),
            Err(TerrainError::DuplicateOccupant(_))
        ));
    }

    #[test]
    fn test_move_and_remove() {
        let mut tree = tree();
        let animal = Animal::new(Point::new([0.5, 0.5]), key(1, LifeStage::Active), 1.0);
        let id = animal.id();
        let from = tree.insert_occupant(animal).unwrap();
        let to = tree.move_occupant(id, Point::new([12.5, 9.5])).unwrap();
        assert_ne!(from, to);
        assert_eq!(tree.cell(from).occupant_count(), 0);
        assert_eq!(tree.cell(to).occupant_count(), 1);
        assert_eq!(tree.occupant(id).unwrap().position(), &Point::new([12.5, 9.5]));

        assert!(tree.move_occupant(id, Point::new([-3.0, 0.0])).is_err());
        assert_eq!(tree.occupant_cell(id), Some(to));

        let removed = tree.remove_occupant(id).unwrap();
        assert_eq!(removed.id(), id);
        assert_eq!(tree.occupant_count(), 0);
        assert_eq!(tree.remove_occupant(id), Err(TerrainError::UnknownOccupant(id)));
    }

    #[test]
    fn test_aggregate_population() {
        let mut tree = tree();
        let placements = [
            ([1.0, 1.0], key(1, LifeStage::Active)),
            ([9.0, 1.0], key(1, LifeStage::Active)),
            ([9.0, 9.0], key(1, LifeStage::Diapause)),
            ([15.0, 2.0], key(2, LifeStage::Active)),
        ];
        for (position, animal_key) in placements {
            tree.insert_occupant(Animal::new(Point::new(position), animal_key, 1.0))
                .unwrap();
        }
        let census = tree.obtain_aggregate_population();
        assert_eq!(census.count(AnimalSpeciesId(1), LifeStage::Active), 2);
        assert_eq!(census.count(AnimalSpeciesId(1), LifeStage::Diapause), 1);
        assert_eq!(census.species_total(AnimalSpeciesId(2)), 1);
        assert_eq!(census.total(), 4);
        assert_eq!(census.total(), tree.occupant_count());
    }

    #[test]
    fn test_life_stage_change_rebuckets() {
        let mut tree = tree();
        let animal = Animal::new(Point::new([4.0, 4.0]), key(3, LifeStage::Active), 1.0);
        let id = animal.id();
        tree.insert_occupant(animal).unwrap();
        tree.set_life_stage(id, LifeStage::Senesced).unwrap();
        let census = tree.obtain_aggregate_population();
        assert_eq!(census.count(AnimalSpeciesId(3), LifeStage::Active), 0);
        assert_eq!(census.count(AnimalSpeciesId(3), LifeStage::Senesced), 1);
        assert_eq!(tree.occupant(id).unwrap().life_stage(), LifeStage::Senesced);

        tree.set_occupant_biomass(id, 4.5).unwrap();
        assert_eq!(tree.occupant(id).unwrap().biomass(), 4.5);
    }
}
