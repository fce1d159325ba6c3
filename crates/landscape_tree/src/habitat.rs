//! Habitat domains: which species and instars may treat a region as habitat.
//!
//! A habitat patch records its domain on the cells it covers, the same way
//! moisture is recorded. Leaves read the winning slot along their lineage;
//! branches summarise by majority of their children.

use crate::cell::CellId;
use crate::tree::SpatialTree;
use landscape_types::{AnimalSpeciesId, Instar, Priority};
use serde::{Deserialize, Serialize};

/// Instars of one species that count the domain as habitat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitatSpecies {
    pub species: AnimalSpeciesId,
    pub instars: Vec<Instar>,
}

/// Set of (species, instar) pairs a habitat patch marks as suitable.
/// Pairs not listed are unsuitable inside the patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitatDomain {
    #[serde(default)]
    pub species: Vec<HabitatSpecies>,
}

impl HabitatDomain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_species(mut self, species: AnimalSpeciesId, instars: &[Instar]) -> Self {
        match self.species.iter_mut().find(|entry| entry.species == species) {
            Some(entry) => {
                for instar in instars {
                    if !entry.instars.contains(instar) {
                        entry.instars.push(*instar);
                    }
                }
            }
            None => self.species.push(HabitatSpecies {
                species,
                instars: instars.to_vec(),
            }),
        }
        self
    }

    pub fn contains(&self, species: AnimalSpeciesId, instar: Instar) -> bool {
        self.species
            .iter()
            .any(|entry| entry.species == species && entry.instars.contains(&instar))
    }
}

/// Habitat record stored on the cell a patch landed on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitatSlot {
    pub priority: Priority,
    /// Application order, breaks priority ties in favour of the earlier patch
    pub sequence: u64,
    pub domain: HabitatDomain,
}

impl<const D: usize> SpatialTree<D> {
    /// Winning habitat slot along the lineage: highest priority, earliest on ties
    pub fn habitat_slot(&self, id: CellId) -> Option<&HabitatSlot> {
        self.lineage(id)
            .filter_map(|cell| self.cells[cell.0].habitat.as_ref())
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.sequence.cmp(&a.sequence)))
    }

    pub fn habitat_priority(&self, id: CellId) -> Option<Priority> {
        self.habitat_slot(id).map(|slot| slot.priority)
    }

    /// A leaf is habitat when its winning domain lists the pair. A branch is
    /// habitat when more than half of its children are.
    pub fn is_habitat(&self, id: CellId, species: AnimalSpeciesId, instar: Instar) -> bool {
        let children = self.cells[id.0].children();
        if children.is_empty() {
            return self
                .habitat_slot(id)
                .map_or(false, |slot| slot.domain.contains(species, instar));
        }
        let suitable = children
            .iter()
            .filter(|&&child| self.is_habitat(child, species, instar))
            .count();
        suitable * 2 > children.len()
    }

    /// Fraction of the leaves below `id` that are habitat for the pair
    pub fn habitat_fraction(&self, id: CellId, species: AnimalSpeciesId, instar: Instar) -> f64 {
        let suitable = self
            .leaves_under(id)
            .filter(|&leaf| self.is_habitat(leaf, species, instar))
            .count();
        suitable as f64 / self.leaves_in_subtree(id) as f64
    }
}
