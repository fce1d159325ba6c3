//! Occupant category filters and the species registry they expand against.

mod filter;
mod registry;

pub use filter::{SearchFilter, SearchParams};
pub use registry::{SpeciesProfile, SpeciesRegistry};

use landscape_types::ResourceSpeciesId;
use std::collections::HashSet;

/// Set of resource species a query is interested in. Matches nothing until widened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    species: HashSet<ResourceSpeciesId>,
}

impl ResourceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only(species: ResourceSpeciesId) -> Self {
        let mut filter = Self::new();
        filter.species.insert(species);
        filter
    }

    /// Adds the given species, or every registered resource species for `None`
    pub fn add_species(&mut self, species: Option<&[ResourceSpeciesId]>, registry: &SpeciesRegistry) {
        match species {
            Some(species) => self.species.extend(species.iter().copied()),
            None => self.species.extend(registry.resource_species()),
        }
    }

    pub fn matches(&self, species: ResourceSpeciesId) -> bool {
        self.species.contains(&species)
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ResourceSpeciesId> + '_ {
        self.species.iter().copied()
    }
}
