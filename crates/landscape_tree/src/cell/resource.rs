use landscape_types::ResourceSpeciesId;
use serde::{Deserialize, Serialize};

/// Edible biomass of one resource species held by a leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSource {
    species: ResourceSpeciesId,
    capacity: f64,
    biomass: f64,
    edible_fraction: f64,
    growth_rate: f64,
    patch_spread: bool,
}

impl ResourceSource {
    pub fn new(
        species: ResourceSpeciesId,
        capacity: f64,
        biomass: f64,
        edible_fraction: f64,
        growth_rate: f64,
        patch_spread: bool,
    ) -> Self {
        let capacity = capacity.max(0.0);
        Self {
            species,
            capacity,
            biomass: biomass.clamp(0.0, capacity),
            edible_fraction: edible_fraction.clamp(0.0, 1.0),
            growth_rate,
            patch_spread,
        }
    }

    pub fn species(&self) -> ResourceSpeciesId {
        self.species
    }

    /// Maximum biomass the leaf can hold for this species
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    pub fn edible_fraction(&self) -> f64 {
        self.edible_fraction
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Whether the resource may colonise neighbouring cells
    pub fn patch_spread(&self) -> bool {
        self.patch_spread
    }

    /// Biomass that always stays behind after grazing
    pub fn minimum_edible_biomass(&self) -> f64 {
        self.capacity * (1.0 - self.edible_fraction)
    }

    pub fn available_biomass(&self) -> f64 {
        (self.biomass - self.minimum_edible_biomass()).max(0.0)
    }

    /// Takes up to `amount` of the available biomass and returns what was taken
    pub(crate) fn consume(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.available_biomass());
        self.biomass -= taken;
        taken
    }

    /// One step of logistic regrowth towards capacity; returns the biomass gained
    pub(crate) fn regrow(&mut self) -> f64 {
        if self.capacity <= 0.0 || self.growth_rate == 0.0 {
            return 0.0;
        }
        let growth = self.growth_rate * self.biomass * (1.0 - self.biomass / self.capacity);
        let next = (self.biomass + growth).clamp(0.0, self.capacity);
        let delta = next - self.biomass;
        self.biomass = next;
        delta
    }
}
