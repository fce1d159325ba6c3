use landscape_types::{AnimalSpeciesId, Gender, Instar, ResourceSpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the world knows about one animal species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    pub name: String,
    /// Number of instars; valid instars are `1..=instar_count`
    pub instar_count: u32,
    pub genders: Vec<Gender>,
}

/// Enumeration source for "every registered value" when filters are widened
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRegistry {
    animals: BTreeMap<AnimalSpeciesId, SpeciesProfile>,
    resources: BTreeMap<ResourceSpeciesId, String>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_animal(
        &mut self,
        id: AnimalSpeciesId,
        name: impl Into<String>,
        instar_count: u32,
        genders: &[Gender],
    ) {
        let mut genders = genders.to_vec();
        genders.sort();
        genders.dedup();
        self.animals.insert(
            id,
            SpeciesProfile {
                name: name.into(),
                instar_count,
                genders,
            },
        );
    }

    pub fn register_resource(&mut self, id: ResourceSpeciesId, name: impl Into<String>) {
        self.resources.insert(id, name.into());
    }

    pub fn animal(&self, id: AnimalSpeciesId) -> Option<&SpeciesProfile> {
        self.animals.get(&id)
    }

    pub fn animal_species(&self) -> impl Iterator<Item = AnimalSpeciesId> + '_ {
        self.animals.keys().copied()
    }

    pub fn resource_species(&self) -> impl Iterator<Item = ResourceSpeciesId> + '_ {
        self.resources.keys().copied()
    }

    pub fn resource_name(&self, id: ResourceSpeciesId) -> Option<&str> {
        self.resources.get(&id).map(String::as_str)
    }

    /// Instars of a registered species, empty for unknown species
    pub fn instars_of(&self, id: AnimalSpeciesId) -> impl Iterator<Item = Instar> {
        let count = self.animals.get(&id).map_or(0, |profile| profile.instar_count);
        (1..=count).map(Instar)
    }

    /// Genders of a registered species; unknown species may take any gender
    pub fn genders_of(&self, id: AnimalSpeciesId) -> Vec<Gender> {
        self.animals
            .get(&id)
            .map(|profile| profile.genders.clone())
            .unwrap_or_else(|| Gender::ALL.to_vec())
    }

    pub fn is_valid_instar(&self, id: AnimalSpeciesId, instar: Instar) -> bool {
        self.animals
            .get(&id)
            .map_or(true, |profile| instar.0 >= 1 && instar.0 <= profile.instar_count)
    }
}
