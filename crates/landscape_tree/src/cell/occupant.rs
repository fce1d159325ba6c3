use crate::geometry::Point;
use landscape_types::{AnimalKey, AnimalSpeciesId, Gender, Instar, LifeStage, OccupantId};
use serde::{Deserialize, Serialize};

/// Animal record stored in a leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal<const D: usize> {
    id: OccupantId,
    position: Point<D>,
    key: AnimalKey,
    biomass: f64,
}

impl<const D: usize> Animal<D> {
    pub fn new(position: Point<D>, key: AnimalKey, biomass: f64) -> Self {
        Self::with_id(OccupantId::new(), position, key, biomass)
    }

    pub fn with_id(id: OccupantId, position: Point<D>, key: AnimalKey, biomass: f64) -> Self {
        Self {
            id,
            position,
            key,
            biomass,
        }
    }

    pub fn id(&self) -> OccupantId {
        self.id
    }

    pub fn position(&self) -> &Point<D> {
        &self.position
    }

    pub fn key(&self) -> &AnimalKey {
        &self.key
    }

    pub fn life_stage(&self) -> LifeStage {
        self.key.life_stage
    }

    pub fn species(&self) -> AnimalSpeciesId {
        self.key.species
    }

    pub fn instar(&self) -> Instar {
        self.key.instar
    }

    pub fn gender(&self) -> Gender {
        self.key.gender
    }

    pub fn biomass(&self) -> f64 {
        self.biomass
    }

    pub fn set_biomass(&mut self, biomass: f64) {
        self.biomass = biomass;
    }

    pub(crate) fn set_position(&mut self, position: Point<D>) {
        self.position = position;
    }

    pub(crate) fn set_life_stage(&mut self, life_stage: LifeStage) {
        self.key = self.key.with_life_stage(life_stage);
    }
}
