//! Core identifiers and enumerations shared by the landscape crates.
//!
//! Occupants of the terrain are bucketed by life stage, species, instar and
//! gender. The types here carry those categories plus the identifiers used to
//! address individual occupants and resource species.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Core Identifiers
// ============================================================================

/// Unique identifier for an occupant (an animal record) placed in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccupantId(pub Uuid);

impl OccupantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OccupantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registered animal species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimalSpeciesId(pub u32);

impl fmt::Display for AnimalSpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "animal#{}", self.0)
    }
}

/// Registered resource (edible biomass) species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceSpeciesId(pub u32);

impl fmt::Display for ResourceSpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Discrete developmental stage index. Instars are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instar(pub u32);

impl fmt::Display for Instar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instar {}", self.0)
    }
}

/// Patch priority. Higher values win.
pub type Priority = i32;

// ============================================================================
// Occupant Categories
// ============================================================================

/// Coarse behavioural / vital-status category of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeStage {
    Unborn,
    Active,
    Starved,
    Predated,
    Reproducing,
    Pupa,
    Satiated,
    Handling,
    Diapause,
    Background,
    Senesced,
    Shocked,
}

impl LifeStage {
    /// Every life stage, in declaration order
    pub const ALL: [LifeStage; 12] = [
        LifeStage::Unborn,
        LifeStage::Active,
        LifeStage::Starved,
        LifeStage::Predated,
        LifeStage::Reproducing,
        LifeStage::Pupa,
        LifeStage::Satiated,
        LifeStage::Handling,
        LifeStage::Diapause,
        LifeStage::Background,
        LifeStage::Senesced,
        LifeStage::Shocked,
    ];

    /// Whether an animal in this stage is still part of the living population
    pub fn is_alive(&self) -> bool {
        !matches!(
            self,
            LifeStage::Starved | LifeStage::Predated | LifeStage::Background | LifeStage::Senesced | LifeStage::Shocked
        )
    }
}

impl fmt::Display for LifeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifeStage::Unborn => "unborn",
            LifeStage::Active => "active",
            LifeStage::Starved => "starved",
            LifeStage::Predated => "predated",
            LifeStage::Reproducing => "reproducing",
            LifeStage::Pupa => "pupa",
            LifeStage::Satiated => "satiated",
            LifeStage::Handling => "handling",
            LifeStage::Diapause => "diapause",
            LifeStage::Background => "background",
            LifeStage::Senesced => "senesced",
            LifeStage::Shocked => "shocked",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Hermaphrodite,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Hermaphrodite];
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
            Gender::Hermaphrodite => f.write_str("hermaphrodite"),
        }
    }
}

/// Bucket key under which a leaf stores its animals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnimalKey {
    pub life_stage: LifeStage,
    pub species: AnimalSpeciesId,
    pub instar: Instar,
    pub gender: Gender,
}

impl AnimalKey {
    pub fn new(life_stage: LifeStage, species: AnimalSpeciesId, instar: Instar, gender: Gender) -> Self {
        Self {
            life_stage,
            species,
            instar,
            gender,
        }
    }

    /// Same key with a different life stage
    pub fn with_life_stage(self, life_stage: LifeStage) -> Self {
        Self { life_stage, ..self }
    }
}

impl fmt::Display for AnimalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.life_stage, self.species, self.instar, self.gender
        )
    }
}
