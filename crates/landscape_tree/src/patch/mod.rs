//! Prioritised, shaped units of terrain content.
//!
//! A [`Patch`] pairs a [`Shape`] with one kind of content. Applying it walks the
//! tree from the root, see [`SpatialTree::apply_patch`](crate::SpatialTree::apply_patch).

mod applier;

use crate::cell::ResourceSource;
use crate::geometry::Shape;
use crate::habitat::HabitatDomain;
use crate::moisture::MoistureSource;
use landscape_types::{Priority, ResourceSpeciesId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Patch<const D: usize> {
    pub priority: Priority,
    pub shape: Shape<D>,
    pub content: PatchContent,
}

impl<const D: usize> Patch<D> {
    pub fn new(priority: Priority, shape: Shape<D>, content: PatchContent) -> Self {
        Self {
            priority,
            shape,
            content,
        }
    }

    pub fn obstacle(priority: Priority, shape: Shape<D>) -> Self {
        Self::new(priority, shape, PatchContent::Obstacle)
    }

    pub fn moisture(priority: Priority, shape: Shape<D>, source: MoistureSource) -> Self {
        Self::new(priority, shape, PatchContent::Moisture(source))
    }

    pub fn resource(priority: Priority, shape: Shape<D>, resource: ResourcePatch) -> Self {
        Self::new(priority, shape, PatchContent::Resource(resource))
    }

    pub fn habitat_domain(priority: Priority, shape: Shape<D>, domain: HabitatDomain) -> Self {
        Self::new(priority, shape, PatchContent::HabitatDomain(domain))
    }

    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }
}

/// What a patch writes into the cells it reaches. Each variant keeps its own
/// priority bookkeeping, resources per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchContent {
    Obstacle,
    Moisture(MoistureSource),
    Resource(ResourcePatch),
    HabitatDomain(HabitatDomain),
}

impl PatchContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            PatchContent::Obstacle => ContentKind::Obstacle,
            PatchContent::Moisture(_) => ContentKind::Moisture,
            PatchContent::Resource(resource) => ContentKind::Resource(resource.species),
            PatchContent::HabitatDomain(_) => ContentKind::HabitatDomain,
        }
    }
}

/// Resource seeding parameters. Capacity is given per unit of area (or volume)
/// and turned into a leaf capacity when the patch lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePatch {
    pub species: ResourceSpeciesId,
    pub capacity_density: f64,
    /// Share of the capacity present as biomass right after seeding
    #[serde(default = "default_initial_biomass_fraction")]
    pub initial_biomass_fraction: f64,
    #[serde(default = "default_edible_fraction")]
    pub edible_fraction: f64,
    #[serde(default)]
    pub growth_rate: f64,
    #[serde(default)]
    pub patch_spread: bool,
}

fn default_initial_biomass_fraction() -> f64 {
    1.0
}

fn default_edible_fraction() -> f64 {
    1.0
}

impl ResourcePatch {
    pub fn new(species: ResourceSpeciesId, capacity_density: f64) -> Self {
        Self {
            species,
            capacity_density,
            initial_biomass_fraction: default_initial_biomass_fraction(),
            edible_fraction: default_edible_fraction(),
            growth_rate: 0.0,
            patch_spread: false,
        }
    }

    /// Capacity before partial-coverage scaling for a cell of the given measure
    pub fn base_capacity(&self, cell_measure: f64) -> f64 {
        self.capacity_density * cell_measure
    }

    pub(crate) fn source_with_capacity(&self, capacity: f64) -> ResourceSource {
        ResourceSource::new(
            self.species,
            capacity,
            capacity * self.initial_biomass_fraction,
            self.edible_fraction,
            self.growth_rate,
            self.patch_spread,
        )
    }
}

/// Content type tag used for priority bookkeeping and log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Obstacle,
    Moisture,
    Resource(ResourceSpeciesId),
    HabitatDomain,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Obstacle => write!(f, "obstacle"),
            ContentKind::Moisture => write!(f, "moisture"),
            ContentKind::Resource(species) => write!(f, "resource#{}", species.0),
            ContentKind::HabitatDomain => write!(f, "habitat domain"),
        }
    }
}
