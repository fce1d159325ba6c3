//! Terrain cells: the nodes of the spatial partition tree.
//!
//! Cells live in an arena owned by [`crate::SpatialTree`] and refer to each
//! other by [`CellId`]. The Root/Branch/Leaf tag is fixed when the tree is
//! built; only leaves hold occupants and resources.

mod occupant;
mod resource;

pub use occupant::Animal;
pub use resource::ResourceSource;

use crate::geometry::{Aabb, TreePoint};
use crate::habitat::HabitatSlot;
use crate::moisture::MoistureSlot;
use landscape_types::{AnimalKey, OccupantId, Priority, ResourceSpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Index of a cell in the tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Root,
    Branch,
    Leaf,
}

#[derive(Debug, Clone)]
pub(crate) enum CellVariant<const D: usize> {
    Root { children: Vec<CellId> },
    Branch { parent: CellId, children: Vec<CellId> },
    Leaf { parent: CellId, contents: LeafContents<D> },
}

/// One node of the tree.
///
/// Content that the tree resolves through ancestors (obstacle, moisture and
/// resource priorities) is stored here as this cell's own record only; use the
/// tree's accessors for the effective values.
#[derive(Debug, Clone)]
pub struct TerrainCell<const D: usize> {
    pub(crate) position: TreePoint<D>,
    pub(crate) size: f64,
    pub(crate) effective_area: Aabb<D>,
    pub(crate) variant: CellVariant<D>,
    pub(crate) obstacle: Option<Priority>,
    /// Leaves below this cell that are obstacles, counting this cell's own record
    pub(crate) obstacle_leaves: usize,
    pub(crate) moisture: Option<MoistureSlot>,
    pub(crate) habitat: Option<HabitatSlot>,
    pub(crate) resource_priorities: BTreeMap<ResourceSpeciesId, Priority>,
    pub(crate) max_resource_capacity: f64,
    pub(crate) resource_biomass: BTreeMap<ResourceSpeciesId, f64>,
    pub(crate) occupant_count: usize,
}

impl<const D: usize> TerrainCell<D> {
    pub(crate) fn new(position: TreePoint<D>, size: f64, effective_area: Aabb<D>, variant: CellVariant<D>) -> Self {
        Self {
            position,
            size,
            effective_area,
            variant,
            obstacle: None,
            obstacle_leaves: 0,
            moisture: None,
            habitat: None,
            resource_priorities: BTreeMap::new(),
            max_resource_capacity: 0.0,
            resource_biomass: BTreeMap::new(),
            occupant_count: 0,
        }
    }

    pub fn kind(&self) -> CellKind {
        match self.variant {
            CellVariant::Root { .. } => CellKind::Root,
            CellVariant::Branch { .. } => CellKind::Branch,
            CellVariant::Leaf { .. } => CellKind::Leaf,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.variant, CellVariant::Leaf { .. })
    }

    pub fn position(&self) -> &TreePoint<D> {
        &self.position
    }

    pub fn depth(&self) -> u32 {
        self.position.depth()
    }

    /// Edge length
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn effective_area(&self) -> &Aabb<D> {
        &self.effective_area
    }

    pub fn parent(&self) -> Option<CellId> {
        match &self.variant {
            CellVariant::Root { .. } => None,
            CellVariant::Branch { parent, .. } | CellVariant::Leaf { parent, .. } => Some(*parent),
        }
    }

    /// The `2^D` children of a Root or Branch, empty for a Leaf
    pub fn children(&self) -> &[CellId] {
        match &self.variant {
            CellVariant::Root { children } | CellVariant::Branch { children, .. } => children,
            CellVariant::Leaf { .. } => &[],
        }
    }

    pub fn contents(&self) -> Option<&LeafContents<D>> {
        match &self.variant {
            CellVariant::Leaf { contents, .. } => Some(contents),
            _ => None,
        }
    }

    pub(crate) fn contents_mut(&mut self) -> Option<&mut LeafContents<D>> {
        match &mut self.variant {
            CellVariant::Leaf { contents, .. } => Some(contents),
            _ => None,
        }
    }

    /// This cell's own obstacle record, ignoring ancestors
    pub fn own_obstacle(&self) -> Option<Priority> {
        self.obstacle
    }

    /// This cell's own moisture slot, ignoring ancestors
    pub fn own_moisture(&self) -> Option<MoistureSlot> {
        self.moisture
    }

    pub fn own_habitat(&self) -> Option<&HabitatSlot> {
        self.habitat.as_ref()
    }

    pub fn own_resource_priority(&self, species: ResourceSpeciesId) -> Option<Priority> {
        self.resource_priorities.get(&species).copied()
    }

    /// Sum of leaf resource capacities in this subtree
    pub fn max_resource_capacity(&self) -> f64 {
        self.max_resource_capacity
    }

    /// Resource biomass of one species in this subtree
    pub fn resource_biomass(&self, species: ResourceSpeciesId) -> f64 {
        self.resource_biomass.get(&species).copied().unwrap_or(0.0)
    }

    /// Occupants held by leaves in this subtree
    pub fn occupant_count(&self) -> usize {
        self.occupant_count
    }
}

/// Occupant containers of a leaf
#[derive(Debug, Clone, Default)]
pub struct LeafContents<const D: usize> {
    animals: HashMap<AnimalKey, Vec<Animal<D>>>,
    resources: BTreeMap<ResourceSpeciesId, ResourceSource>,
}

impl<const D: usize> LeafContents<D> {
    pub(crate) fn insert_animal(&mut self, animal: Animal<D>) {
        self.animals.entry(*animal.key()).or_default().push(animal);
    }

    pub(crate) fn remove_animal(&mut self, key: &AnimalKey, id: OccupantId) -> Option<Animal<D>> {
        let bucket = self.animals.get_mut(key)?;
        let index = bucket.iter().position(|animal| animal.id() == id)?;
        let animal = bucket.swap_remove(index);
        if bucket.is_empty() {
            self.animals.remove(key);
        }
        Some(animal)
    }

    pub(crate) fn animal_mut(&mut self, key: &AnimalKey, id: OccupantId) -> Option<&mut Animal<D>> {
        self.animals
            .get_mut(key)?
            .iter_mut()
            .find(|animal| animal.id() == id)
    }

    pub fn animal(&self, key: &AnimalKey, id: OccupantId) -> Option<&Animal<D>> {
        self.animals.get(key)?.iter().find(|animal| animal.id() == id)
    }

    /// Non-empty buckets with their keys
    pub fn buckets(&self) -> impl Iterator<Item = (&AnimalKey, &[Animal<D>])> {
        self.animals.iter().map(|(key, bucket)| (key, bucket.as_slice()))
    }

    pub fn bucket(&self, key: &AnimalKey) -> &[Animal<D>] {
        self.animals.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn animals(&self) -> impl Iterator<Item = &Animal<D>> {
        self.animals.values().flatten()
    }

    pub fn animal_count(&self) -> usize {
        self.animals.values().map(Vec::len).sum()
    }

    pub fn resource(&self, species: ResourceSpeciesId) -> Option<&ResourceSource> {
        self.resources.get(&species)
    }

    pub(crate) fn resource_mut(&mut self, species: ResourceSpeciesId) -> Option<&mut ResourceSource> {
        self.resources.get_mut(&species)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceSource> {
        self.resources.values()
    }

    pub(crate) fn resources_mut(&mut self) -> impl Iterator<Item = &mut ResourceSource> {
        self.resources.values_mut()
    }

    /// Replaces the resource of the source's species, returning the previous one
    pub(crate) fn set_resource(&mut self, source: ResourceSource) -> Option<ResourceSource> {
        self.resources.insert(source.species(), source)
    }

    pub(crate) fn clear_resources(&mut self) -> BTreeMap<ResourceSpeciesId, ResourceSource> {
        std::mem::take(&mut self.resources)
    }
}
