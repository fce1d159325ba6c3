//! # Landscape Tree
//!
//! A recursive spatial partition tree over a bounded 2D or 3D terrain. The
//! tree indexes animals, resources, moisture and obstacles, and supports two
//! workloads of an ecological simulation:
//!
//! * **Patches**: prioritised shapes carrying obstacle, moisture, resource or habitat
//!   content, pushed down the hierarchy according to how much of each cell they
//!   cover ([`SpatialTree::apply_patch`]).
//! * **Radius queries**: occupants within a distance of a point that pass a
//!   category filter, answered by pruning whole subtrees
//!   ([`SpatialTree::query_radius`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use landscape_tree::{
//!     Animal, Aabb, Patch, Point, SearchFilter, Shape, SpatialTree, SpeciesRegistry, TreeConfig,
//! };
//! use landscape_types::{AnimalKey, AnimalSpeciesId, Gender, Instar, LifeStage};
//!
//! let mut tree = SpatialTree::<2>::new(TreeConfig::new(16.0, 16, 1.0)).unwrap();
//! let pond = Shape::Box(Aabb::new(Point::new([4.0, 4.0]), Point::new([6.0, 6.0])));
//! tree.apply_patch(&Patch::obstacle(1, pond));
//!
//! let key = AnimalKey::new(LifeStage::Active, AnimalSpeciesId(1), Instar(1), Gender::Female);
//! tree.insert_occupant(Animal::new(Point::new([2.0, 2.0]), key, 1.0)).unwrap();
//!
//! let mut registry = SpeciesRegistry::new();
//! registry.register_animal(AnimalSpeciesId(1), "carabid", 3, &Gender::ALL);
//! let filter = SearchFilter::everything(&registry);
//! assert_eq!(tree.query_radius(&Point::new([3.0, 3.0]), 2.0, &filter).len(), 1);
//! ```
//!
//! The mutation phase of a timestep (patches, occupant moves,
//! [`SpatialTree::advance_timestep`]) and queries never overlap; the tree is
//! plain data with no interior locking.

pub mod cell;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod geometry;
pub mod habitat;
pub mod moisture;
pub mod patch;
pub mod query;
pub mod search;
pub mod snapshot;

mod occupancy;
mod resources;
mod tree;

pub use cell::{Animal, CellId, CellKind, LeafContents, ResourceSource, TerrainCell};
pub use checkpoint::{CheckpointFormat, CompressedCheckpoint, JsonCheckpoint};
pub use config::TreeConfig;
pub use error::{CheckpointError, ConfigError, SnapshotError, TerrainError};
pub use geometry::{make_box, make_sphere, Aabb, CellCoverage, Point, Shape, Sphere, TreePoint};
pub use habitat::{HabitatDomain, HabitatSlot, HabitatSpecies};
pub use moisture::{HumidityDynamics, MoistureId, MoistureSlot, MoistureSource, MoistureTable};
pub use occupancy::PopulationCensus;
pub use patch::{ContentKind, Patch, PatchContent, ResourcePatch};
pub use query::{NeighbourCell, QueryStats, ResourceHit};
pub use search::{ResourceFilter, SearchFilter, SearchParams, SpeciesProfile, SpeciesRegistry};
pub use snapshot::{CellRecord, TreeSnapshot};
pub use tree::{MoistureSummary, PlanarTree, SpatialTree, VolumetricTree};
