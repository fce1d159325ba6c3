//! World file loading and validation.
//!
//! The world file is TOML. A missing file is replaced by the default world,
//! which is also written to disk so it can be edited.

use landscape_tree::{Aabb, PatchContent, Point, Shape, TreeConfig};
use landscape_types::{Gender, LifeStage, Priority};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_dimensions() -> usize {
    2
}

fn default_timesteps() -> u32 {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_instars() -> u32 {
    1
}

fn default_genders() -> Vec<Gender> {
    Gender::ALL.to_vec()
}

fn default_life_stage() -> LifeStage {
    LifeStage::Active
}

fn default_biomass() -> f64 {
    1.0
}

fn default_step_length() -> f64 {
    1.0
}

fn default_compressed() -> bool {
    true
}

/// Complete world description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub world: WorldSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub species: Vec<SpeciesSettings>,
    #[serde(default)]
    pub resource_species: Vec<ResourceSpeciesSettings>,
    #[serde(default)]
    pub patches: Vec<PatchSettings>,
    #[serde(default)]
    pub occupants: Vec<OccupantSettings>,
    #[serde(default)]
    pub queries: Vec<QuerySettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<CheckpointSettings>,
}

/// Domain shape and run length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// 2 or 3
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    pub root_size: f64,
    pub cells_per_axis: u32,
    pub min_cell_size: f64,
    #[serde(default = "default_timesteps")]
    pub timesteps: u32,
    /// Seed for occupant placement and movement
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Length of each occupant's random step per timestep
    #[serde(default = "default_step_length")]
    pub step_length: f64,
}

impl WorldSettings {
    pub fn tree_config(&self) -> TreeConfig {
        TreeConfig::new(self.root_size, self.cells_per_axis, self.min_cell_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSettings {
    pub id: u32,
    pub name: String,
    #[serde(default = "default_instars")]
    pub instars: u32,
    #[serde(default = "default_genders")]
    pub genders: Vec<Gender>,
    /// Active occupants of the species graze once per timestep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet: Option<DietSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietSettings {
    pub resource: u32,
    /// Biomass wanted per timestep
    pub intake: f64,
    pub forage_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpeciesSettings {
    pub id: u32,
    pub name: String,
}

/// Patch shape as written in the world file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSettings {
    Box { min: Vec<f64>, max: Vec<f64> },
    /// Planar worlds only
    Polygon { vertices: Vec<[f64; 2]> },
    /// Planar worlds only
    Circle { center: Vec<f64>, radius: f64 },
}

impl ShapeSettings {
    fn check(&self, dimensions: usize) -> Result<(), String> {
        match self {
            ShapeSettings::Box { min, max } => {
                check_coords("box min", min, dimensions)?;
                check_coords("box max", max, dimensions)?;
                if min.iter().zip(max).any(|(low, high)| low > high) {
                    return Err(format!("Box min {min:?} exceeds max {max:?}"));
                }
                Ok(())
            }
            ShapeSettings::Polygon { vertices } => {
                if dimensions != 2 {
                    return Err("Polygon shapes are only supported in 2D worlds".to_string());
                }
                if vertices.len() < 3 {
                    return Err(format!("Polygon needs at least 3 vertices, got {}", vertices.len()));
                }
                Ok(())
            }
            ShapeSettings::Circle { center, radius } => {
                if dimensions != 2 {
                    return Err("Circle shapes are only supported in 2D worlds".to_string());
                }
                check_coords("circle center", center, dimensions)?;
                if !radius.is_finite() || *radius <= 0.0 {
                    return Err(format!("Circle radius must be positive, got {radius}"));
                }
                Ok(())
            }
        }
    }

    /// Builds the library shape. The settings must have passed validation.
    pub fn to_shape<const D: usize>(&self) -> Result<Shape<D>, String> {
        match self {
            ShapeSettings::Box { min, max } => Ok(Shape::Box(Aabb::new(to_point(min)?, to_point(max)?))),
            ShapeSettings::Polygon { vertices } => Ok(Shape::polygon(vertices)),
            ShapeSettings::Circle { center, radius } => {
                Ok(Shape::circle(&landscape_tree::make_sphere(to_point(center)?, *radius)))
            }
        }
    }
}

pub fn to_point<const D: usize>(coords: &[f64]) -> Result<Point<D>, String> {
    let coords: [f64; D] = coords
        .try_into()
        .map_err(|_| format!("Expected {} coordinates, got {}", D, coords.len()))?;
    Ok(Point::new(coords))
}

fn check_coords(what: &str, coords: &[f64], dimensions: usize) -> Result<(), String> {
    if coords.len() != dimensions {
        return Err(format!(
            "{what} has {} coordinates, the world has {dimensions} dimensions",
            coords.len()
        ));
    }
    if coords.iter().any(|value| !value.is_finite()) {
        return Err(format!("{what} has non-finite coordinates: {coords:?}"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSettings {
    pub priority: Priority,
    pub shape: ShapeSettings,
    pub content: PatchContent,
}

/// A group of identical occupants scattered at random
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupantSettings {
    pub species: u32,
    pub count: usize,
    #[serde(default = "default_life_stage")]
    pub life_stage: LifeStage,
    #[serde(default = "default_instars")]
    pub instar: u32,
    /// Drawn from the species' genders when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default = "default_biomass")]
    pub biomass: f64,
    /// Placement area; the whole domain when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<ShapeSettings>,
}

/// Radius query run after the last timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySettings {
    pub center: Vec<f64>,
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_stages: Option<Vec<LifeStage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<Vec<u32>>,
    /// Resource species to total up; every registered one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_species: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSettings {
    pub path: String,
    #[serde(default = "default_compressed")]
    pub compressed: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        use landscape_tree::{HumidityDynamics, MoistureSource, ResourcePatch};
        use landscape_types::ResourceSpeciesId;

        let moisture = MoistureSource {
            humidity: HumidityDynamics::RainEventAndDecay {
                humidity_on_rain_event: 0.95,
                timesteps_between_rain_events: 7,
                decay_per_timestep: 0.05,
            },
            ..MoistureSource::constant(18.0, 0.7, 4.0)
        };
        let grass = ResourcePatch {
            initial_biomass_fraction: 0.5,
            edible_fraction: 0.8,
            growth_rate: 0.1,
            ..ResourcePatch::new(ResourceSpeciesId(1), 2.0)
        };

        Self {
            world: WorldSettings {
                dimensions: default_dimensions(),
                root_size: 64.0,
                cells_per_axis: 64,
                min_cell_size: 1.0,
                timesteps: default_timesteps(),
                seed: default_seed(),
                step_length: default_step_length(),
            },
            logging: LoggingSettings::default(),
            species: vec![SpeciesSettings {
                id: 1,
                name: "ground beetle".to_string(),
                instars: 3,
                genders: vec![Gender::Male, Gender::Female],
                diet: Some(DietSettings {
                    resource: 1,
                    intake: 0.05,
                    forage_radius: 1.5,
                }),
            }],
            resource_species: vec![ResourceSpeciesSettings {
                id: 1,
                name: "grass".to_string(),
            }],
            patches: vec![
                PatchSettings {
                    priority: 1,
                    shape: ShapeSettings::Box {
                        min: vec![0.0, 0.0],
                        max: vec![64.0, 64.0],
                    },
                    content: PatchContent::Moisture(moisture),
                },
                PatchSettings {
                    priority: 1,
                    shape: ShapeSettings::Circle {
                        center: vec![40.0, 40.0],
                        radius: 6.0,
                    },
                    content: PatchContent::Obstacle,
                },
                PatchSettings {
                    priority: 1,
                    shape: ShapeSettings::Box {
                        min: vec![0.0, 0.0],
                        max: vec![32.0, 64.0],
                    },
                    content: PatchContent::Resource(grass),
                },
            ],
            occupants: vec![OccupantSettings {
                species: 1,
                count: 200,
                life_stage: default_life_stage(),
                instar: 1,
                gender: None,
                biomass: default_biomass(),
                region: None,
            }],
            queries: vec![QuerySettings {
                center: vec![16.0, 16.0],
                radius: 8.0,
                life_stages: None,
                species: None,
                resource_species: None,
            }],
            checkpoint: None,
        }
    }
}

impl AppConfig {
    /// Loads the world file, writing the default world first when it does not exist
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, toml_content)?;
            info!("Created default world file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks the world for consistency before anything is built
    pub fn validate(&self) -> Result<(), String> {
        let dimensions = self.world.dimensions;
        self.world
            .tree_config()
            .validate(dimensions)
            .map_err(|e| e.to_string())?;
        if !self.world.step_length.is_finite() || self.world.step_length < 0.0 {
            return Err(format!("Step length must be non-negative, got {}", self.world.step_length));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        for (index, patch) in self.patches.iter().enumerate() {
            patch
                .shape
                .check(dimensions)
                .map_err(|e| format!("Patch {index}: {e}"))?;
            if let PatchContent::Resource(resource) = &patch.content {
                if !self.resource_species.iter().any(|species| species.id == resource.species.0) {
                    return Err(format!(
                        "Patch {index}: resource species {} is not registered",
                        resource.species
                    ));
                }
            }
            if let PatchContent::HabitatDomain(domain) = &patch.content {
                for entry in &domain.species {
                    let Some(species) = self.species.iter().find(|species| species.id == entry.species.0) else {
                        return Err(format!("Patch {index}: habitat species {} is not registered", entry.species.0));
                    };
                    if let Some(instar) = entry.instars.iter().find(|instar| instar.0 == 0 || instar.0 > species.instars) {
                        return Err(format!(
                            "Patch {index}: habitat instar {} outside 1..={}",
                            instar.0, species.instars
                        ));
                    }
                }
            }
        }

        for species in &self.species {
            if species.instars == 0 {
                return Err(format!("Species {} must have at least one instar", species.id));
            }
            if species.genders.is_empty() {
                return Err(format!("Species {} must list at least one gender", species.id));
            }
            if let Some(diet) = &species.diet {
                if !self.resource_species.iter().any(|resource| resource.id == diet.resource) {
                    return Err(format!(
                        "Species {}: diet resource {} is not registered",
                        species.id, diet.resource
                    ));
                }
                if !(diet.intake >= 0.0 && diet.forage_radius >= 0.0) {
                    return Err(format!("Species {}: diet intake and radius must be non-negative", species.id));
                }
            }
        }

        for (index, group) in self.occupants.iter().enumerate() {
            let Some(species) = self.species.iter().find(|species| species.id == group.species) else {
                return Err(format!("Occupant group {index}: species {} is not registered", group.species));
            };
            if group.instar == 0 || group.instar > species.instars {
                return Err(format!(
                    "Occupant group {index}: instar {} outside 1..={}",
                    group.instar, species.instars
                ));
            }
            if let Some(region) = &group.region {
                region.check(dimensions).map_err(|e| format!("Occupant group {index}: {e}"))?;
            }
        }

        for (index, query) in self.queries.iter().enumerate() {
            check_coords("query center", &query.center, dimensions).map_err(|e| format!("Query {index}: {e}"))?;
            if !query.radius.is_finite() || query.radius < 0.0 {
                return Err(format!("Query {index}: radius must be non-negative, got {}", query.radius));
            }
        }

        if let Some(checkpoint) = &self.checkpoint {
            if checkpoint.path.is_empty() {
                return Err("Checkpoint path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}
