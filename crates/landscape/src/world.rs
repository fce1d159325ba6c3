//! Builds a spatial tree from a world file and drives it through its timesteps.

use crate::config::{to_point, AppConfig, CheckpointSettings, DietSettings};
use landscape_tree::geometry::random_point_in_shape;
use landscape_tree::{
    Animal, CompressedCheckpoint, ConfigError, JsonCheckpoint, Patch, Point, PopulationCensus, QueryStats,
    ResourceFilter, SearchFilter, SearchParams, Shape, SpatialTree, SpeciesRegistry, TerrainError,
};
use landscape_types::{AnimalKey, AnimalSpeciesId, Gender, Instar, LifeStage, OccupantId, ResourceSpeciesId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Draws per occupant before it is given up on
const MAX_PLACEMENT_ATTEMPTS: usize = 100;

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub dimensions: usize,
    pub cells: usize,
    pub patches_applied: usize,
    pub occupants_placed: usize,
    pub occupants_rejected: usize,
    pub timesteps: u32,
    pub biomass_grazed: f64,
    pub census: PopulationCensus,
    pub queries: Vec<QueryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub center: Vec<f64>,
    pub radius: f64,
    pub occupants: usize,
    pub resources: BTreeMap<ResourceSpeciesId, f64>,
    pub stats: QueryStats,
}

/// Runs the world in the dimension it declares
pub fn run(config: &AppConfig) -> Result<RunReport, Box<dyn Error>> {
    match config.world.dimensions {
        2 => Simulation::<2>::build(config)?.run(),
        3 => Simulation::<3>::build(config)?.run(),
        other => Err(ConfigError::UnsupportedDimension(other).into()),
    }
}

pub(crate) struct Simulation<'a, const D: usize> {
    config: &'a AppConfig,
    tree: SpatialTree<D>,
    registry: SpeciesRegistry,
    diets: HashMap<AnimalSpeciesId, &'a DietSettings>,
    rng: StdRng,
    patches_applied: usize,
    occupants_placed: usize,
    occupants_rejected: usize,
    biomass_grazed: f64,
}

impl<'a, const D: usize> Simulation<'a, D> {
    pub(crate) fn build(config: &'a AppConfig) -> Result<Self, Box<dyn Error>> {
        let mut registry = SpeciesRegistry::new();
        let mut diets = HashMap::new();
        for species in &config.species {
            let id = AnimalSpeciesId(species.id);
            registry.register_animal(id, species.name.as_str(), species.instars, &species.genders);
            if let Some(diet) = &species.diet {
                diets.insert(id, diet);
            }
        }
        for resource in &config.resource_species {
            registry.register_resource(ResourceSpeciesId(resource.id), resource.name.as_str());
        }

        let mut simulation = Self {
            config,
            tree: SpatialTree::new(config.world.tree_config())?,
            registry,
            diets,
            rng: StdRng::seed_from_u64(config.world.seed),
            patches_applied: 0,
            occupants_placed: 0,
            occupants_rejected: 0,
            biomass_grazed: 0.0,
        };
        simulation.apply_patches()?;
        simulation.place_occupants()?;

        info!(
            "🗺️ Built {}D world: {} cells, {}/{} patches changed the terrain, {} occupants placed",
            D,
            simulation.tree.cell_count(),
            simulation.patches_applied,
            config.patches.len(),
            simulation.occupants_placed
        );
        Ok(simulation)
    }

    fn apply_patches(&mut self) -> Result<(), Box<dyn Error>> {
        let config = self.config;
        for settings in &config.patches {
            let patch = Patch::new(settings.priority, settings.shape.to_shape::<D>()?, settings.content.clone());
            if self.tree.apply_patch(&patch) {
                self.patches_applied += 1;
            }
        }
        Ok(())
    }

    fn place_occupants(&mut self) -> Result<(), Box<dyn Error>> {
        let config = self.config;
        for group in &config.occupants {
            let region = match &group.region {
                Some(region) => region.to_shape::<D>()?,
                None => Shape::Box(self.tree.domain()),
            };
            let species = AnimalSpeciesId(group.species);
            let genders = self.registry.genders_of(species);

            let mut rejected = 0;
            for _ in 0..group.count {
                let gender = match group.gender {
                    Some(gender) => gender,
                    None => genders.choose(&mut self.rng).copied().unwrap_or(Gender::Hermaphrodite),
                };
                let key = AnimalKey::new(group.life_stage, species, Instar(group.instar), gender);
                if self.place_one(&region, key, group.biomass)? {
                    self.occupants_placed += 1;
                } else {
                    rejected += 1;
                }
            }
            if rejected > 0 {
                warn!(
                    "⚠️ Could not place {} of {} occupants of {}: region is blocked by obstacles",
                    rejected, group.count, species
                );
                self.occupants_rejected += rejected;
            }
        }
        Ok(())
    }

    fn place_one(&mut self, region: &Shape<D>, key: AnimalKey, biomass: f64) -> Result<bool, TerrainError> {
        let id = OccupantId(Uuid::from_u128(self.rng.gen()));
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let position = random_point_in_shape(region, &mut self.rng);
            match self.tree.insert_occupant(Animal::with_id(id, position, key, biomass)) {
                Ok(_) => return Ok(true),
                Err(TerrainError::ObstacleCell { .. } | TerrainError::OutsideDomain { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }

    /// One timestep: moisture and resources advance, then every active
    /// occupant grazes and takes a random step
    pub(crate) fn step(&mut self, timestep: u32) -> Result<(), TerrainError> {
        self.tree.advance_timestep(timestep);

        let mut active: Vec<(OccupantId, AnimalSpeciesId, Point<D>, f64)> = self
            .tree
            .leaves()
            .filter_map(|leaf| self.tree.cell(leaf).contents())
            .flat_map(|contents| contents.animals())
            .filter(|animal| animal.life_stage() == LifeStage::Active)
            .map(|animal| (animal.id(), animal.species(), *animal.position(), animal.biomass()))
            .collect();
        active.sort_by_key(|(id, ..)| *id);

        let mut grazed = 0.0;
        let mut blocked = 0usize;
        for (id, species, position, biomass) in active {
            if let Some(diet) = self.diets.get(&species) {
                let eaten = self.tree.consume_resource_in_radius(
                    &position,
                    diet.forage_radius,
                    ResourceSpeciesId(diet.resource),
                    diet.intake,
                );
                if eaten > 0.0 {
                    self.tree.set_occupant_biomass(id, biomass + eaten)?;
                    grazed += eaten;
                }
            }

            let Some(target) = self.random_step(&position) else {
                continue;
            };
            match self.tree.move_occupant(id, target) {
                Ok(_) => {}
                Err(TerrainError::ObstacleCell { .. } | TerrainError::OutsideDomain { .. }) => blocked += 1,
                Err(e) => return Err(e),
            }
        }

        self.biomass_grazed += grazed;
        debug!(
            "🐾 Timestep {}: grazed {:.3} biomass, {} moves blocked",
            timestep, grazed, blocked
        );
        Ok(())
    }

    fn random_step(&mut self, from: &Point<D>) -> Option<Point<D>> {
        let step_length = self.config.world.step_length;
        if step_length <= 0.0 {
            return None;
        }
        let mut direction = [0.0; D];
        for value in direction.iter_mut() {
            *value = self.rng.gen_range(-1.0..=1.0);
        }
        let norm = direction.iter().map(|value| value * value).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }

        let mut coords = *from.coords();
        for (value, delta) in coords.iter_mut().zip(direction) {
            *value += delta / norm * step_length;
        }
        Some(Point::new(coords))
    }

    fn run_queries(&self) -> Result<Vec<QueryReport>, Box<dyn Error>> {
        let mut reports = Vec::with_capacity(self.config.queries.len());
        for query in &self.config.queries {
            let center = to_point::<D>(&query.center)?;

            let params = SearchParams {
                life_stages: query.life_stages.clone(),
                species: query
                    .species
                    .as_ref()
                    .map(|ids| ids.iter().copied().map(AnimalSpeciesId).collect()),
                ..SearchParams::all()
            };
            let mut filter = SearchFilter::new();
            filter.add_search_params(&params, &self.registry);
            let (found, stats) = self.tree.query_radius_with_stats(&center, query.radius, &filter);

            let resource_ids: Option<Vec<ResourceSpeciesId>> = query
                .resource_species
                .as_ref()
                .map(|ids| ids.iter().copied().map(ResourceSpeciesId).collect());
            let mut resource_filter = ResourceFilter::new();
            resource_filter.add_species(resource_ids.as_deref(), &self.registry);
            let mut resources = BTreeMap::new();
            for hit in self.tree.query_resources_in_radius(&center, query.radius, &resource_filter) {
                *resources.entry(hit.species).or_insert(0.0) += hit.available_biomass;
            }

            info!(
                "🔍 Query at {:?} r={}: {} occupants, {} resource species, {} cells visited, {} pruned",
                query.center,
                query.radius,
                found.len(),
                resources.len(),
                stats.cells_visited,
                stats.cells_pruned
            );
            reports.push(QueryReport {
                center: query.center.clone(),
                radius: query.radius,
                occupants: found.len(),
                resources,
                stats,
            });
        }
        Ok(reports)
    }

    fn write_checkpoint(&self, settings: &CheckpointSettings) -> Result<PathBuf, Box<dyn Error>> {
        let path = PathBuf::from(&settings.path);
        let mut writer = BufWriter::new(File::create(&path)?);
        if settings.compressed {
            self.tree.write_checkpoint::<CompressedCheckpoint, _>(&mut writer)?;
        } else {
            self.tree.write_checkpoint::<JsonCheckpoint, _>(&mut writer)?;
        }
        writer.flush()?;
        info!("💾 Checkpoint written to {}", path.display());
        Ok(path)
    }

    pub(crate) fn run(mut self) -> Result<RunReport, Box<dyn Error>> {
        let timesteps = self.config.world.timesteps;
        for timestep in 1..=timesteps {
            self.step(timestep)?;
        }

        let queries = self.run_queries()?;
        let census = self.tree.obtain_aggregate_population();
        for (species, life_stage, count) in census.iter() {
            info!("📊 {} {:?}: {}", species, life_stage, count);
        }
        let checkpoint = match &self.config.checkpoint {
            Some(settings) => Some(self.write_checkpoint(settings)?),
            None => None,
        };

        Ok(RunReport {
            dimensions: D,
            cells: self.tree.cell_count(),
            patches_applied: self.patches_applied,
            occupants_placed: self.occupants_placed,
            occupants_rejected: self.occupants_rejected,
            timesteps,
            biomass_grazed: self.biomass_grazed,
            census,
            queries,
            checkpoint,
        })
    }
}
