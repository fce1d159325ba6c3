//! Moisture sources and the table that owns them.
//!
//! A moisture patch contributes one [`MoistureSource`] to the tree's table.
//! Cells only hold a [`MoistureSlot`] pointing into the table, so every cell
//! reached by the same patch reads the same value and the table entry is
//! refreshed exactly once per timestep.

use landscape_types::Priority;
use serde::{Deserialize, Serialize};

/// Index of a source in the [`MoistureTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoistureId(pub(crate) usize);

impl MoistureId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Per-cell reference to a moisture source together with the patch priority
/// that put it there. `sequence` orders applications so equal priorities
/// resolve to the earliest patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoistureSlot {
    pub source: MoistureId,
    pub priority: Priority,
    pub sequence: u64,
}

/// How relative humidity evolves between timesteps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HumidityDynamics {
    Constant,
    /// Repeats `values`, one per timestep
    Cycle { values: Vec<f64> },
    /// Jumps to `humidity_on_rain_event` every `timesteps_between_rain_events`
    /// steps and otherwise decays linearly, never below zero
    RainEventAndDecay {
        humidity_on_rain_event: f64,
        timesteps_between_rain_events: u32,
        decay_per_timestep: f64,
    },
}

/// Owned moisture state shared by every cell that references it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureSource {
    pub temperature: f64,
    pub relative_humidity: f64,
    /// Resource biomass that one unit of area (or volume) can carry
    pub max_resource_capacity_density: f64,
    pub in_enemy_free_space: bool,
    pub in_competitor_free_space: bool,
    /// Looping temperature sequence; empty keeps the temperature constant
    #[serde(default)]
    pub temperature_cycle: Vec<f64>,
    pub humidity: HumidityDynamics,
}

impl MoistureSource {
    /// Source whose state never changes
    pub fn constant(temperature: f64, relative_humidity: f64, max_resource_capacity_density: f64) -> Self {
        Self {
            temperature,
            relative_humidity,
            max_resource_capacity_density,
            in_enemy_free_space: false,
            in_competitor_free_space: false,
            temperature_cycle: Vec::new(),
            humidity: HumidityDynamics::Constant,
        }
    }

    pub fn is_on_rain_event(&self, timestep: u32) -> bool {
        match &self.humidity {
            HumidityDynamics::RainEventAndDecay {
                timesteps_between_rain_events,
                ..
            } => *timesteps_between_rain_events != 0 && timestep % timesteps_between_rain_events == 0,
            _ => false,
        }
    }

    /// Advances temperature and humidity to `timestep`
    pub fn update(&mut self, timestep: u32) {
        if !self.temperature_cycle.is_empty() {
            self.temperature = self.temperature_cycle[timestep as usize % self.temperature_cycle.len()];
        }

        let on_rain_event = self.is_on_rain_event(timestep);
        match &self.humidity {
            HumidityDynamics::Constant => {}
            HumidityDynamics::Cycle { values } => {
                if !values.is_empty() {
                    self.relative_humidity = values[timestep as usize % values.len()];
                }
            }
            HumidityDynamics::RainEventAndDecay {
                humidity_on_rain_event,
                decay_per_timestep,
                ..
            } => {
                self.relative_humidity = if on_rain_event {
                    *humidity_on_rain_event
                } else {
                    (self.relative_humidity - decay_per_timestep).max(0.0)
                };
            }
        }
    }

    /// Resource capacity this source grants to a cell of the given measure
    pub fn capacity_for(&self, cell_measure: f64) -> f64 {
        self.max_resource_capacity_density * cell_measure
    }
}

/// Owner of every moisture source placed in the tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoistureTable {
    sources: Vec<MoistureSource>,
}

impl MoistureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_sources(sources: Vec<MoistureSource>) -> Self {
        Self { sources }
    }

    pub(crate) fn push(&mut self, source: MoistureSource) -> MoistureId {
        self.sources.push(source);
        MoistureId(self.sources.len() - 1)
    }

    /// Keeps the sources flagged in `referenced`, preserving their order.
    /// Returns the new id of every old entry, `None` for dropped ones.
    pub(crate) fn retain_referenced(&mut self, referenced: &[bool]) -> Vec<Option<MoistureId>> {
        let mut remap = Vec::with_capacity(self.sources.len());
        let mut kept = 0;
        let mut index = 0;
        self.sources.retain(|_| {
            let keep = referenced.get(index).copied().unwrap_or(false);
            index += 1;
            if keep {
                remap.push(Some(MoistureId(kept)));
                kept += 1;
            } else {
                remap.push(None);
            }
            keep
        });
        remap
    }

    pub fn get(&self, id: MoistureId) -> Option<&MoistureSource> {
        self.sources.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[MoistureSource] {
        &self.sources
    }

    /// Single writer per timestep: each source is updated once, however many cells read it
    pub(crate) fn update_all(&mut self, timestep: u32) {
        for source in &mut self.sources {
            source.update(timestep);
        }
    }
}
