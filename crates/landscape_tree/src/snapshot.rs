//! Save and restore hooks.
//!
//! Cells are recorded by value in arena order. Moisture slots keep their
//! table index, and the table travels alongside, so shared moisture is
//! rebuilt by restoring the table first and resolving indices afterwards.

use crate::cell::{Animal, CellId, ResourceSource};
use crate::config::TreeConfig;
use crate::error::SnapshotError;
use crate::geometry::TreePoint;
use crate::habitat::HabitatSlot;
use crate::moisture::{MoistureSlot, MoistureSource, MoistureTable};
use crate::tree::SpatialTree;
use landscape_types::{Priority, ResourceSpeciesId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything needed to rebuild a tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot<const D: usize> {
    pub dimensions: usize,
    pub config: TreeConfig,
    pub sequence: u64,
    pub moisture_sources: Vec<MoistureSource>,
    pub cells: Vec<CellRecord<D>>,
}

/// Own content of one cell; aggregates are recomputed on restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord<const D: usize> {
    pub position: TreePoint<D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<MoistureSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habitat: Option<HabitatSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_priorities: Vec<(ResourceSpeciesId, Priority)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animals: Vec<Animal<D>>,
}

impl<const D: usize> SpatialTree<D> {
    pub fn save(&self) -> TreeSnapshot<D> {
        let cells = self
            .cells
            .iter()
            .map(|cell| {
                let (resources, animals) = match cell.contents() {
                    Some(contents) => (
                        contents.resources().cloned().collect(),
                        contents.animals().cloned().collect(),
                    ),
                    None => (Vec::new(), Vec::new()),
                };
                CellRecord {
                    position: *cell.position(),
                    obstacle: cell.obstacle,
                    moisture: cell.moisture,
                    habitat: cell.habitat.clone(),
                    resource_priorities: cell
                        .resource_priorities
                        .iter()
                        .map(|(&species, &priority)| (species, priority))
                        .collect(),
                    resources,
                    animals,
                }
            })
            .collect();

        TreeSnapshot {
            dimensions: D,
            config: self.config,
            sequence: self.sequence,
            moisture_sources: self.moisture.sources().to_vec(),
            cells,
        }
    }

    /// Rebuilds a tree from a snapshot, recomputing every aggregate
    pub fn restore(snapshot: TreeSnapshot<D>) -> Result<Self, SnapshotError> {
        if snapshot.dimensions != D {
            return Err(SnapshotError::DimensionMismatch {
                expected: D,
                found: snapshot.dimensions,
            });
        }
        let mut tree = SpatialTree::new(snapshot.config)?;
        if snapshot.cells.len() != tree.cells.len() {
            return Err(SnapshotError::CellCountMismatch {
                expected: tree.cells.len(),
                found: snapshot.cells.len(),
            });
        }

        let table_len = snapshot.moisture_sources.len();
        tree.moisture = MoistureTable::from_sources(snapshot.moisture_sources);
        tree.sequence = snapshot.sequence;

        let mut occupants = Vec::new();
        for (index, record) in snapshot.cells.into_iter().enumerate() {
            let cell = &mut tree.cells[index];
            if record.position != *cell.position() {
                return Err(SnapshotError::StructureMismatch { index });
            }
            if !cell.is_leaf() && (!record.resources.is_empty() || !record.animals.is_empty()) {
                return Err(SnapshotError::ContentOnBranch { index });
            }
            if let Some(slot) = record.moisture {
                if slot.source.index() >= table_len {
                    return Err(SnapshotError::DanglingMoisture {
                        index,
                        source_index: slot.source.index(),
                        table_len,
                    });
                }
            }

            cell.obstacle = record.obstacle;
            cell.moisture = record.moisture;
            cell.habitat = record.habitat;
            cell.resource_priorities = record.resource_priorities.into_iter().collect();
            for source in record.resources {
                tree.set_leaf_resource(CellId(index), source);
            }
            occupants.extend(record.animals.into_iter().map(|animal| (index, animal)));
        }

        tree.recount_obstacles();
        for (index, animal) in occupants {
            if tree.locate(animal.position()) != Some(CellId(index)) {
                return Err(SnapshotError::MisplacedOccupant {
                    index,
                    occupant: animal.id(),
                });
            }
            tree.restore_occupant(CellId(index), animal)?;
        }
        tree.prune_moisture_sources();

        info!(
            "📦 Restored {}D spatial tree: {} cells, {} moisture sources, {} occupants",
            D,
            tree.cells.len(),
            tree.moisture.len(),
            tree.occupant_count()
        );
        Ok(tree)
    }

    /// Children follow their parent in the arena, so a reverse sweep sees
    /// every child before its parent
    fn recount_obstacles(&mut self) {
        for index in (0..self.cells.len()).rev() {
            let id = CellId(index);
            let count = if self.cells[index].obstacle.is_some() {
                self.leaves_in_subtree(id)
            } else {
                self.cells[index]
                    .children()
                    .iter()
                    .map(|child| self.cells[child.0].obstacle_leaves)
                    .sum()
            };
            self.cells[index].obstacle_leaves = count;
        }
    }
}
