use crate::cell::CellId;
use crate::geometry::{make_sphere, sphere_coverage_percent, Point};
use crate::search::ResourceFilter;
use crate::tree::SpatialTree;
use landscape_types::ResourceSpeciesId;
use serde::Serialize;

/// Resource of one species in one leaf reached by a radius query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceHit {
    pub cell: CellId,
    pub species: ResourceSpeciesId,
    /// Available biomass scaled by `coverage`
    pub available_biomass: f64,
    /// Share of the leaf inside the query sphere
    pub coverage: f64,
}

impl<const D: usize> SpatialTree<D> {
    /// Edible biomass per leaf and species within `radius` of `point`
    pub fn query_resources_in_radius(
        &self,
        point: &Point<D>,
        radius: f64,
        filter: &ResourceFilter,
    ) -> Vec<ResourceHit> {
        if filter.is_empty() {
            return Vec::new();
        }
        let sphere = make_sphere(*point, radius);
        let mut hits = Vec::new();
        for leaf in self.touched_leaves(&sphere) {
            let Some(contents) = self.cells[leaf.0].contents() else {
                continue;
            };
            let mut matching = contents.resources().filter(|source| filter.matches(source.species())).peekable();
            if matching.peek().is_none() {
                continue;
            }
            let coverage = sphere_coverage_percent(&sphere, self.cells[leaf.0].effective_area());
            if coverage <= 0.0 {
                continue;
            }
            hits.extend(matching.map(|source| ResourceHit {
                cell: leaf,
                species: source.species(),
                available_biomass: source.available_biomass() * coverage,
                coverage,
            }));
        }
        hits
    }

    /// Sum of [`ResourceHit::available_biomass`] for one species
    pub fn available_resource_in_radius(&self, point: &Point<D>, radius: f64, species: ResourceSpeciesId) -> f64 {
        self.query_resources_in_radius(point, radius, &ResourceFilter::only(species))
            .iter()
            .map(|hit| hit.available_biomass)
            .sum()
    }
}
