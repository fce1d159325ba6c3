use super::QueryStats;
use crate::cell::{Animal, CellId};
use crate::geometry::{make_sphere, Point, Sphere};
use crate::search::SearchFilter;
use crate::tree::SpatialTree;

impl<const D: usize> SpatialTree<D> {
    /// Occupants within `radius` of `point` whose category passes `filter`.
    ///
    /// Order is unspecified. A filter that was never widened matches nothing.
    pub fn query_radius(&self, point: &Point<D>, radius: f64, filter: &SearchFilter) -> Vec<&Animal<D>> {
        self.query_radius_with_stats(point, radius, filter).0
    }

    pub fn query_radius_with_stats(
        &self,
        point: &Point<D>,
        radius: f64,
        filter: &SearchFilter,
    ) -> (Vec<&Animal<D>>, QueryStats) {
        let mut found = Vec::new();
        let mut stats = QueryStats::default();
        if filter.is_empty() {
            return (found, stats);
        }
        let sphere = make_sphere(*point, radius);
        self.collect_in_sphere(self.root(), &sphere, filter, &mut found, &mut stats);
        (found, stats)
    }

    fn collect_in_sphere<'a>(
        &'a self,
        id: CellId,
        sphere: &Sphere<D>,
        filter: &SearchFilter,
        found: &mut Vec<&'a Animal<D>>,
        stats: &mut QueryStats,
    ) {
        stats.cells_visited += 1;
        let cell = &self.cells[id.0];
        if cell.occupant_count() == 0 || !sphere.intersects_box(cell.effective_area()) {
            stats.cells_pruned += 1;
            return;
        }
        if sphere.covers_box(cell.effective_area()) {
            stats.cells_fully_collected += 1;
            self.collect_matching(id, filter, found);
            return;
        }

        match cell.contents() {
            Some(contents) => {
                for (key, bucket) in contents.buckets() {
                    if !filter.matches_key(key) {
                        continue;
                    }
                    for animal in bucket {
                        stats.distance_tests += 1;
                        if sphere.contains_point(animal.position()) {
                            found.push(animal);
                        }
                    }
                }
            }
            None => {
                for &child in cell.children() {
                    self.collect_in_sphere(child, sphere, filter, found, stats);
                }
            }
        }
    }

    /// Every matching occupant of a subtree, no geometric test
    fn collect_matching<'a>(&'a self, id: CellId, filter: &SearchFilter, found: &mut Vec<&'a Animal<D>>) {
        let cell = &self.cells[id.0];
        if cell.occupant_count() == 0 {
            return;
        }
        match cell.contents() {
            Some(contents) => found.extend(
                contents
                    .buckets()
                    .filter(|(key, _)| filter.matches_key(key))
                    .flat_map(|(_, bucket)| bucket.iter()),
            ),
            None => {
                for &child in cell.children() {
                    self.collect_matching(child, filter, found);
                }
            }
        }
    }
}
