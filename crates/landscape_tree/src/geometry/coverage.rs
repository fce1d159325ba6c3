use super::shape::box_polygon;
use super::{intersect, measure, Aabb, Shape, Sphere, COVERAGE_EPSILON};
use geo::{Area, BooleanOps};
use serde::{Deserialize, Serialize};

/// How much of a cell's effective area a shape occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellCoverage {
    None,
    Partial,
    /// At least half of the cell, but not all of it
    MajorityPartial,
    Full,
}

impl CellCoverage {
    pub fn is_partial(&self) -> bool {
        matches!(self, CellCoverage::Partial | CellCoverage::MajorityPartial)
    }
}

/// Ratio of the intersection measure to the cell measure, clamped to `[0, 1]`
/// and snapped to exactly 1 within [`COVERAGE_EPSILON`].
pub fn coverage_percent<const D: usize>(intersection: Option<&Shape<D>>, cell_measure: f64) -> f64 {
    let Some(shape) = intersection else {
        return 0.0;
    };
    if cell_measure <= 0.0 {
        return 0.0;
    }
    snap_percent(measure(shape) / cell_measure)
}

pub fn classify_coverage(percent: f64) -> CellCoverage {
    if percent >= 1.0 - COVERAGE_EPSILON {
        CellCoverage::Full
    } else if percent >= 0.5 {
        CellCoverage::MajorityPartial
    } else if percent > 0.0 {
        CellCoverage::Partial
    } else {
        CellCoverage::None
    }
}

/// Coverage classification and percentage of `cell` by `shape`
pub fn cell_coverage<const D: usize>(shape: &Shape<D>, cell: &Aabb<D>) -> (CellCoverage, f64) {
    if let Shape::Box(area) = shape {
        if area.contains_box(cell) {
            return (CellCoverage::Full, 1.0);
        }
    }
    let cell_shape = Shape::Box(*cell);
    let overlap = intersect(shape, &cell_shape);
    let percent = coverage_percent(overlap.as_ref(), cell.measure());
    (classify_coverage(percent), percent)
}

/// Fraction of `cell` inside the sphere.
///
/// Exact bounds are used first; in the plane the remainder is measured against
/// the circle polygon, otherwise the cell is sampled on a regular grid.
pub fn sphere_coverage_percent<const D: usize>(sphere: &Sphere<D>, cell: &Aabb<D>) -> f64 {
    if !sphere.intersects_box(cell) {
        return 0.0;
    }
    if sphere.covers_box(cell) {
        return 1.0;
    }
    if cell.measure() <= 0.0 {
        return 0.0;
    }
    if D == 2 {
        let overlap = sphere.to_polygon().intersection(&box_polygon(cell));
        return snap_percent(overlap.unsigned_area() / cell.measure());
    }

    const SAMPLES_PER_AXIS: usize = 8;
    let total = SAMPLES_PER_AXIS.pow(D as u32);
    let inside = (0..total)
        .filter(|&sample| {
            let mut coords = [0.0; D];
            let mut rest = sample;
            for (axis, value) in coords.iter_mut().enumerate() {
                let step = rest % SAMPLES_PER_AXIS;
                rest /= SAMPLES_PER_AXIS;
                let t = (step as f64 + 0.5) / SAMPLES_PER_AXIS as f64;
                *value = cell.min()[axis] + t * cell.extent(axis);
            }
            sphere.contains_point(&super::Point::new(coords))
        })
        .count();
    inside as f64 / total as f64
}

fn snap_percent(ratio: f64) -> f64 {
    if (ratio - 1.0).abs() <= COVERAGE_EPSILON {
        1.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{make_sphere, Point};

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify_coverage(0.0), CellCoverage::None);
        assert_eq!(classify_coverage(1e-12), CellCoverage::Partial);
        assert_eq!(classify_coverage(0.4999), CellCoverage::Partial);
        assert_eq!(classify_coverage(0.5), CellCoverage::MajorityPartial);
        assert_eq!(classify_coverage(0.999), CellCoverage::MajorityPartial);
        assert_eq!(classify_coverage(1.0 - COVERAGE_EPSILON / 2.0), CellCoverage::Full);
        assert_eq!(classify_coverage(1.0), CellCoverage::Full);
    }

    #[test]
    fn test_empty_intersection_has_zero_percent() {
        assert_eq!(coverage_percent::<2>(None, 4.0), 0.0);
    }

    #[test]
    fn test_percent_snaps_to_one() {
        let almost = Shape::Box(Aabb::new(
            Point::new([0.0, 0.0]),
            Point::new([1.0, 1.0 - COVERAGE_EPSILON / 10.0]),
        ));
        assert_eq!(coverage_percent(Some(&almost), 1.0), 1.0);
    }

    #[test]
    fn test_cell_coverage_by_polygon() {
        let cell = Aabb::new(Point::new([0.0, 0.0]), Point::new([1.0, 1.0]));
        let patch: Shape<2> = Shape::polygon(&[[0.0, 0.0], [0.6, 0.0], [0.6, 1.0], [0.0, 1.0]]);
        let (coverage, percent) = cell_coverage(&patch, &cell);
        assert_eq!(coverage, CellCoverage::MajorityPartial);
        assert!((percent - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_coverage_in_plane_and_space() {
        let square = Aabb::new(Point::new([0.0, 0.0]), Point::new([2.0, 2.0]));
        let half = make_sphere(Point::new([1.0, 1.0]), 0.5);
        let expected = std::f64::consts::PI * 0.25 / 4.0;
        assert!((sphere_coverage_percent(&half, &square) - expected).abs() < 0.01);

        let cube = Aabb::cube(Point::splat(0.0), 1.0);
        let corner = make_sphere(Point::splat(0.0), 10.0);
        assert_eq!(sphere_coverage_percent(&corner, &cube), 1.0);
        let slice = make_sphere(Point::new([0.0, 0.5, 0.5]), 0.5);
        let estimate = sphere_coverage_percent(&slice, &cube);
        assert!(estimate > 0.1 && estimate < 0.5);
    }
}
