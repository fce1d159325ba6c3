use super::{Point, GEOMETRY_EPSILON};
use serde::{Deserialize, Serialize};

/// Axis-aligned box, closed on every side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb<const D: usize> {
    min: Point<D>,
    max: Point<D>,
}

impl<const D: usize> Aabb<D> {
    /// Creates a box from its corners.
    ///
    /// Panics if `min` exceeds `max` on any axis or a corner is not finite.
    pub fn new(min: Point<D>, max: Point<D>) -> Self {
        assert!(
            min.is_finite() && max.is_finite(),
            "box corners must be finite: {min:?} / {max:?}"
        );
        for axis in 0..D {
            assert!(
                min[axis] <= max[axis],
                "box min corner exceeds max corner on axis {axis}: {min:?} / {max:?}"
            );
        }
        Self { min, max }
    }

    /// Cube of edge `size` anchored at `origin`
    pub fn cube(origin: Point<D>, size: f64) -> Self {
        let mut max = *origin.coords();
        for value in max.iter_mut() {
            *value += size;
        }
        Self::new(origin, Point::new(max))
    }

    pub fn min(&self) -> &Point<D> {
        &self.min
    }

    pub fn max(&self) -> &Point<D> {
        &self.max
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// Length, area or volume depending on `D`
    pub fn measure(&self) -> f64 {
        (0..D).map(|axis| self.extent(axis)).product()
    }

    pub fn center(&self) -> Point<D> {
        self.min.lerp(&self.max, 0.5)
    }

    pub fn contains_point(&self, point: &Point<D>) -> bool {
        (0..D).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    pub fn contains_box(&self, other: &Aabb<D>) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Overlap of two boxes; `None` unless it has positive extent on every axis
    pub fn intersection(&self, other: &Aabb<D>) -> Option<Aabb<D>> {
        let mut min = [0.0; D];
        let mut max = [0.0; D];
        for axis in 0..D {
            min[axis] = self.min[axis].max(other.min[axis]);
            max[axis] = self.max[axis].min(other.max[axis]);
            if max[axis] - min[axis] <= GEOMETRY_EPSILON {
                return None;
            }
        }
        Some(Aabb {
            min: Point::new(min),
            max: Point::new(max),
        })
    }

    pub fn overlaps(&self, other: &Aabb<D>) -> bool {
        (0..D).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// Box grown by `margin` on every side
    pub fn grow(&self, margin: f64) -> Aabb<D> {
        let mut min = *self.min.coords();
        let mut max = *self.max.coords();
        for axis in 0..D {
            min[axis] -= margin;
            max[axis] += margin;
        }
        Aabb {
            min: Point::new(min),
            max: Point::new(max),
        }
    }

    /// All `2^D` corners; bit `i` of the enumeration index selects the max side of axis `i`
    pub fn corners(&self) -> impl Iterator<Item = Point<D>> + '_ {
        (0..(1usize << D)).map(move |index| {
            let mut coords = [0.0; D];
            for (axis, value) in coords.iter_mut().enumerate() {
                *value = if (index >> axis) & 1 == 1 {
                    self.max[axis]
                } else {
                    self.min[axis]
                };
            }
            Point::new(coords)
        })
    }

    /// Point of the box nearest to `point`
    pub fn closest_point(&self, point: &Point<D>) -> Point<D> {
        let mut coords = *point.coords();
        for (axis, value) in coords.iter_mut().enumerate() {
            *value = value.clamp(self.min[axis], self.max[axis]);
        }
        Point::new(coords)
    }

    pub fn distance_to_point(&self, point: &Point<D>) -> f64 {
        self.closest_point(point).distance(point)
    }

    /// Child index of `point`: bit `i` is set when the point lies in the upper half of axis `i`
    pub fn child_index(&self, point: &Point<D>) -> usize {
        let center = self.center();
        (0..D).fold(0, |index, axis| {
            if point[axis] >= center[axis] {
                index | (1 << axis)
            } else {
                index
            }
        })
    }

    /// Sub-box selected by `child_index`, see [`Aabb::child_index`]
    pub fn child(&self, child_index: usize) -> Aabb<D> {
        let center = self.center();
        let mut min = *self.min.coords();
        let mut max = *self.max.coords();
        for axis in 0..D {
            if (child_index >> axis) & 1 == 1 {
                min[axis] = center[axis];
            } else {
                max[axis] = center[axis];
            }
        }
        Aabb {
            min: Point::new(min),
            max: Point::new(max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Aabb<2> {
        Aabb::new(Point::new([0.0, 0.0]), Point::new([1.0, 1.0]))
    }

    #[test]
    fn test_intersection_touching_edges_is_empty() {
        let a = unit_square();
        let b = Aabb::new(Point::new([1.0, 0.0]), Point::new([2.0, 1.0]));
        assert!(a.overlaps(&b));
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn test_intersection_measure() {
        let a = Aabb::cube(Point::new([0.0, 0.0, 0.0]), 2.0);
        let b = Aabb::cube(Point::new([1.0, 1.0, 1.0]), 2.0);
        let overlap = a.intersection(&b).unwrap();
        assert!((overlap.measure() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_children_tile_parent() {
        let parent = Aabb::cube(Point::new([0.0, 0.0, 0.0]), 4.0);
        let total: f64 = (0..8).map(|i| parent.child(i).measure()).sum();
        assert!((total - parent.measure()).abs() < 1e-12);

        let probe = Point::new([3.0, 0.5, 2.5]);
        let index = parent.child_index(&probe);
        assert_eq!(index, 0b101);
        assert!(parent.child(index).contains_point(&probe));
    }

    #[test]
    fn test_corners_and_closest_point() {
        let square = unit_square();
        assert_eq!(square.corners().count(), 4);
        let outside = Point::new([2.0, 0.5]);
        assert_eq!(square.closest_point(&outside), Point::new([1.0, 0.5]));
        assert!((square.distance_to_point(&outside) - 1.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "exceeds max corner")]
    fn test_inverted_box_panics() {
        let _ = Aabb::new(Point::new([1.0, 0.0]), Point::new([0.0, 1.0]));
    }
}
