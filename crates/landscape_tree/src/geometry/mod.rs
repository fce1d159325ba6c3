//! Geometry kernel: points, boxes, spheres and patch shapes.
//!
//! Everything here is free of simulation meaning. Boxes and spheres work in
//! any dimension; polygons only exist in the plane and are backed by `geo`.

mod aabb;
mod coverage;
mod sampling;
mod shape;
mod sphere;

pub use aabb::Aabb;
pub use coverage::{
    cell_coverage, classify_coverage, coverage_percent, sphere_coverage_percent, CellCoverage,
};
pub use sampling::{closest_point, line_point_at_distance, random_point_in_shape};
pub use shape::{intersect, make_box, measure, within, Shape};
pub use sphere::{make_sphere, Sphere, POINTS_PER_CIRCLE};

use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Tolerance used for boundary nudging and for discarding degenerate slivers
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Coverage ratios within this distance of 1 count as full coverage
pub const COVERAGE_EPSILON: f64 = 1e-6;

/// A position in D-dimensional space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize> {
    #[serde(with = "array_serde")]
    coords: [f64; D],
}

impl<const D: usize> Point<D> {
    pub const fn new(coords: [f64; D]) -> Self {
        Self { coords }
    }

    /// Point with every coordinate set to `value`
    pub const fn splat(value: f64) -> Self {
        Self { coords: [value; D] }
    }

    pub fn coords(&self) -> &[f64; D] {
        &self.coords
    }

    pub fn distance(&self, other: &Point<D>) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Point<D>) -> f64 {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Linear interpolation towards `other`, `t` in `[0, 1]`
    pub fn lerp(&self, other: &Point<D>, t: f64) -> Point<D> {
        let mut coords = self.coords;
        for (axis, value) in coords.iter_mut().enumerate() {
            *value += (other.coords[axis] - *value) * t;
        }
        Point::new(coords)
    }

    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }
}

impl<const D: usize> Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        &self.coords[axis]
    }
}

impl<const D: usize> From<[f64; D]> for Point<D> {
    fn from(coords: [f64; D]) -> Self {
        Point::new(coords)
    }
}

/// Euclidean distance between two points
pub fn distance<const D: usize>(a: &Point<D>, b: &Point<D>) -> f64 {
    a.distance(b)
}

/// Integer cell coordinates at a given tree depth.
///
/// At depth `d` every axis coordinate lies in `0..2^d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePoint<const D: usize> {
    #[serde(with = "array_serde")]
    axis: [u32; D],
    depth: u32,
}

impl<const D: usize> TreePoint<D> {
    pub const fn new(axis: [u32; D], depth: u32) -> Self {
        Self { axis, depth }
    }

    pub fn axis(&self) -> &[u32; D] {
        &self.axis
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Position of the child selected by `child_index` one level down
    pub fn child(&self, child_index: usize) -> TreePoint<D> {
        let mut axis = self.axis;
        for (i, value) in axis.iter_mut().enumerate() {
            *value = *value * 2 + ((child_index >> i) & 1) as u32;
        }
        TreePoint::new(axis, self.depth + 1)
    }

    /// Same-depth neighbour along `axis`, `None` when it would leave the domain
    pub fn offset(&self, axis: usize, step: i64) -> Option<TreePoint<D>> {
        let extent = 1i64 << self.depth;
        let moved = self.axis[axis] as i64 + step;
        if moved < 0 || moved >= extent {
            return None;
        }
        let mut coords = self.axis;
        coords[axis] = moved as u32;
        Some(TreePoint::new(coords, self.depth))
    }
}

/// Serde helpers for fixed-size arrays whose length is a const generic
pub(crate) mod array_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T, const N: usize>(values: &[T; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        values.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, De, T, const N: usize>(deserializer: De) -> Result<[T; N], De::Error>
    where
        De: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let values = Vec::<T>::deserialize(deserializer)?;
        let found = values.len();
        values
            .try_into()
            .map_err(|_| De::Error::invalid_length(found, &"one value per axis"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new([0.0, 0.0, 0.0]);
        let b = Point::new([2.0, 3.0, 6.0]);
        assert!((distance(&a, &b) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_serde_length_checked() {
        let json = serde_json::to_string(&Point::new([1.0, 2.0])).unwrap();
        assert_eq!(json, r#"{"coords":[1.0,2.0]}"#);
        let bad: Result<Point<3>, _> = serde_json::from_str(&json);
        assert!(bad.is_err());
    }

    #[test]
    fn test_tree_point_child_and_offset() {
        let root = TreePoint::<2>::new([0, 0], 0);
        let child = root.child(0b10);
        assert_eq!(child.axis(), &[0, 1]);
        assert_eq!(child.depth(), 1);
        assert_eq!(child.offset(1, 1), None);
        assert_eq!(child.offset(0, 1), Some(TreePoint::new([1, 1], 1)));
        assert_eq!(child.offset(0, -1), None);
    }
}
