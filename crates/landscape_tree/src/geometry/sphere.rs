use super::{Aabb, Point};
use geo::{Coord, LineString, Polygon};
use std::f64::consts::PI;

/// Number of boundary points used when a circle is turned into a polygon
pub const POINTS_PER_CIRCLE: usize = 45;

/// Ball of `radius` around `center`, kept analytically
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere<const D: usize> {
    center: Point<D>,
    radius: f64,
}

/// Creates a sphere, panicking on a negative or non-finite radius
pub fn make_sphere<const D: usize>(center: Point<D>, radius: f64) -> Sphere<D> {
    assert!(
        radius.is_finite() && radius >= 0.0,
        "sphere radius must be finite and non-negative, got {radius}"
    );
    assert!(center.is_finite(), "sphere center must be finite: {center:?}");
    Sphere { center, radius }
}

impl<const D: usize> Sphere<D> {
    pub fn center(&self) -> &Point<D> {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn contains_point(&self, point: &Point<D>) -> bool {
        self.center.distance(point) <= self.radius
    }

    /// True when any point of the box is within the sphere
    pub fn intersects_box(&self, area: &Aabb<D>) -> bool {
        area.distance_to_point(&self.center) <= self.radius
    }

    /// True when the whole box lies inside the sphere. The ball is convex, so
    /// checking every corner is enough.
    pub fn covers_box(&self, area: &Aabb<D>) -> bool {
        area.corners().all(|corner| self.contains_point(&corner))
    }

    pub fn bounding_box(&self) -> Aabb<D> {
        Aabb::new(self.center, self.center).grow(self.radius)
    }

    /// Closed ring approximating the circle. Only meaningful in the plane.
    pub fn to_polygon(&self) -> Polygon<f64> {
        assert_eq!(D, 2, "only circles in the plane can be turned into polygons");
        let ring: Vec<Coord<f64>> = (0..POINTS_PER_CIRCLE)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / POINTS_PER_CIRCLE as f64;
                Coord {
                    x: self.center[0] + self.radius * angle.cos(),
                    y: self.center[1] + self.radius * angle.sin(),
                }
            })
            .collect();
        Polygon::new(LineString::from(ring), vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_box_relations() {
        let sphere = make_sphere(Point::new([0.0, 0.0]), 2.0);
        let inside = Aabb::new(Point::new([0.0, 0.0]), Point::new([1.0, 1.0]));
        let straddling = Aabb::new(Point::new([1.0, 1.0]), Point::new([3.0, 3.0]));
        let outside = Aabb::new(Point::new([2.0, 2.0]), Point::new([3.0, 3.0]));

        assert!(sphere.covers_box(&inside));
        assert!(sphere.intersects_box(&straddling));
        assert!(!sphere.covers_box(&straddling));
        assert!(!sphere.intersects_box(&outside));
    }

    #[test]
    fn test_zero_radius_touches_only_its_center() {
        let sphere = make_sphere(Point::new([1.0, 1.0, 1.0]), 0.0);
        let touching = Aabb::cube(Point::new([1.0, 0.0, 0.0]), 1.0);
        let apart = Aabb::cube(Point::new([1.5, 0.0, 0.0]), 1.0);
        assert!(sphere.intersects_box(&touching));
        assert!(!sphere.intersects_box(&apart));
    }

    #[test]
    fn test_polygon_approximation_area() {
        let circle = make_sphere(Point::new([5.0, 5.0]), 1.0).to_polygon();
        assert_eq!(circle.exterior().0.len(), POINTS_PER_CIRCLE + 1);
        let area = circle.unsigned_area();
        assert!(area < PI && area > 0.99 * PI);
    }

    #[test]
    #[should_panic(expected = "non-negative")]
    fn test_negative_radius_panics() {
        let _ = make_sphere(Point::new([0.0, 0.0]), -1.0);
    }
}
