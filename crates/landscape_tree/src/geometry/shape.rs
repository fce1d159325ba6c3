use super::{Aabb, Point, Sphere, GEOMETRY_EPSILON};
use geo::{Area, BooleanOps, BoundingRect, Coord, Intersects, Line, LineString, MultiPolygon, Polygon};

/// Region carried by a patch or produced by an intersection
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<const D: usize> {
    /// Axis-aligned box, any dimension
    Box(Aabb<D>),
    /// Planar polygon set, only valid when `D == 2`
    Polygon(MultiPolygon<f64>),
}

/// Builds a box. With `apply_epsilon` the box grows by [`GEOMETRY_EPSILON`]
/// on every side so points lying exactly on its boundary are not missed.
pub fn make_box<const D: usize>(min: Point<D>, max: Point<D>, apply_epsilon: bool) -> Aabb<D> {
    let area = Aabb::new(min, max);
    if apply_epsilon {
        area.grow(GEOMETRY_EPSILON)
    } else {
        area
    }
}

impl<const D: usize> Shape<D> {
    /// Polygon from an exterior ring of `[x, y]` vertices.
    ///
    /// Panics when the ring is malformed or the space is not planar.
    pub fn polygon(exterior: &[[f64; 2]]) -> Shape<D> {
        let ring: Vec<Coord<f64>> = exterior.iter().map(|&[x, y]| Coord { x, y }).collect();
        Shape::from_polygon(Polygon::new(LineString::from(ring), vec![]))
    }

    /// Wraps a `geo` polygon after checking it is well formed
    pub fn from_polygon(polygon: Polygon<f64>) -> Shape<D> {
        assert_eq!(D, 2, "polygon shapes are only supported in two dimensions");
        validate_polygon(&polygon);
        Shape::Polygon(MultiPolygon::new(vec![polygon]))
    }

    /// Circle turned into a polygon, see [`Sphere::to_polygon`]
    pub fn circle(sphere: &Sphere<D>) -> Shape<D> {
        Shape::from_polygon(sphere.to_polygon())
    }

    pub fn bounding_box(&self) -> Option<Aabb<D>> {
        match self {
            Shape::Box(area) => Some(*area),
            Shape::Polygon(polygons) => {
                let rect = polygons.bounding_rect()?;
                Some(planar_box(rect.min(), rect.max()))
            }
        }
    }

    fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            Shape::Box(area) => MultiPolygon::new(vec![box_polygon(area)]),
            Shape::Polygon(polygons) => polygons.clone(),
        }
    }
}

/// Intersection of two shapes; `None` when they do not overlap with positive measure
pub fn intersect<const D: usize>(a: &Shape<D>, b: &Shape<D>) -> Option<Shape<D>> {
    match (a, b) {
        (Shape::Box(left), Shape::Box(right)) => left.intersection(right).map(Shape::Box),
        _ => {
            let (left_bounds, right_bounds) = (a.bounding_box()?, b.bounding_box()?);
            if !left_bounds.overlaps(&right_bounds) {
                return None;
            }
            let overlap = a.to_multi_polygon().intersection(&b.to_multi_polygon());
            if overlap.unsigned_area() <= GEOMETRY_EPSILON {
                None
            } else {
                Some(Shape::Polygon(overlap))
            }
        }
    }
}

/// Length, area or volume of a shape
pub fn measure<const D: usize>(shape: &Shape<D>) -> f64 {
    match shape {
        Shape::Box(area) => area.measure(),
        Shape::Polygon(polygons) => polygons.unsigned_area(),
    }
}

/// Whether `point` lies in the closed shape
pub fn within<const D: usize>(point: &Point<D>, shape: &Shape<D>) -> bool {
    match shape {
        Shape::Box(area) => area.contains_point(point),
        Shape::Polygon(polygons) => polygons.intersects(&geo::Point::new(point[0], point[1])),
    }
}

pub(super) fn box_polygon<const D: usize>(area: &Aabb<D>) -> Polygon<f64> {
    assert_eq!(D, 2, "only planar boxes can be turned into polygons");
    let (min, max) = (area.min(), area.max());
    Polygon::new(
        LineString::from(vec![
            (min[0], min[1]),
            (max[0], min[1]),
            (max[0], max[1]),
            (min[0], max[1]),
        ]),
        vec![],
    )
}

fn planar_box<const D: usize>(min: Coord<f64>, max: Coord<f64>) -> Aabb<D> {
    assert_eq!(D, 2, "polygon bounds only exist in two dimensions");
    let mut lo = [0.0; D];
    let mut hi = [0.0; D];
    lo[0] = min.x;
    lo[1] = min.y;
    hi[0] = max.x;
    hi[1] = max.y;
    Aabb::new(Point::new(lo), Point::new(hi))
}

/// Panics on rings with fewer than three distinct vertices, zero area or crossing edges
fn validate_polygon(polygon: &Polygon<f64>) {
    let ring = &polygon.exterior().0;
    let mut distinct: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
    for coord in ring {
        assert!(
            coord.x.is_finite() && coord.y.is_finite(),
            "polygon vertex is not finite: {coord:?}"
        );
        if !distinct.contains(coord) {
            distinct.push(*coord);
        }
    }
    assert!(
        distinct.len() >= 3,
        "polygon needs at least three distinct vertices, got {}",
        distinct.len()
    );
    assert!(
        polygon.unsigned_area() > GEOMETRY_EPSILON,
        "polygon has zero area"
    );

    let edges: Vec<Line<f64>> = polygon
        .exterior()
        .lines()
        .filter(|line| line.start != line.end)
        .collect();
    let count = edges.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let adjacent = j == i + 1 || (i == 0 && j == count - 1);
            if !adjacent && edges[i].intersects(&edges[j]) {
                panic!(
                    "polygon ring is self-intersecting between edges {i} and {j}: {:?} / {:?}",
                    edges[i], edges[j]
                );
            }
        }
    }
}
