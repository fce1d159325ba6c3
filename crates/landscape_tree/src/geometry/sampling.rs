use super::{Aabb, Point, Shape};
use geo::{BoundingRect, Closest, ClosestPoint, Contains, Coord, InteriorPoint, Line, LineString, MultiPolygon};
use rand::Rng;

const MAX_REJECTION_SAMPLES: usize = 10_000;
const SEGMENT_SEARCH_ITERATIONS: usize = 100;

/// Uniformly distributed point inside the shape.
///
/// Polygons are rejection-sampled inside their bounding rectangle; if that keeps
/// failing the polygon's interior point is returned.
pub fn random_point_in_shape<const D: usize, R: Rng + ?Sized>(shape: &Shape<D>, rng: &mut R) -> Point<D> {
    match shape {
        Shape::Box(area) => random_point_in_box(area, rng),
        Shape::Polygon(polygons) => {
            let Some(bounds) = polygons.bounding_rect() else {
                panic!("cannot sample a point from an empty polygon set");
            };
            for _ in 0..MAX_REJECTION_SAMPLES {
                let x = sample_range(rng, bounds.min().x, bounds.max().x);
                let y = sample_range(rng, bounds.min().y, bounds.max().y);
                if polygons.contains(&geo::Point::new(x, y)) {
                    return planar_point(x, y);
                }
            }
            let fallback = polygons
                .interior_point()
                .unwrap_or_else(|| panic!("polygon set has no interior point"));
            planar_point(fallback.x(), fallback.y())
        }
    }
}

fn random_point_in_box<const D: usize, R: Rng + ?Sized>(area: &Aabb<D>, rng: &mut R) -> Point<D> {
    let mut coords = [0.0; D];
    for (axis, value) in coords.iter_mut().enumerate() {
        *value = sample_range(rng, area.min()[axis], area.max()[axis]);
    }
    Point::new(coords)
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Point of `shape` nearest to the segment `start`..`end`.
///
/// When the segment crosses the shape the returned point lies on the segment.
pub fn closest_point<const D: usize>(shape: &Shape<D>, start: &Point<D>, end: &Point<D>) -> Point<D> {
    match shape {
        Shape::Box(area) => {
            // Distance from a convex set along a line is convex, so a ternary
            // search over the segment parameter converges to the minimum.
            let (mut low, mut high) = (0.0_f64, 1.0_f64);
            for _ in 0..SEGMENT_SEARCH_ITERATIONS {
                let left = low + (high - low) / 3.0;
                let right = high - (high - low) / 3.0;
                let left_distance = area.distance_to_point(&start.lerp(end, left));
                let right_distance = area.distance_to_point(&start.lerp(end, right));
                if left_distance <= right_distance {
                    high = right;
                } else {
                    low = left;
                }
            }
            area.closest_point(&start.lerp(end, (low + high) / 2.0))
        }
        Shape::Polygon(polygons) => {
            let segment = Line::new(
                Coord { x: start[0], y: start[1] },
                Coord { x: end[0], y: end[1] },
            );
            let best = closest_polygon_point(polygons, &segment);
            planar_point(best.x, best.y)
        }
    }
}

fn closest_polygon_point(polygons: &MultiPolygon<f64>, segment: &Line<f64>) -> Coord<f64> {
    if polygons.contains(&geo::Point::from(segment.start)) {
        return segment.start;
    }
    let rings: Vec<&LineString<f64>> = polygons
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors().iter()))
        .collect();

    // Entering the shape: the first boundary crossing along the segment
    let first_crossing = rings
        .iter()
        .flat_map(|ring| ring.lines().filter_map(move |edge| segment_crossing(segment, &edge)))
        .min_by(|a, b| coord_distance(*a, segment.start).total_cmp(&coord_distance(*b, segment.start)));
    if let Some(crossing) = first_crossing {
        return crossing;
    }

    // Disjoint: the closest pair involves a polygon vertex or a segment endpoint
    let vertex_candidates = rings.iter().flat_map(|ring| ring.coords()).map(|vertex| {
        let on_segment = closest_on_segment(segment, *vertex);
        (coord_distance(on_segment, *vertex), *vertex)
    });
    let endpoint_candidates = [segment.start, segment.end].into_iter().filter_map(|endpoint| {
        match polygons.closest_point(&geo::Point::from(endpoint)) {
            Closest::Intersection(p) | Closest::SinglePoint(p) => Some((coord_distance(p.0, endpoint), p.0)),
            Closest::Indeterminate => None,
        }
    });
    vertex_candidates
        .chain(endpoint_candidates)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, coord)| coord)
        .unwrap_or_else(|| panic!("cannot find a closest point on an empty polygon set"))
}

fn segment_crossing(a: &Line<f64>, b: &Line<f64>) -> Option<Coord<f64>> {
    let r = a.delta();
    let s = b.delta();
    let denominator = r.x * s.y - r.y * s.x;
    let offset = b.start - a.start;
    if denominator.abs() < f64::EPSILON {
        return None;
    }
    let t = (offset.x * s.y - offset.y * s.x) / denominator;
    let u = (offset.x * r.y - offset.y * r.x) / denominator;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(Coord {
            x: a.start.x + t * r.x,
            y: a.start.y + t * r.y,
        })
    } else {
        None
    }
}

fn closest_on_segment(segment: &Line<f64>, coord: Coord<f64>) -> Coord<f64> {
    let delta = segment.delta();
    let length_squared = delta.x * delta.x + delta.y * delta.y;
    if length_squared == 0.0 {
        return segment.start;
    }
    let offset = coord - segment.start;
    let t = ((offset.x * delta.x + offset.y * delta.y) / length_squared).clamp(0.0, 1.0);
    Coord {
        x: segment.start.x + t * delta.x,
        y: segment.start.y + t * delta.y,
    }
}

fn coord_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn planar_point<const D: usize>(x: f64, y: f64) -> Point<D> {
    assert_eq!(D, 2, "planar points only exist in two dimensions");
    let mut coords = [0.0; D];
    coords[0] = x;
    coords[1] = y;
    Point::new(coords)
}

/// Point at `distance` from `start` on the ray towards `end`
pub fn line_point_at_distance<const D: usize>(start: &Point<D>, end: &Point<D>, distance: f64) -> Point<D> {
    let length = start.distance(end);
    if length == 0.0 {
        return *start;
    }
    start.lerp(end, distance / length)
}
