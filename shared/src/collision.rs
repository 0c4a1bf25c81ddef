//! Circle-vs-polygon collision geometry.
//!
//! Everything in here is pure and deterministic. Polygons are ordered vertex
//! lists with an implicit closing edge from the last vertex to the first and
//! are assumed to be simple; results on self-intersecting polygons are
//! unspecified. Degenerate input (empty polygons, duplicate consecutive
//! vertices, zero-length vectors) never panics and never produces NaN: it
//! yields "no collision" or a zero push instead, so a single malformed
//! obstacle cannot take the simulation down.

use crate::map::StaticObject;
use crate::math::Vector2;

/// Extra distance added to every push so the resolved circle does not sit
/// exactly on the collision threshold.
pub const PUSH_MARGIN: f32 = 1.0;

/// Ray-casting parity test. O(vertices).
pub fn point_in_polygon(point: Vector2, polygon: &[Vector2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        // The straddle check guarantees pi.y != pj.y, so the division is safe.
        if (pi.y > point.y) != (pj.y > point.y) {
            let crossing_x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Closest point to `point` on the segment `start..end` (clamped projection).
pub fn closest_point_on_segment(point: Vector2, start: Vector2, end: Vector2) -> Vector2 {
    let edge = end - start;
    let length_squared = edge.magnitude_squared();
    if length_squared == 0.0 {
        return start;
    }

    let t = ((point - start).dot(&edge) / length_squared).clamp(0.0, 1.0);
    start + edge * t
}

pub fn point_to_segment_distance(point: Vector2, start: Vector2, end: Vector2) -> f32 {
    point.distance(&closest_point_on_segment(point, start, end))
}

fn edges(polygon: &[Vector2]) -> impl Iterator<Item = (Vector2, Vector2)> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| (polygon[i], polygon[(i + 1) % n]))
}

/// Shoelace area; the sign encodes the winding order.
fn signed_area(polygon: &[Vector2]) -> f32 {
    edges(polygon)
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f32>()
        / 2.0
}

/// Unit normal of `start..end` pointing away from the polygon interior.
/// `None` for a zero-length edge.
fn outward_normal(start: Vector2, end: Vector2, area: f32) -> Option<Vector2> {
    let edge = end - start;
    let length = edge.magnitude();
    if length == 0.0 {
        return None;
    }

    // Positive area: the interior lies to the left of every edge.
    let normal = if area >= 0.0 {
        Vector2::new(edge.y, -edge.x)
    } else {
        Vector2::new(-edge.y, edge.x)
    };
    Some(normal.scale(1.0 / length))
}

/// True if the circle's center lies inside the polygon or the circle
/// reaches any edge (point-to-segment distance <= radius). Polygons with
/// fewer than three vertices enclose nothing and never collide.
pub fn circle_polygon_collision(center: Vector2, radius: f32, polygon: &[Vector2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    if point_in_polygon(center, polygon) {
        return true;
    }

    edges(polygon).any(|(start, end)| point_to_segment_distance(center, start, end) <= radius)
}

/// Returns the displacement that moves the circle out of the polygon.
///
/// * Center inside: push along the outward normal of the nearest edge far
///   enough to put the center `radius + PUSH_MARGIN` beyond that edge.
/// * Center outside but overlapping: push away from the closest point on
///   the nearest overlapping edge by `radius - distance + PUSH_MARGIN`.
/// * No overlap or degenerate geometry: zero.
///
/// This is a single-shot resolver for one polygon. It does not guarantee the
/// result is free of other obstacles.
pub fn resolve_circle_polygon_collision(
    center: Vector2,
    radius: f32,
    polygon: &[Vector2],
) -> Vector2 {
    if polygon.len() < 3 {
        return Vector2::ZERO;
    }
    let area = signed_area(polygon);

    if point_in_polygon(center, polygon) {
        let mut best: Option<(f32, Vector2)> = None;
        for (start, end) in edges(polygon) {
            let Some(normal) = outward_normal(start, end, area) else {
                continue;
            };
            let distance = point_to_segment_distance(center, start, end);
            if best.map_or(true, |(min, _)| distance < min) {
                best = Some((distance, normal));
            }
        }

        return match best {
            Some((distance, normal)) => normal.scale(radius + distance + PUSH_MARGIN),
            None => Vector2::ZERO,
        };
    }

    let mut best: Option<(f32, Vector2, Vector2, Vector2)> = None;
    for (start, end) in edges(polygon) {
        let closest = closest_point_on_segment(center, start, end);
        let distance = center.distance(&closest);
        if distance <= radius && best.map_or(true, |(min, ..)| distance < min) {
            best = Some((distance, closest, start, end));
        }
    }

    let Some((distance, closest, start, end)) = best else {
        return Vector2::ZERO;
    };

    let push_distance = radius - distance + PUSH_MARGIN;
    let away = center - closest;
    if away.magnitude() > 0.0 {
        return away.normalize().scale(push_distance);
    }

    // Center sits exactly on the edge.
    outward_normal(start, end, area)
        .map(|normal| normal.scale(push_distance))
        .unwrap_or(Vector2::ZERO)
}

/// Discrete tunneling guard for a circle moving from `from` to `to`.
///
/// Checks the destination, then samples the path at steps of `radius / 2`.
/// Obstacles thinner than the step size can still be skipped.
pub fn check_circle_movement_collision(
    from: Vector2,
    to: Vector2,
    radius: f32,
    polygon: &[Vector2],
) -> bool {
    circle_polygon_collision(to, radius, polygon)
        || path_samples(from, to, radius).any(|point| circle_polygon_collision(point, radius, polygon))
}

/// Points along `from..to` spaced at most `radius / 2` apart, excluding
/// `from` and ending at `to`. Empty when there is nothing to sample.
fn path_samples(from: Vector2, to: Vector2, radius: f32) -> impl Iterator<Item = Vector2> {
    let step = radius / 2.0;
    let distance = from.distance(&to);
    let steps = if step > 0.0 && distance.is_finite() && distance > 0.0 {
        (distance / step).ceil() as u32
    } else {
        0
    };

    let path = to - from;
    (1..=steps).map(move |i| from + path * (i as f32 / steps as f32))
}

/// First sampled point on `from..to` where the circle touches an obstacle it
/// was clear of at `from`. Obstacles already overlapping at `from` are left
/// to the resolver.
///
/// Cutting a move here and resolving keeps the circle on the side it entered
/// from, even when the destination lies past a thin obstacle or overlaps its
/// far edge. Uses the same sampling as [`check_circle_movement_collision`].
pub fn first_contact(
    from: Vector2,
    to: Vector2,
    radius: f32,
    obstacles: &[StaticObject],
) -> Option<Vector2> {
    let ahead: Vec<&StaticObject> = obstacles
        .iter()
        .filter(|obstacle| !circle_polygon_collision(from, radius, &obstacle.polygon))
        .collect();
    if ahead.is_empty() {
        return None;
    }

    path_samples(from, to, radius).find(|&point| {
        ahead
            .iter()
            .any(|obstacle| circle_polygon_collision(point, radius, &obstacle.polygon))
    })
}

/// True if segments `a..b` and `c..d` cross or touch.
pub fn segments_intersect(a: Vector2, b: Vector2, c: Vector2, d: Vector2) -> bool {
    let cross = |p: Vector2, q: Vector2, r: Vector2| (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x);
    let on_segment = |p: Vector2, q: Vector2, r: Vector2| {
        p.x.min(r.x) <= q.x && q.x <= p.x.max(r.x) && p.y.min(r.y) <= q.y && q.y <= p.y.max(r.y)
    };

    let d1 = cross(a, b, c);
    let d2 = cross(a, b, d);
    let d3 = cross(c, d, a);
    let d4 = cross(c, d, b);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(a, c, b))
        || (d2 == 0.0 && on_segment(a, d, b))
        || (d3 == 0.0 && on_segment(c, a, d))
        || (d4 == 0.0 && on_segment(c, b, d))
}

/// True if the segment crosses any edge of the polygon.
pub fn segment_intersects_polygon(start: Vector2, end: Vector2, polygon: &[Vector2]) -> bool {
    polygon.len() >= 3 && edges(polygon).any(|(a, b)| segments_intersect(start, end, a, b))
}

/// Strategy for pushing a circle out of a set of obstacles.
///
/// The simulation only depends on this trait, so a stricter iterative solver
/// can replace [`SinglePassResolver`] without touching the tick.
pub trait ObstacleResolver: Send + Sync {
    /// Returns the corrected center.
    fn resolve(&self, center: Vector2, radius: f32, obstacles: &[StaticObject]) -> Vector2;
}

/// Visits each obstacle once, in order, applying its push-out vector.
///
/// Not a fixed-point solver: when obstacles overlap the same region, or in
/// tight concave pockets, a later push can move the circle back into an
/// earlier obstacle and leave residual penetration until the next tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct SinglePassResolver;

impl ObstacleResolver for SinglePassResolver {
    fn resolve(&self, center: Vector2, radius: f32, obstacles: &[StaticObject]) -> Vector2 {
        obstacles.iter().fold(center, |current, obstacle| {
            if circle_polygon_collision(current, radius, &obstacle.polygon) {
                current + resolve_circle_polygon_collision(current, radius, &obstacle.polygon)
            } else {
                current
            }
        })
    }
}
