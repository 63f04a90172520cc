//! Sphere-obstacle path splitter and the command plan built from its waypoints.

use bevy::prelude::*;

use super::attitude::is_usable_axis;
use super::commands::NavCommand;
use super::error::NavigationError;

/// Bounding sphere of a body the path must route around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub entity: Entity,
    pub center: Vec3,
    pub radius: f32,
}

fn closest_point_on_segment(start: Vec3, end: Vec3, point: Vec3) -> Vec3 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f32::EPSILON {
        return start;
    }
    let t = ((point - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    start + segment * t
}

pub fn segment_intersects_sphere(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> bool {
    closest_point_on_segment(start, end, center).distance_squared(center) < radius * radius
}

/// Where the line through `start` and `end` crosses the plane through `center`
/// with the given normal. A line parallel to the plane yields its closest point.
fn line_plane_intersection(start: Vec3, end: Vec3, center: Vec3, normal: Vec3) -> Vec3 {
    let direction = end - start;
    let denominator = direction.dot(normal);
    if denominator.abs() <= f32::EPSILON {
        return closest_point_on_segment(start, end, center);
    }
    start + direction * ((center - start).dot(normal) / denominator)
}

/// True when `point` lies inside the inflated sphere of any obstacle but `ignore`.
pub fn is_point_colliding(point: Vec3, ship_radius: f32, obstacles: &[Obstacle], ignore: Entity) -> bool {
    obstacles.iter().any(|obstacle| {
        obstacle.entity != ignore && point.distance(obstacle.center) < ship_radius + obstacle.radius
    })
}

/// Waypoints, in travel order, that route a ship of `ship_radius` from `origin`
/// to `target` around `obstacles`.
///
/// Each colliding obstacle is passed by relocating the segment's crossing of the
/// plane orthogonal to (target - center) onto the inflated sphere. Both halves are
/// then split again without that obstacle. A relocated point that lands inside
/// another obstacle is a dead end: there is no backtracking.
pub fn compute_path(
    origin: Vec3,
    target: Vec3,
    ship_radius: f32,
    obstacles: &[Obstacle],
) -> Result<Vec<Vec3>, NavigationError> {
    let mut path = Vec::new();
    if split_travel(origin, target, ship_radius, obstacles, obstacles, &mut path) {
        Ok(path)
    } else {
        Err(NavigationError::NoPath)
    }
}

fn split_travel(
    origin: Vec3,
    target: Vec3,
    ship_radius: f32,
    candidates: &[Obstacle],
    obstacles: &[Obstacle],
    path: &mut Vec<Vec3>,
) -> bool {
    for (index, obstacle) in candidates.iter().enumerate() {
        let inflated = ship_radius + obstacle.radius;
        if !segment_intersects_sphere(origin, target, obstacle.center, inflated) {
            continue;
        }

        let crossing = line_plane_intersection(origin, target, obstacle.center, target - obstacle.center);
        let mut outward = (crossing - obstacle.center).normalize_or_zero();
        if outward == Vec3::ZERO {
            // Travel goes straight through the center
            let travel = (target - origin).normalize_or_zero();
            outward = if travel == Vec3::ZERO {
                Vec3::Y
            } else {
                travel.any_orthonormal_vector()
            };
        }
        let waypoint = obstacle.center + outward * inflated;

        if is_point_colliding(waypoint, ship_radius, obstacles, obstacle.entity) {
            return false;
        }

        let remaining: Vec<Obstacle> = candidates
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .map(|(_, obstacle)| *obstacle)
            .collect();

        let first_ok = split_travel(origin, waypoint, ship_radius, &remaining, obstacles, path);
        path.push(waypoint);
        let second_ok = split_travel(waypoint, target, ship_radius, &remaining, obstacles, path);
        return first_ok && second_ok;
    }

    true
}

/// Rotate then fly to every waypoint, then to the target itself. Legs of zero
/// length are skipped.
pub fn navigation_plan(origin: Vec3, target: Vec3, waypoints: &[Vec3]) -> Vec<NavCommand> {
    let mut commands = Vec::with_capacity(waypoints.len() * 2 + 2);
    let mut from = origin;

    for &waypoint in waypoints.iter().chain(std::iter::once(&target)) {
        if !is_usable_axis(waypoint - from) {
            continue;
        }
        commands.push(NavCommand::Rotate {
            target_axis: waypoint - from,
            local_axis: Vec3::X,
        });
        commands.push(NavCommand::GoToLocation {
            target: waypoint,
            precise: false,
        });
        from = waypoint;
    }

    commands
}
