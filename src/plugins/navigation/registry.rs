//! Per-tick snapshot of every body navigation has to know about.

use bevy::prelude::*;

use crate::ships::{Hull, Ship};
use crate::stations::Station;

use super::pathfinding::Obstacle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyEntry {
    pub entity: Entity,
    pub location: Vec3,
    pub radius: f32,
    pub movable: bool,
    /// Ships and stations. Only spacecraft take part in anticollision.
    pub spacecraft: bool,
}

#[derive(Resource, Debug, Default)]
pub struct VehicleRegistry {
    bodies: Vec<BodyEntry>,
}

impl VehicleRegistry {
    pub fn bodies(&self) -> &[BodyEntry] {
        &self.bodies
    }

    pub fn replace(&mut self, bodies: Vec<BodyEntry>) {
        self.bodies = bodies;
    }

    /// Closest spacecraft to `location` other than `ship` and anything `excluded` rejects.
    pub fn nearest_vehicle(
        &self,
        ship: Entity,
        location: Vec3,
        excluded: impl Fn(&BodyEntry) -> bool,
    ) -> Option<&BodyEntry> {
        self.bodies
            .iter()
            .filter(|body| body.spacecraft && body.entity != ship && !excluded(body))
            .min_by(|a, b| {
                a.location
                    .distance_squared(location)
                    .total_cmp(&b.location.distance_squared(location))
            })
    }

    /// Movable bodies under `max_radius`, seen as obstacles by `ship`.
    pub fn obstacles(&self, ship: Entity, max_radius: f32) -> Vec<Obstacle> {
        self.bodies
            .iter()
            .filter(|body| body.entity != ship && body.movable && body.radius < max_radius)
            .map(|body| Obstacle {
                entity: body.entity,
                center: body.location,
                radius: body.radius,
            })
            .collect()
    }
}

pub fn refresh_vehicle_registry(
    mut registry: ResMut<VehicleRegistry>,
    bodies: Query<(Entity, &Transform, &Hull, Has<Ship>, Has<Station>)>,
) {
    let entries = bodies
        .iter()
        .map(|(entity, transform, hull, is_ship, is_station)| BodyEntry {
            entity,
            location: transform.translation,
            radius: hull.radius,
            movable: hull.movable,
            spacecraft: is_ship || is_station,
        })
        .collect();
    registry.replace(entries);
}
