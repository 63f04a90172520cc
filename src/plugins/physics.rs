use bevy::prelude::*;

use crate::plugins::core::sim_not_paused;
use crate::plugins::navigation::{ActuationOutput, DockAttachment, NavigationSystems};
use crate::ships::Velocity;
use crate::stations::DockingBay;

/// Integrates bounded accelerations into velocity and transform, and carries
/// docked ships along with their station.
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (integrate_motion, follow_dock_station)
                .chain()
                .after(NavigationSystems)
                .run_if(sim_not_paused),
        );
    }
}

fn integrate_motion(
    time: Res<Time<Fixed>>,
    mut bodies: Query<(&mut Transform, &mut Velocity, Option<&ActuationOutput>), Without<DockAttachment>>,
) {
    let delta_seconds = time.delta_secs();
    if delta_seconds <= 0.0 {
        return;
    }

    for (mut transform, mut velocity, output) in bodies.iter_mut() {
        if let Some(output) = output {
            velocity.linear += output.linear_acceleration * delta_seconds;
            velocity.angular += output.angular_acceleration * delta_seconds;
        }

        transform.translation += velocity.linear * delta_seconds;
        // Angular velocity is in degrees per second
        let turn = Quat::from_scaled_axis(velocity.angular * (std::f32::consts::PI / 180.0) * delta_seconds);
        transform.rotation = (turn * transform.rotation).normalize();
    }
}

fn follow_dock_station(
    mut ships: Query<(&mut Transform, &DockAttachment), Without<DockingBay>>,
    stations: Query<&Transform, With<DockingBay>>,
) {
    for (mut transform, attachment) in ships.iter_mut() {
        if let Ok(station_transform) = stations.get(attachment.station) {
            *transform = attachment.follow(station_transform);
        }
    }
}
