//! Attitude control: approach-and-stop laws for position and orientation.
//!
//! Both laws estimate how far the ship travels (or turns) while cancelling its
//! velocity error with the worst-case available acceleration, and only command
//! extra speed toward the goal when that stopping distance still fits. The
//! result is a critically damped approach that never overshoots.

use bevy::prelude::*;

use crate::plugins::core::NavigationConfig;
use crate::ships::{RigidBody, Velocity};

use super::actuation::ThrusterLayout;

/// Squared magnitudes below this are treated as zero.
const NEARLY_ZERO_SQUARED: f32 = 1.0e-8;

/// Per-tick snapshot of a rigid body, read once and shared by every computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub location: Vec3,
    pub rotation: Quat,
    pub center_of_mass: Vec3,
    pub linear_velocity: Vec3,
    /// Degrees per second.
    pub angular_velocity: Vec3,
    pub mass: f32,
}

impl Kinematics {
    pub fn capture(transform: &Transform, velocity: &Velocity, body: &RigidBody) -> Self {
        Self {
            location: transform.translation,
            rotation: transform.rotation,
            center_of_mass: body.world_center_of_mass(transform),
            linear_velocity: velocity.linear,
            angular_velocity: velocity.angular,
            mass: body.mass,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeCommand {
    pub target_velocity: Vec3,
    pub reached: bool,
}

/// Velocity that brings the ship to `target_location` moving at `target_velocity`.
pub fn update_linear_attitude_auto(
    layout: &ThrusterLayout,
    body: &Kinematics,
    target_location: Vec3,
    target_velocity: Vec3,
    max_velocity: f32,
    config: &NavigationConfig,
    delta_seconds: f32,
) -> AttitudeCommand {
    let delta_position = target_location - body.location;
    let direction = delta_position.normalize_or_zero();
    let distance = (delta_position.length() - config.linear_dead_distance).max(0.0);

    let delta_velocity = target_velocity - body.linear_velocity;
    let delta_velocity_axis = delta_velocity.normalize_or_zero();

    let time_to_final_velocity = if delta_velocity.length_squared() <= NEARLY_ZERO_SQUARED {
        0.0
    } else if body.mass <= 0.0 {
        0.0
    } else {
        let acceleration = layout.max_thrust_along_axis(delta_velocity_axis, false) / body.mass;
        let acceleration_in_axis = acceleration.dot(direction).abs();
        if acceleration_in_axis > 0.0 {
            delta_velocity.length() / acceleration_in_axis
        } else {
            f32::INFINITY
        }
    };

    let distance_to_stop = (delta_velocity.length() / 2.0) * (time_to_final_velocity + delta_seconds);

    // Under this distance the variation is negligible: hold the exact target velocity
    if distance < config.linear_dead_distance
        && delta_velocity.length() < config.negligible_speed_ratio * max_velocity
    {
        return AttitudeCommand {
            target_velocity,
            reached: true,
        };
    }

    let target_velocity = if distance_to_stop > distance {
        target_velocity
    } else {
        let max_precise_speed = ((distance - distance_to_stop) / delta_seconds).min(max_velocity);
        direction * max_precise_speed + target_velocity
    };

    AttitudeCommand {
        target_velocity,
        reached: false,
    }
}

/// False for axes too short to give a direction.
pub fn is_usable_axis(axis: Vec3) -> bool {
    axis.length_squared() > NEARLY_ZERO_SQUARED
}

/// Rotation axis (normalized) and angle in degrees turning `current` onto `target`.
pub fn rotation_to_axis(current: Vec3, target: Vec3) -> (Vec3, f32) {
    let current = current.normalize_or_zero();
    let target = target.normalize_or_zero();
    let dot = current.dot(target).clamp(-1.0, 1.0);
    let angle = dot.acos().to_degrees();

    let mut direction = current.cross(target).normalize_or_zero();
    if direction == Vec3::ZERO && dot < 0.0 {
        // Opposite axes: any perpendicular axis works
        direction = current.any_orthonormal_vector();
    }

    (direction, angle)
}

fn time_to_final_angular_velocity(
    layout: &ThrusterLayout,
    delta_velocity: Vec3,
    rotation_direction: Vec3,
    angular_acceleration_rate: f32,
) -> f32 {
    if delta_velocity.length_squared() <= NEARLY_ZERO_SQUARED {
        return 0.0;
    }

    let delta_velocity_axis = delta_velocity.normalize_or_zero();
    let damage_ratio = layout.damage_ratio(delta_velocity_axis);
    let acceleration = delta_velocity_axis * angular_acceleration_rate * damage_ratio;
    let acceleration_in_axis = acceleration.dot(rotation_direction).abs();

    if acceleration_in_axis > 0.0 {
        delta_velocity.length() / acceleration_in_axis
    } else {
        f32::INFINITY
    }
}

/// Angular velocity that turns `local_axis` onto `target_axis` and stops there.
#[allow(clippy::too_many_arguments)]
pub fn update_angular_attitude_auto(
    layout: &ThrusterLayout,
    body: &Kinematics,
    target_axis: Vec3,
    local_axis: Vec3,
    angular_acceleration_rate: f32,
    angular_max_velocity: f32,
    config: &NavigationConfig,
    delta_seconds: f32,
) -> AttitudeCommand {
    let world_axis = body.rotation * local_axis;
    let (rotation_direction, angle) = rotation_to_axis(world_axis, target_axis);

    let delta_velocity = -body.angular_velocity;
    let time_to_final_velocity = time_to_final_angular_velocity(
        layout,
        delta_velocity,
        rotation_direction,
        angular_acceleration_rate,
    );
    let angle_to_stop = (delta_velocity.length() / 2.0) * (time_to_final_velocity + delta_seconds);

    if angle < config.angular_dead_angle && delta_velocity.length() < config.angular_dead_angle {
        return AttitudeCommand {
            target_velocity: Vec3::ZERO,
            reached: true,
        };
    }

    let target_velocity = if angle_to_stop > angle {
        Vec3::ZERO
    } else {
        let max_precise_speed = ((angle - angle_to_stop) / delta_seconds).min(angular_max_velocity);
        rotation_direction * max_precise_speed
    };

    AttitudeCommand {
        target_velocity,
        reached: false,
    }
}

/// Angular velocity that aligns `local_axis` with `target_axis` while matching
/// `target_angular_velocity`, for targets that keep rotating.
#[allow(clippy::too_many_arguments)]
pub fn angular_velocity_to_align_axis(
    layout: &ThrusterLayout,
    body: &Kinematics,
    local_axis: Vec3,
    target_axis: Vec3,
    target_angular_velocity: Vec3,
    angular_acceleration_rate: f32,
    angular_max_velocity: f32,
    delta_seconds: f32,
) -> Vec3 {
    let world_axis = body.rotation * local_axis;
    let (rotation_direction, angle) = rotation_to_axis(world_axis, target_axis);

    let delta_velocity = target_angular_velocity - body.angular_velocity;
    let time_to_final_velocity = time_to_final_angular_velocity(
        layout,
        delta_velocity,
        rotation_direction,
        angular_acceleration_rate,
    );
    let angle_to_stop = (delta_velocity.length() / 2.0) * time_to_final_velocity.max(delta_seconds);

    if angle_to_stop > angle {
        target_angular_velocity
    } else {
        let max_precise_speed =
            ((angle - angle_to_stop) / (delta_seconds * 0.75)).min(angular_max_velocity);
        rotation_direction * max_precise_speed
    }
}

/// True once the linear velocity is small enough to be zeroed.
pub fn linear_braking_done(linear_velocity: Vec3, linear_max_velocity: f32, config: &NavigationConfig) -> bool {
    linear_velocity.length() < config.negligible_speed_ratio * linear_max_velocity
}

/// True once the angular velocity is small enough to be zeroed.
pub fn angular_braking_done(
    angular_velocity: Vec3,
    angular_max_velocity: f32,
    config: &NavigationConfig,
) -> bool {
    angular_velocity.length() < config.negligible_speed_ratio * angular_max_velocity
}
