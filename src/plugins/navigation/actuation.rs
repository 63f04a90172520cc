//! Thrust and torque budgets, and the per-tick conversion of target velocities
//! into bounded accelerations and thruster activation levels.

use bevy::prelude::*;

use crate::ships::{ShipLimits, Thruster};

use super::components::ActuationOutput;

/// Vectors with every component below this are treated as zero.
pub const NEARLY_ZERO: f32 = 1.0e-4;

pub fn is_nearly_zero(vector: Vec3) -> bool {
    vector.abs_diff_eq(Vec3::ZERO, NEARLY_ZERO)
}

/// Thrusters of one ship seen from the world frame.
pub struct ThrusterLayout<'a> {
    pub thrusters: &'a [Thruster],
    pub transform: &'a Transform,
    pub center_of_mass: Vec3,
}

impl<'a> ThrusterLayout<'a> {
    pub fn new(thrusters: &'a [Thruster], transform: &'a Transform, center_of_mass: Vec3) -> Self {
        Self {
            thrusters,
            transform,
            center_of_mass,
        }
    }

    pub fn world_thrust_axis(&self, thruster: &Thruster) -> Vec3 {
        (self.transform.rotation * thruster.local_thrust_axis).normalize_or_zero()
    }

    pub fn lever_arm(&self, thruster: &Thruster) -> Vec3 {
        self.transform.transform_point(thruster.local_position) - self.center_of_mass
    }

    pub fn torque_direction(&self, thruster: &Thruster) -> Vec3 {
        self.lever_arm(thruster)
            .cross(self.world_thrust_axis(thruster))
            .normalize_or_zero()
    }

    /// Sum of the thrust every thruster can push along `axis`. Boost thrusters only
    /// count when `with_boost` is set.
    pub fn max_thrust_along_axis(&self, axis: Vec3, with_boost: bool) -> Vec3 {
        let axis = axis.normalize_or_zero();

        self.thrusters
            .iter()
            .filter(|thruster| with_boost || !thruster.is_boost())
            .map(|thruster| {
                let thrust_axis = self.world_thrust_axis(thruster);
                let ratio = thrust_axis.dot(axis);
                if ratio > 0.0 {
                    thrust_axis * thruster.max_thrust * ratio
                } else {
                    Vec3::ZERO
                }
            })
            .sum()
    }

    /// Sum of the torque the maneuvering thrusters can produce around `axis`, using
    /// either the damaged or the rated thrust.
    pub fn max_torque_along_axis(&self, axis: Vec3, with_damage: bool) -> f32 {
        let axis = axis.normalize_or_zero();
        let mut total = 0.0;

        for thruster in self.thrusters.iter().filter(|thruster| !thruster.is_boost()) {
            let max_thrust = if with_damage {
                thruster.max_thrust
            } else {
                thruster.rated_thrust
            };

            // Not controllable
            if thruster.rated_thrust == 0.0 {
                continue;
            }

            let torque = self.lever_arm(thruster).cross(self.world_thrust_axis(thruster));
            let ratio = axis.dot(torque.normalize_or_zero());
            if ratio > 0.0 {
                total += torque.length() * max_thrust * ratio;
            }
        }

        total
    }

    /// Fraction of the undamaged torque still available around `axis`.
    pub fn damage_ratio(&self, axis: Vec3) -> f32 {
        let rated = self.max_torque_along_axis(axis, false);
        if rated <= 0.0 {
            return 0.0;
        }
        self.max_torque_along_axis(axis, true) / rated
    }
}

/// Everything the physics sub-tick reads about the ship this tick.
#[derive(Debug, Clone, Copy)]
pub struct ActuationInput {
    pub linear_target_velocity: Vec3,
    pub angular_target_velocity: Vec3,
    pub use_orbital_boost: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub angular_acceleration_rate: f32,
    pub limits: ShipLimits,
    pub powered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActuationResult {
    /// Linear target after the speed ceiling was applied.
    pub linear_target_velocity: Vec3,
    pub output: ActuationOutput,
    /// Activation level per thruster, in layout order.
    pub alphas: Vec<f32>,
}

/// Turn target velocities into accelerations bounded by the available thrust, and
/// derive every thruster's activation. An unpowered ship gets nothing.
pub fn physic_sub_tick(
    layout: &ThrusterLayout,
    input: &ActuationInput,
    delta_seconds: f32,
) -> ActuationResult {
    if !input.powered || delta_seconds <= 0.0 {
        return ActuationResult {
            linear_target_velocity: input.linear_target_velocity,
            output: ActuationOutput::default(),
            alphas: vec![0.0; layout.thrusters.len()],
        };
    }

    let mut max_velocity = input.limits.linear_max_velocity;
    if input.use_orbital_boost {
        let front = layout.transform.rotation * Vec3::X;
        max_velocity = (input.linear_target_velocity.normalize_or_zero().dot(front)
            * input.limits.linear_max_boosting_velocity)
            .max(0.0);
    }
    let linear_target_velocity = input.linear_target_velocity.clamp_length_max(max_velocity);

    // Linear
    let delta_v = linear_target_velocity - input.linear_velocity;
    let delta_v_axis = delta_v.normalize_or_zero();
    let linear_active = !is_nearly_zero(delta_v);
    let mut linear_acceleration = Vec3::ZERO;

    if linear_active && input.mass > 0.0 {
        let thrust = layout
            .max_thrust_along_axis(delta_v_axis, input.use_orbital_boost)
            .length();
        linear_acceleration =
            (delta_v_axis * thrust / input.mass).clamp_length_max(delta_v.length() / delta_seconds);
    }

    // Angular
    let delta_angular_v = input.angular_target_velocity - input.angular_velocity;
    let delta_angular_v_axis = delta_angular_v.normalize_or_zero();
    let angular_active = !is_nearly_zero(delta_angular_v);
    let mut angular_acceleration = Vec3::ZERO;

    if angular_active {
        let damage_ratio = layout.damage_ratio(delta_angular_v_axis);
        angular_acceleration = (delta_angular_v_axis * input.angular_acceleration_rate * damage_ratio)
            .clamp_length_max(delta_angular_v.length() / delta_seconds);
    }

    let alphas = layout
        .thrusters
        .iter()
        .map(|thruster| {
            let mut linear_alpha = 0.0;
            let mut angular_alpha = 0.0;

            if linear_active && (input.use_orbital_boost || !thruster.is_boost()) {
                linear_alpha = layout.world_thrust_axis(thruster).dot(delta_v_axis);
            }

            if angular_active && !thruster.is_boost() {
                angular_alpha = layout.torque_direction(thruster).dot(delta_angular_v_axis);
            }

            (linear_alpha + angular_alpha).clamp(0.0, 1.0)
        })
        .collect();

    ActuationResult {
        linear_target_velocity,
        output: ActuationOutput {
            linear_acceleration,
            angular_acceleration,
        },
        alphas,
    }
}
