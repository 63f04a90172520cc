//! Soft repulsion from the nearest vehicle, blended into the linear target velocity.

use bevy::prelude::*;

use super::registry::BodyEntry;

/// Blend `velocity` toward a side-step away from `other`.
///
/// The weight grows linearly from 0 at `threshold` meters of clearance to 1 at
/// contact. The side-step direction turns the separation by the ship's own
/// `angle` (degrees) around the separation axis, so two ships never dodge into
/// each other the same way every time.
pub fn anticollision_correction(
    velocity: Vec3,
    location: Vec3,
    other: &BodyEntry,
    angle: f32,
    max_velocity: f32,
    threshold: f32,
) -> Vec3 {
    let delta = other.location - location;
    let clearance = (delta.length() - other.radius).abs();
    if clearance >= threshold || threshold <= 0.0 {
        return velocity;
    }

    let axis = delta.normalize_or_zero();
    let turn = if axis == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(axis, angle.to_radians())
    };
    let avoid = turn * Vec3::new(0.0, 0.0, other.radius);

    let alpha = 1.0 - clearance / threshold;
    velocity * (1.0 - alpha) + (avoid - delta).normalize_or_zero() * max_velocity * alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(world: &mut World, location: Vec3, radius: f32) -> BodyEntry {
        BodyEntry {
            entity: world.spawn_empty().id(),
            location,
            radius,
            movable: true,
            spacecraft: true,
        }
    }

    #[test]
    fn at_threshold_velocity_is_unchanged() {
        let mut world = World::default();
        let other = other(&mut world, Vec3::new(60.0, 0.0, 0.0), 10.0);
        let velocity = Vec3::new(12.0, 3.0, 0.0);

        let corrected = anticollision_correction(velocity, Vec3::ZERO, &other, 60.0, 40.0, 50.0);
        assert_eq!(corrected, velocity);
    }

    #[test]
    fn at_contact_velocity_is_pure_avoidance() {
        let mut world = World::default();
        let other = other(&mut world, Vec3::new(10.0, 0.0, 0.0), 10.0);
        let velocity = Vec3::new(12.0, 3.0, 0.0);

        let corrected = anticollision_correction(velocity, Vec3::ZERO, &other, 0.0, 40.0, 50.0);
        // Unturned side-step is +Z, separation is +X
        let expected = Vec3::new(-10.0, 0.0, 10.0).normalize() * 40.0;
        assert!((corrected - expected).length() < 0.001);
    }

    #[test]
    fn halfway_blend_mixes_both() {
        let mut world = World::default();
        let other = other(&mut world, Vec3::new(35.0, 0.0, 0.0), 10.0);
        let velocity = Vec3::new(20.0, 0.0, 0.0);

        let corrected = anticollision_correction(velocity, Vec3::ZERO, &other, 0.0, 40.0, 50.0);
        let avoid = Vec3::new(-35.0, 0.0, 10.0).normalize() * 40.0;
        assert!((corrected - (velocity * 0.5 + avoid * 0.5)).length() < 0.001);
    }

    #[test]
    fn correction_always_moves_away_from_other() {
        let mut world = World::default();
        let other = other(&mut world, Vec3::new(0.0, 15.0, 0.0), 10.0);

        for step in 0..8 {
            let angle = step as f32 * 45.0;
            let corrected = anticollision_correction(Vec3::ZERO, Vec3::ZERO, &other, angle, 40.0, 50.0);
            assert!(corrected.y < 0.0);
        }
    }
}
