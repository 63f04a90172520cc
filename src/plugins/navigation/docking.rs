//! Docking protocol: dock-to-dock geometry, phase gates and approach guidance.
//!
//! The phase is never stored. Every tick the geometry between the ship dock port
//! and the station dock slot is rebuilt from both bodies, then classified from the
//! tightest gate (dockable) to the loosest (approach). Anything outside the
//! approach cone falls back to rendezvous.

use bevy::prelude::*;

use crate::plugins::core::NavigationConfig;
use crate::ships::Engines;
use crate::stations::{DockGrant, DockInfo, DockingBay};

use super::attitude::Kinematics;
use super::commands::NavCommand;
use super::components::{DockAttachment, NavigationData, NavigationState, ShipStatus};
use super::error::NavigationError;

// =============================================================================
// Gates
// =============================================================================

const DOCKING_DISTANCE_LIMIT: f32 = 0.2;
const DOCKING_ANGLE_LIMIT: f32 = 1.0;
const DOCKING_VELOCITY_LIMIT: f32 = 1.0;
const DOCKING_LATERAL_VELOCITY_LIMIT: f32 = 0.1;
const DOCKING_ANGULAR_VELOCITY_LIMIT: f32 = 5.0;

const FINAL_APPROACH_DISTANCE_LIMIT: f32 = 1.0;
const FINAL_APPROACH_LATERAL_DISTANCE_LIMIT: f32 = 1.0;
const FINAL_APPROACH_ANGLE_LIMIT: f32 = 10.0;
const FINAL_APPROACH_VELOCITY_LIMIT: f32 = 5.0;
const FINAL_APPROACH_LATERAL_VELOCITY_LIMIT: f32 = 0.5;
const FINAL_APPROACH_ANGULAR_VELOCITY_LIMIT: f32 = 10.0;

const APPROACH_DISTANCE_LIMIT: f32 = 100.0;

/// Width of the approach cone: 1 m wide at 1 m, 25.75 m at 100 m.
pub fn approach_lateral_distance_limit(distance: f32) -> f32 {
    distance / 4.0 + 0.75
}

/// Closing speed allowed in the approach cone: 5 m/s at 1 m, 44.6 m/s at 100 m.
pub fn approach_velocity_limit(distance: f32) -> f32 {
    distance / 2.5 + 4.6
}

/// Velocity of a point of a rotating body. Angular velocity is in degrees per second.
pub fn point_velocity(angular_velocity: Vec3, point: Vec3, center_of_mass: Vec3, linear_velocity: Vec3) -> Vec3 {
    rotation_induced_velocity(angular_velocity, point - center_of_mass) + linear_velocity
}

fn rotation_induced_velocity(angular_velocity: Vec3, offset: Vec3) -> Vec3 {
    std::f32::consts::PI / 180.0 * angular_velocity.cross(offset)
}

// =============================================================================
// Geometry
// =============================================================================

/// Relative state of the ship dock port and the station dock slot for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingGeometry {
    pub ship_dock_location: Vec3,
    /// Ship dock location relative to the ship origin.
    pub ship_dock_offset: Vec3,
    pub ship_dock_rotation_velocity: Vec3,
    pub station_dock_location: Vec3,
    /// Outward axis of the station dock.
    pub station_dock_axis: Vec3,
    pub station_angular_velocity: Vec3,
    pub delta_location: Vec3,
    pub distance: f32,
    /// Station dock velocity minus ship dock velocity.
    pub relative_velocity: Vec3,
    pub relative_angular_velocity: Vec3,
    /// Degrees between the ship dock axis and the reversed station dock axis.
    pub angle: f32,
    /// Velocity the station frame has at the ship's distance along the dock axis.
    pub velocity_at_ship_distance: Vec3,
}

impl DockingGeometry {
    pub fn compute(ship: &Kinematics, ship_port: Vec3, station: &Kinematics, dock: &DockInfo) -> Self {
        let ship_dock_axis = ship.rotation * Vec3::X;
        let ship_dock_location = ship.location + ship.rotation * ship_port;
        let ship_dock_rotation_velocity =
            rotation_induced_velocity(ship.angular_velocity, ship_dock_location - ship.center_of_mass);
        let ship_dock_velocity = ship_dock_rotation_velocity + ship.linear_velocity;

        let station_dock_axis = (station.rotation * dock.local_axis).normalize_or_zero();
        let station_dock_location = station.location + station.rotation * dock.local_location;
        let station_dock_velocity = point_velocity(
            station.angular_velocity,
            station_dock_location,
            station.center_of_mass,
            station.linear_velocity,
        );

        let delta_location = station_dock_location - ship_dock_location;
        let in_axis_distance = delta_location.dot(-station_dock_axis);
        let dock_arm = station_dock_location - station.center_of_mass;
        let velocity_at_ship_distance = rotation_induced_velocity(
            station.angular_velocity,
            dock_arm.normalize_or_zero() * (in_axis_distance + dock_arm.length()),
        ) + station.linear_velocity;

        let angle = (-ship_dock_axis)
            .dot(station_dock_axis)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees();

        Self {
            ship_dock_location,
            ship_dock_offset: ship_dock_location - ship.location,
            ship_dock_rotation_velocity,
            station_dock_location,
            station_dock_axis,
            station_angular_velocity: station.angular_velocity,
            delta_location,
            distance: delta_location.length(),
            relative_velocity: station_dock_velocity - ship_dock_velocity,
            relative_angular_velocity: ship.angular_velocity - station.angular_velocity,
            angle,
            velocity_at_ship_distance,
        }
    }

    fn lateral(&self, vector: Vec3) -> Vec3 {
        vector.reject_from_normalized(self.station_dock_axis)
    }

    pub fn lateral_distance(&self) -> f32 {
        self.lateral(self.delta_location).length()
    }

    pub fn lateral_velocity(&self) -> f32 {
        self.lateral(self.relative_velocity).length()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockingPhase {
    Dockable,
    FinalApproach,
    Approach,
    Rendezvous,
}

pub fn is_dockable(geometry: &DockingGeometry) -> bool {
    geometry.distance <= DOCKING_DISTANCE_LIMIT
        && geometry.angle <= DOCKING_ANGLE_LIMIT
        && geometry.relative_velocity.length() <= DOCKING_VELOCITY_LIMIT
        && geometry.lateral_velocity() <= DOCKING_LATERAL_VELOCITY_LIMIT
        && geometry.relative_angular_velocity.length() <= DOCKING_ANGULAR_VELOCITY_LIMIT
}

pub fn is_in_final_approach(geometry: &DockingGeometry) -> bool {
    geometry.distance <= FINAL_APPROACH_DISTANCE_LIMIT
        && geometry.lateral_distance() <= FINAL_APPROACH_LATERAL_DISTANCE_LIMIT
        && geometry.angle <= FINAL_APPROACH_ANGLE_LIMIT
        && geometry.relative_velocity.length() <= FINAL_APPROACH_VELOCITY_LIMIT
        && geometry.lateral_velocity() <= FINAL_APPROACH_LATERAL_VELOCITY_LIMIT
        && geometry.relative_angular_velocity.length() <= FINAL_APPROACH_ANGULAR_VELOCITY_LIMIT
}

pub fn is_in_approach(geometry: &DockingGeometry) -> bool {
    geometry.distance <= APPROACH_DISTANCE_LIMIT
        && geometry.lateral_distance() <= approach_lateral_distance_limit(geometry.distance)
        && geometry.relative_velocity.length() <= approach_velocity_limit(geometry.distance)
}

pub fn classify(geometry: &DockingGeometry) -> DockingPhase {
    if is_dockable(geometry) {
        DockingPhase::Dockable
    } else if is_in_final_approach(geometry) {
        DockingPhase::FinalApproach
    } else if is_in_approach(geometry) {
        DockingPhase::Approach
    } else {
        DockingPhase::Rendezvous
    }
}

// =============================================================================
// Guidance
// =============================================================================

/// Targets the controllers chase this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DockingGuidance {
    pub phase: DockingPhase,
    /// Where the ship origin must be.
    pub location_target: Vec3,
    /// World axis the ship nose must point along.
    pub axis_target: Vec3,
    pub angular_velocity_target: Vec3,
    pub velocity_target: Vec3,
    pub max_velocity: f32,
    /// Blend in anticollision this tick.
    pub anticollision: bool,
    /// Keep the target station among the anticollision candidates.
    pub avoid_station: bool,
}

pub fn docking_guidance(geometry: &DockingGeometry, linear_max_velocity: f32) -> DockingGuidance {
    let mut guidance = DockingGuidance {
        phase: classify(geometry),
        location_target: geometry.station_dock_location - geometry.ship_dock_offset,
        axis_target: -geometry.station_dock_axis,
        angular_velocity_target: geometry.station_angular_velocity,
        velocity_target: geometry.velocity_at_ship_distance - geometry.ship_dock_rotation_velocity,
        max_velocity: 0.0,
        anticollision: true,
        avoid_station: false,
    };

    match guidance.phase {
        DockingPhase::Dockable => {}
        DockingPhase::FinalApproach => {
            guidance.max_velocity = DOCKING_VELOCITY_LIMIT / 2.0;
        }
        DockingPhase::Approach => {
            guidance.max_velocity = approach_velocity_limit(geometry.distance) / 2.0;
            guidance.location_target += geometry.station_dock_axis * (FINAL_APPROACH_DISTANCE_LIMIT / 2.0);
        }
        DockingPhase::Rendezvous => {
            guidance.max_velocity = linear_max_velocity;
            guidance.location_target += geometry.station_dock_axis * (APPROACH_DISTANCE_LIMIT / 2.0);

            if geometry.distance > APPROACH_DISTANCE_LIMIT {
                // Point the nose at the corridor entrance
                guidance.axis_target = guidance.location_target - geometry.ship_dock_location;
                guidance.angular_velocity_target = Vec3::ZERO;
            }

            let from_dock = (geometry.ship_dock_location - geometry.station_dock_location).normalize_or_zero();
            guidance.avoid_station = from_dock.dot(geometry.station_dock_axis) < 0.5;
            guidance.anticollision = false;
        }
    }

    guidance
}

// =============================================================================
// Dock lifecycle
// =============================================================================

/// Ask the station for a slot and queue the approach on success.
pub fn dock_at(
    ship: Entity,
    ship_location: Vec3,
    station: Entity,
    station_transform: &Transform,
    bay: &mut DockingBay,
    nav: &mut NavigationState,
) -> Result<DockGrant, NavigationError> {
    let grant = bay.request_dock(station, station_transform, ship, ship_location);
    if !grant.granted {
        return Err(NavigationError::DockDenied);
    }

    nav.push_command(NavCommand::Dock { grant });
    Ok(grant)
}

/// Lock the ship into its granted slot. The returned attachment keeps the ship in
/// the station frame from now on.
#[allow(clippy::too_many_arguments)]
pub fn confirm_dock(
    ship: Entity,
    grant: DockGrant,
    station_name: &str,
    station_transform: &Transform,
    ship_transform: &Transform,
    bay: &mut DockingBay,
    nav: &mut NavigationState,
    data: &mut NavigationData,
    engines: &mut Engines,
) -> Result<DockAttachment, NavigationError> {
    if !bay.dock(ship, grant.slot) {
        return Err(NavigationError::DockDenied);
    }

    nav.clear_current_command();
    nav.set_status(ShipStatus::Docked);
    nav.linear_target_velocity = Vec3::ZERO;
    nav.angular_target_velocity = Vec3::ZERO;
    data.docked_to = Some(station_name.to_string());
    data.docked_at = Some(grant.slot);
    engines.cut();

    Ok(DockAttachment::new(grant.station, grant.slot, station_transform, ship_transform))
}

/// Leave the slot and queue a retreat straight backward.
pub fn undock(
    ship: Entity,
    attachment: &DockAttachment,
    ship_transform: &Transform,
    bay: &mut DockingBay,
    nav: &mut NavigationState,
    data: &mut NavigationData,
    config: &NavigationConfig,
) -> Result<(), NavigationError> {
    if !nav.is_docked() {
        return Err(NavigationError::NotDocked);
    }

    bay.release_dock(ship, attachment.slot);
    nav.set_status(ShipStatus::AutoPilot);
    nav.push_command(NavCommand::GoToLocation {
        target: ship_transform.translation
            + ship_transform.rotation * (Vec3::NEG_X * config.undock_retreat_distance),
        precise: false,
    });
    data.docked_to = None;
    data.docked_at = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ships::{ShipKind, ShipLimits};
    use crate::stations::DockSlot;
    use proptest::prelude::*;
    use std::f32::consts::PI;

    const SHIP_PORT: Vec3 = Vec3::new(2.0, 0.0, 0.0);

    fn station_at_origin() -> Kinematics {
        Kinematics {
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            center_of_mass: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0e6,
        }
    }

    fn dock_info() -> DockInfo {
        DockInfo {
            local_location: Vec3::new(10.0, 0.0, 0.0),
            local_axis: Vec3::X,
        }
    }

    /// Ship facing the dock slot with its port `gap` meters out along the dock axis.
    fn ship_facing_dock(gap: f32) -> Kinematics {
        let rotation = Quat::from_rotation_z(PI);
        let location = Vec3::new(10.0 + gap, 0.0, 0.0) - rotation * SHIP_PORT;
        Kinematics {
            location,
            rotation,
            center_of_mass: location,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 20_000.0,
        }
    }

    fn geometry(ship: &Kinematics) -> DockingGeometry {
        DockingGeometry::compute(ship, SHIP_PORT, &station_at_origin(), &dock_info())
    }

    fn nav() -> NavigationState {
        NavigationState::new(ShipLimits::for_kind(ShipKind::PlayerShip), 0.0)
    }

    #[test]
    fn aligned_dock_points_five_centimeters_apart_are_dockable() {
        let geometry = geometry(&ship_facing_dock(0.05));
        assert!((geometry.distance - 0.05).abs() < 0.001);
        assert!(geometry.angle < 0.1);
        assert_eq!(classify(&geometry), DockingPhase::Dockable);
    }

    #[test]
    fn lateral_drift_blocks_docking() {
        let mut ship = ship_facing_dock(0.05);
        ship.linear_velocity = Vec3::new(0.0, 0.3, 0.0);
        let geometry = geometry(&ship);
        assert!(!is_dockable(&geometry));
        assert_eq!(classify(&geometry), DockingPhase::FinalApproach);
    }

    #[test]
    fn final_approach_creeps_at_half_a_meter_per_second() {
        let geometry = geometry(&ship_facing_dock(0.6));
        let guidance = docking_guidance(&geometry, 40.0);
        assert_eq!(guidance.phase, DockingPhase::FinalApproach);
        assert_eq!(guidance.max_velocity, 0.5);
        assert!(guidance.anticollision);
        assert!((guidance.location_target - (ship_facing_dock(0.0).location)).length() < 0.001);
    }

    #[test]
    fn approach_targets_stand_off_point() {
        let geometry = geometry(&ship_facing_dock(50.0));
        let guidance = docking_guidance(&geometry, 40.0);
        assert_eq!(guidance.phase, DockingPhase::Approach);
        assert!((guidance.max_velocity - approach_velocity_limit(50.0) / 2.0).abs() < 0.001);

        let stand_off = ship_facing_dock(0.5).location;
        assert!((guidance.location_target - stand_off).length() < 0.001);
    }

    #[test]
    fn rendezvous_reaims_nose_and_disables_anticollision() {
        let ship = ship_facing_dock(400.0);
        let geometry = geometry(&ship);
        let guidance = docking_guidance(&geometry, 40.0);
        assert_eq!(guidance.phase, DockingPhase::Rendezvous);
        assert_eq!(guidance.max_velocity, 40.0);
        assert!(!guidance.anticollision);
        assert!(!guidance.avoid_station);
        assert_eq!(guidance.angular_velocity_target, Vec3::ZERO);
        // Stand-off 50 m out, ship port 400 m out: nose points back toward the station
        assert!(guidance.axis_target.normalize().dot(Vec3::NEG_X) > 0.999);
    }

    #[test]
    fn rendezvous_behind_station_avoids_it() {
        let mut ship = ship_facing_dock(0.0);
        ship.location = Vec3::new(-300.0, 0.0, 0.0);
        let guidance = docking_guidance(&geometry(&ship), 40.0);
        assert_eq!(guidance.phase, DockingPhase::Rendezvous);
        assert!(guidance.avoid_station);
    }

    #[test]
    fn station_rotation_moves_dock_point() {
        let mut station = station_at_origin();
        station.angular_velocity = Vec3::new(0.0, 0.0, 10.0);
        let geometry = DockingGeometry::compute(&ship_facing_dock(20.0), SHIP_PORT, &station, &dock_info());

        // 10 deg/s around Z at 10 m along X
        let expected = Vec3::new(0.0, 10.0 * 10.0 * PI / 180.0, 0.0);
        assert!((geometry.relative_velocity - expected).length() < 0.001);
        assert!(geometry.velocity_at_ship_distance.y > expected.y);
    }

    #[test]
    fn ship_rotation_moves_its_own_port() {
        let mut ship = ship_facing_dock(20.0);
        ship.angular_velocity = Vec3::new(0.0, 0.0, 10.0);
        let geometry = geometry(&ship);

        // Port sits 2 m along -X from the center of mass
        let port_velocity = Vec3::new(0.0, -2.0 * 10.0 * PI / 180.0, 0.0);
        assert!((geometry.ship_dock_rotation_velocity - port_velocity).length() < 0.001);
        assert!((geometry.relative_velocity + port_velocity).length() < 0.001);
        assert_eq!(geometry.relative_angular_velocity, Vec3::new(0.0, 0.0, 10.0));

        // Guidance cancels the port's swing on top of the station's motion
        let guidance = docking_guidance(&geometry, 40.0);
        assert!((guidance.velocity_target + port_velocity).length() < 0.001);
    }

    #[test]
    fn dock_at_queues_dock_command_on_grant() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = DockingBay::new(vec![DockSlot::new(Vec3::new(10.0, 0.0, 0.0), Vec3::X)]);
        let mut nav = nav();

        let grant = dock_at(ship, Vec3::new(50.0, 0.0, 0.0), station, &Transform::IDENTITY, &mut bay, &mut nav);
        assert!(matches!(grant, Ok(grant) if grant.granted));
        assert!(nav.is_auto_pilot());
        assert!(matches!(nav.current_command(), Some(NavCommand::Dock { .. })));
    }

    #[test]
    fn dock_at_denied_leaves_queue_untouched() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = DockingBay::new(Vec::new());
        let mut nav = nav();

        let result = dock_at(ship, Vec3::ZERO, station, &Transform::IDENTITY, &mut bay, &mut nav);
        assert_eq!(result, Err(NavigationError::DockDenied));
        assert!(nav.is_manual_pilot());
        assert!(nav.commands().is_empty());
    }

    #[test]
    fn confirm_then_undock_round_trip() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = DockingBay::new(vec![DockSlot::new(Vec3::new(10.0, 0.0, 0.0), Vec3::X)]);
        let mut nav = nav();
        let mut data = NavigationData::default();
        let mut engines = Engines::standard_layout(ShipKind::PlayerShip);
        for thruster in engines.thrusters.iter_mut() {
            thruster.alpha = 1.0;
        }
        let ship_transform = Transform::from_xyz(12.0, 0.0, 0.0);

        let grant = dock_at(ship, ship_transform.translation, station, &Transform::IDENTITY, &mut bay, &mut nav)
            .expect("slot granted");
        let attachment = confirm_dock(
            ship,
            grant,
            "Outpost",
            &Transform::IDENTITY,
            &ship_transform,
            &mut bay,
            &mut nav,
            &mut data,
            &mut engines,
        )
        .expect("dock confirmed");

        assert!(nav.is_docked());
        assert!(nav.commands().is_empty());
        assert!(bay.is_docked(ship));
        assert_eq!(data.docked_to.as_deref(), Some("Outpost"));
        assert_eq!(data.docked_at, Some(0));
        assert!(engines.thrusters.iter().all(|t| t.alpha == 0.0));

        let config = NavigationConfig::default();
        undock(ship, &attachment, &ship_transform, &mut bay, &mut nav, &mut data, &config)
            .expect("undocked");
        assert!(nav.is_auto_pilot());
        assert!(!bay.is_docked(ship));
        assert_eq!(data, NavigationData::default());
        assert_eq!(
            nav.current_command(),
            Some(&NavCommand::GoToLocation {
                target: Vec3::new(-38.0, 0.0, 0.0),
                precise: false
            })
        );
    }

    #[test]
    fn undock_requires_docked_status() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = DockingBay::default();
        let mut nav = nav();
        let mut data = NavigationData::default();
        let attachment = DockAttachment::new(station, 0, &Transform::IDENTITY, &Transform::IDENTITY);

        let result = undock(
            ship,
            &attachment,
            &Transform::IDENTITY,
            &mut bay,
            &mut nav,
            &mut data,
            &NavigationConfig::default(),
        );
        assert_eq!(result, Err(NavigationError::NotDocked));
        assert!(nav.is_manual_pilot());
    }

    fn vector(range: f32) -> impl Strategy<Value = Vec3> {
        (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vec3::new(x, y, z))
    }

    proptest! {
        /// Tighter gates are subsets of looser ones.
        #[test]
        fn docking_gates_are_monotonic(
            delta in vector(2.0),
            velocity in vector(3.0),
            angular in vector(8.0),
            angle in 0.0f32..20.0,
            axis in vector(1.0),
        ) {
            let axis = axis.normalize_or_zero();
            prop_assume!(axis != Vec3::ZERO);

            let geometry = DockingGeometry {
                ship_dock_location: Vec3::ZERO,
                ship_dock_offset: Vec3::ZERO,
                ship_dock_rotation_velocity: Vec3::ZERO,
                station_dock_location: delta,
                station_dock_axis: axis,
                station_angular_velocity: Vec3::ZERO,
                delta_location: delta,
                distance: delta.length(),
                relative_velocity: velocity,
                relative_angular_velocity: angular,
                angle,
                velocity_at_ship_distance: Vec3::ZERO,
            };

            if is_dockable(&geometry) {
                prop_assert!(is_in_final_approach(&geometry));
                prop_assert!(is_in_approach(&geometry));
            }
        }
    }
}
