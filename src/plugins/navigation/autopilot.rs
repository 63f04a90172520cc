//! The per-tick control step: pick the active behavior, compute target velocities,
//! then turn them into bounded accelerations and thruster activations.

use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;

use crate::plugins::core::{EventLog, NavigationConfig};
use crate::ships::{DockPort, Engines, RigidBody, Ship, ShipDamage, Velocity};
use crate::stations::{DockGrant, DockingBay};

use super::actuation::{physic_sub_tick, ActuationInput, ThrusterLayout};
use super::anticollision::anticollision_correction;
use super::attitude::{
    angular_braking_done, angular_velocity_to_align_axis, is_usable_axis, linear_braking_done,
    update_angular_attitude_auto, update_linear_attitude_auto, Kinematics,
};
use super::commands::NavCommand;
use super::components::{ActuationOutput, NavigationData, NavigationState, PilotInput};
use super::docking::{confirm_dock, docking_guidance, DockingGeometry, DockingPhase};
use super::registry::{BodyEntry, VehicleRegistry};
use super::requests::ShipDocked;

pub type ShipControlQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static Transform,
        &'static mut Velocity,
        &'static RigidBody,
        &'static mut Engines,
        &'static mut NavigationState,
        &'static mut NavigationData,
        &'static DockPort,
        &'static ShipDamage,
        Option<&'static PilotInput>,
        &'static mut ActuationOutput,
    ),
    (With<Ship>, Without<DockingBay>),
>;

pub type DockStationQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static Transform,
        &'static Velocity,
        &'static RigidBody,
        &'static mut DockingBay,
        Option<&'static Name>,
    ),
    Without<Ship>,
>;

#[allow(clippy::too_many_arguments)]
pub fn autopilot_tick(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    config: Res<NavigationConfig>,
    registry: Res<VehicleRegistry>,
    mut ships: ShipControlQuery,
    mut stations: DockStationQuery,
    mut docked: MessageWriter<ShipDocked>,
    mut log: ResMut<EventLog>,
) {
    let delta_seconds = time.delta_secs();
    if delta_seconds <= 0.0 {
        return;
    }

    for (
        entity,
        transform,
        mut velocity,
        rigid_body,
        mut engines,
        mut nav,
        mut data,
        port,
        damage,
        pilot,
        mut output,
    ) in ships.iter_mut()
    {
        let body = Kinematics::capture(transform, &velocity, rigid_body);
        nav.center_of_mass = body.center_of_mass;

        if nav.is_manual_pilot() {
            if damage.alive {
                if let Some(pilot) = pilot {
                    nav.linear_target_velocity = pilot.linear_target_velocity;
                    nav.angular_target_velocity = pilot.angular_target_velocity;
                    nav.use_orbital_boost = pilot.use_orbital_boost;
                }
            }
        } else if nav.is_auto_pilot() {
            match nav.current_command().copied() {
                Some(NavCommand::GoToLocation { target, precise }) => {
                    let max_velocity = if precise {
                        config.linear_max_docking_velocity
                    } else {
                        nav.limits.linear_max_velocity
                    };
                    let layout = ThrusterLayout::new(&engines.thrusters, transform, body.center_of_mass);
                    let command = update_linear_attitude_auto(
                        &layout,
                        &body,
                        target,
                        Vec3::ZERO,
                        max_velocity,
                        &config,
                        delta_seconds,
                    );
                    nav.linear_target_velocity = command.target_velocity;
                    if command.reached {
                        nav.clear_current_command();
                    } else {
                        nav.linear_target_velocity =
                            avoid_nearest(&registry, entity, &body, &nav, &config, |other| {
                                crowds_target(other, target, config.anticollision_distance)
                            });
                    }
                }
                Some(NavCommand::BrakeLocation) => {
                    nav.linear_target_velocity = Vec3::ZERO;
                    if linear_braking_done(velocity.linear, nav.limits.linear_max_velocity, &config) {
                        velocity.linear = Vec3::ZERO;
                        nav.clear_current_command();
                    }
                }
                Some(NavCommand::Rotate {
                    target_axis,
                    local_axis,
                }) if !is_usable_axis(target_axis) || !is_usable_axis(local_axis) => {
                    warn!("Ship {:?} dropped a rotate command with a zero axis", entity);
                    nav.angular_target_velocity = Vec3::ZERO;
                    nav.clear_current_command();
                }
                Some(NavCommand::Rotate {
                    target_axis,
                    local_axis,
                }) => {
                    let layout = ThrusterLayout::new(&engines.thrusters, transform, body.center_of_mass);
                    let command = update_angular_attitude_auto(
                        &layout,
                        &body,
                        target_axis,
                        local_axis,
                        nav.angular_acceleration_rate,
                        nav.limits.angular_max_velocity,
                        &config,
                        delta_seconds,
                    );
                    nav.angular_target_velocity = command.target_velocity;
                    if command.reached {
                        velocity.angular = Vec3::ZERO;
                        nav.clear_current_command();
                    }
                }
                Some(NavCommand::BrakeRotation) => {
                    nav.angular_target_velocity = Vec3::ZERO;
                    if angular_braking_done(velocity.angular, nav.limits.angular_max_velocity, &config) {
                        velocity.angular = Vec3::ZERO;
                        nav.clear_current_command();
                    }
                }
                Some(NavCommand::Dock { grant }) => {
                    let Ok((station_transform, station_velocity, station_body, mut bay, station_name)) =
                        stations.get_mut(grant.station)
                    else {
                        warn!("Ship {:?} dropped dock: {:?} is not a station", entity, grant.station);
                        log.push("Dock target lost".to_string());
                        nav.clear_current_command();
                        continue;
                    };
                    let Some(dock) = bay.dock_info(grant.slot) else {
                        warn!("Ship {:?} dropped dock: slot {} does not exist", entity, grant.slot);
                        log.push(format!("Dock slot {} lost", grant.slot));
                        bay.release_dock(entity, grant.slot);
                        nav.clear_current_command();
                        continue;
                    };

                    let station = Kinematics::capture(station_transform, station_velocity, station_body);
                    let geometry = DockingGeometry::compute(&body, port.local_location, &station, &dock);
                    let guidance = docking_guidance(&geometry, nav.limits.linear_max_velocity);

                    if guidance.phase == DockingPhase::Dockable {
                        let station_name = station_name
                            .map(|name| name.as_str().to_string())
                            .unwrap_or_else(|| format!("{}", grant.station));
                        match confirm_dock(
                            entity,
                            grant,
                            &station_name,
                            station_transform,
                            transform,
                            &mut bay,
                            &mut nav,
                            &mut data,
                            &mut engines,
                        ) {
                            Ok(attachment) => {
                                commands.entity(entity).insert(attachment);
                                *output = ActuationOutput::default();
                                velocity.linear = station_velocity.linear;
                                velocity.angular = station_velocity.angular;
                                docked.write(ShipDocked {
                                    ship: entity,
                                    station: grant.station,
                                    slot: grant.slot,
                                });
                                info!("Ship {:?} docked at {} slot {}", entity, station_name, grant.slot);
                                log.push(format!("Docked at {}", station_name));
                            }
                            Err(error) => warn!("Dock confirmation failed: {}", error),
                        }
                    } else {
                        let layout = ThrusterLayout::new(&engines.thrusters, transform, body.center_of_mass);
                        let linear = update_linear_attitude_auto(
                            &layout,
                            &body,
                            guidance.location_target,
                            guidance.velocity_target,
                            guidance.max_velocity,
                            &config,
                            delta_seconds,
                        );
                        nav.linear_target_velocity = linear.target_velocity;
                        nav.angular_target_velocity = angular_velocity_to_align_axis(
                            &layout,
                            &body,
                            Vec3::X,
                            guidance.axis_target,
                            guidance.angular_velocity_target,
                            nav.angular_acceleration_rate,
                            nav.limits.angular_max_velocity,
                            delta_seconds,
                        );

                        if guidance.anticollision {
                            // Ships using the same station are not obstacles
                            let ignore_station = !guidance.avoid_station;
                            nav.linear_target_velocity =
                                avoid_nearest(&registry, entity, &body, &nav, &config, |other| {
                                    ignore_station && ignored_by_station(other.entity, &grant, &bay)
                                });
                        }
                    }
                }
                None => {}
            }
        }

        if nav.is_docked() {
            continue;
        }

        let layout = ThrusterLayout::new(&engines.thrusters, transform, body.center_of_mass);
        let input = ActuationInput {
            linear_target_velocity: nav.linear_target_velocity,
            angular_target_velocity: nav.angular_target_velocity,
            use_orbital_boost: nav.use_orbital_boost,
            linear_velocity: velocity.linear,
            angular_velocity: velocity.angular,
            mass: rigid_body.mass,
            angular_acceleration_rate: nav.angular_acceleration_rate,
            limits: nav.limits,
            powered: damage.powered,
        };
        let result = physic_sub_tick(&layout, &input, delta_seconds);

        nav.linear_target_velocity = result.linear_target_velocity;
        *output = result.output;
        for (thruster, alpha) in engines.thrusters.iter_mut().zip(result.alphas) {
            thruster.alpha = alpha;
        }
    }
}

/// True when `other` sits so close to `target` that its repulsion would keep
/// the ship from ever settling there.
fn crowds_target(other: &BodyEntry, target: Vec3, threshold: f32) -> bool {
    (other.location.distance(target) - other.radius).abs() < threshold
}

fn ignored_by_station(other: Entity, grant: &DockGrant, bay: &DockingBay) -> bool {
    other == grant.station || bay.is_granted(other) || bay.is_docked(other)
}

fn avoid_nearest(
    registry: &VehicleRegistry,
    entity: Entity,
    body: &Kinematics,
    nav: &NavigationState,
    config: &NavigationConfig,
    excluded: impl Fn(&BodyEntry) -> bool,
) -> Vec3 {
    match registry.nearest_vehicle(entity, body.location, excluded) {
        Some(other) => anticollision_correction(
            nav.linear_target_velocity,
            body.location,
            other,
            nav.anticollision_angle,
            nav.limits.linear_max_velocity,
            config.anticollision_distance,
        ),
        None => nav.linear_target_velocity,
    }
}
