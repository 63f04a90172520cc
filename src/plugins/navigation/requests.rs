//! Command surface: requests from pilots and AI, their outcomes, and dock notifications.

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::plugins::core::{EventLog, NavigationConfig};
use crate::ships::Hull;
use crate::stations::{DockGrant, DockingBay};

use super::attitude::is_usable_axis;
use super::commands::NavCommand;
use super::components::{DockAttachment, NavigationData, NavigationState};
use super::docking::{dock_at, undock};
use super::error::NavigationError;
use super::pathfinding::{compute_path, navigation_plan};
use super::registry::VehicleRegistry;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavigationRequestKind {
    GoTo { location: Vec3, precise: bool },
    Rotate { target_axis: Vec3, local_axis: Vec3 },
    BrakeLinear,
    BrakeAngular,
    /// Queue a dock approach for a grant obtained elsewhere.
    Dock { grant: DockGrant },
    DockAt { station: Entity },
    Undock,
    NavigateTo { target: Vec3 },
    AbortAll,
}

impl NavigationRequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            NavigationRequestKind::GoTo { .. } => "go to",
            NavigationRequestKind::Rotate { .. } => "rotate",
            NavigationRequestKind::BrakeLinear => "brake",
            NavigationRequestKind::BrakeAngular => "brake rotation",
            NavigationRequestKind::Dock { .. } => "dock",
            NavigationRequestKind::DockAt { .. } => "dock at",
            NavigationRequestKind::Undock => "undock",
            NavigationRequestKind::NavigateTo { .. } => "navigate",
            NavigationRequestKind::AbortAll => "abort",
        }
    }
}

#[derive(Message, Clone, Copy, Debug)]
pub struct NavigationRequest {
    pub ship: Entity,
    pub kind: NavigationRequestKind,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct NavigationRequestResult {
    pub ship: Entity,
    pub kind: NavigationRequestKind,
    pub accepted: bool,
    pub error: Option<NavigationError>,
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipDocked {
    pub ship: Entity,
    pub station: Entity,
    pub slot: u32,
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShipUndocked {
    pub ship: Entity,
    pub station: Entity,
}

pub type RequestShipQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static Transform,
        &'static Hull,
        &'static mut NavigationState,
        &'static mut NavigationData,
        Option<&'static DockAttachment>,
    ),
    Without<DockingBay>,
>;

#[allow(clippy::too_many_arguments)]
pub fn handle_navigation_requests(
    mut commands: Commands,
    mut requests: MessageReader<NavigationRequest>,
    config: Res<NavigationConfig>,
    registry: Res<VehicleRegistry>,
    mut ships: RequestShipQuery,
    mut stations: Query<(&Transform, &mut DockingBay)>,
    mut results: MessageWriter<NavigationRequestResult>,
    mut undocked: MessageWriter<ShipUndocked>,
    mut log: ResMut<EventLog>,
) {
    for request in requests.read() {
        let outcome = match ships.get_mut(request.ship) {
            Err(_) => Err(NavigationError::UnknownShip),
            Ok((transform, hull, mut nav, mut data, attachment)) => match request.kind {
                NavigationRequestKind::GoTo { location, precise } => {
                    nav.push_command(NavCommand::GoToLocation {
                        target: location,
                        precise,
                    });
                    Ok(())
                }
                NavigationRequestKind::Rotate {
                    target_axis,
                    local_axis,
                } => {
                    if is_usable_axis(target_axis) && is_usable_axis(local_axis) {
                        nav.push_command(NavCommand::Rotate {
                            target_axis,
                            local_axis,
                        });
                        Ok(())
                    } else {
                        Err(NavigationError::InvalidAxis)
                    }
                }
                NavigationRequestKind::BrakeLinear => {
                    nav.push_command(NavCommand::BrakeLocation);
                    Ok(())
                }
                NavigationRequestKind::BrakeAngular => {
                    nav.push_command(NavCommand::BrakeRotation);
                    Ok(())
                }
                NavigationRequestKind::Dock { grant } => {
                    if grant.granted {
                        nav.push_command(NavCommand::Dock { grant });
                        Ok(())
                    } else {
                        Err(NavigationError::DockDenied)
                    }
                }
                NavigationRequestKind::DockAt { station } => match stations.get_mut(station) {
                    Ok((station_transform, mut bay)) => dock_at(
                        request.ship,
                        transform.translation,
                        station,
                        station_transform,
                        &mut bay,
                        &mut nav,
                    )
                    .map(|grant| {
                        log.push(format!("Dock granted, slot {}", grant.slot));
                    }),
                    Err(_) => Err(NavigationError::InvalidDockTarget),
                },
                NavigationRequestKind::Undock => match attachment {
                    None => Err(NavigationError::NotDocked),
                    Some(attachment) => match stations.get_mut(attachment.station) {
                        Err(_) => Err(NavigationError::InvalidDockTarget),
                        Ok((_, mut bay)) => undock(
                            request.ship,
                            attachment,
                            transform,
                            &mut bay,
                            &mut nav,
                            &mut data,
                            &config,
                        )
                        .map(|()| {
                            commands.entity(request.ship).remove::<DockAttachment>();
                            undocked.write(ShipUndocked {
                                ship: request.ship,
                                station: attachment.station,
                            });
                            log.push("Undocked".to_string());
                        }),
                    },
                },
                NavigationRequestKind::NavigateTo { target } => {
                    let obstacles = registry.obstacles(request.ship, config.obstacle_max_radius);
                    compute_path(transform.translation, target, hull.radius, &obstacles).map(|waypoints| {
                        info!("Generating path ({} stops)", waypoints.len());
                        log.push(format!("Path found ({} stops)", waypoints.len()));
                        for command in navigation_plan(transform.translation, target, &waypoints) {
                            nav.push_command(command);
                        }
                    })
                }
                NavigationRequestKind::AbortAll => {
                    for grant in nav.abort_all_commands() {
                        if let Ok((_, mut bay)) = stations.get_mut(grant.station) {
                            bay.release_dock(request.ship, grant.slot);
                        }
                    }
                    Ok(())
                }
            },
        };

        if let Err(error) = outcome {
            warn!("Navigation request '{}' failed: {}", request.kind.label(), error);
            log.push(format!("Cannot {}: {}", request.kind.label(), error));
        }
        results.write(NavigationRequestResult {
            ship: request.ship,
            kind: request.kind,
            accepted: outcome.is_ok(),
            error: outcome.err(),
        });
    }
}
