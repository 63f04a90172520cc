//! Navigation plugin: guidance, autopilot and docking for every spacecraft.
//!
//! This module provides:
//! - A FIFO of navigation commands per ship
//! - Approach-and-stop controllers for position and orientation
//! - Thrust and torque budgets per axis, and thruster activation
//! - The four-phase docking protocol
//! - Sphere-obstacle path splitting and soft anticollision

mod actuation;
mod anticollision;
mod attitude;
mod autopilot;
mod commands;
mod components;
mod docking;
mod error;
mod pathfinding;
mod registry;
mod requests;

use bevy::prelude::*;

use crate::plugins::core::sim_not_paused;

// Re-export public types
pub use commands::NavCommand;
pub use components::{
    ActuationOutput, DockAttachment, NavigationData, NavigationState, PilotInput, ShipStatus,
};
pub use error::NavigationError;
pub use requests::{
    NavigationRequest, NavigationRequestKind, NavigationRequestResult, ShipDocked, ShipUndocked,
};

// =============================================================================
// Plugin
// =============================================================================

/// Systems that turn requests into target velocities and actuation for this tick.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationSystems;

pub struct NavigationPlugin;

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<NavigationRequest>()
            .add_message::<NavigationRequestResult>()
            .add_message::<ShipDocked>()
            .add_message::<ShipUndocked>()
            .init_resource::<registry::VehicleRegistry>()
            .add_systems(
                FixedUpdate,
                (
                    registry::refresh_vehicle_registry,
                    requests::handle_navigation_requests,
                    autopilot::autopilot_tick,
                )
                    .chain()
                    .in_set(NavigationSystems)
                    .run_if(sim_not_paused),
            );
    }
}
