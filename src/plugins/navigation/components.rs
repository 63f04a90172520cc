//! Navigation components owned by each vehicle.

use bevy::prelude::*;

use crate::ships::ShipLimits;
use crate::stations::DockGrant;

use super::commands::{CommandQueue, NavCommand};

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ShipStatus {
    #[default]
    Manual,
    AutoPilot,
    Docked,
}

/// Guidance state of a vehicle. Only the navigation systems mutate it.
#[derive(Component, Debug)]
pub struct NavigationState {
    status: ShipStatus,
    commands: CommandQueue,
    pub linear_target_velocity: Vec3,
    /// Degrees per second.
    pub angular_target_velocity: Vec3,
    pub use_orbital_boost: bool,
    /// World-space center of mass, refreshed once per tick.
    pub center_of_mass: Vec3,
    /// Degrees per second squared.
    pub angular_acceleration_rate: f32,
    pub limits: ShipLimits,
    /// Degrees. Fixed per vehicle, picks the side anticollision dodges to.
    pub anticollision_angle: f32,
}

impl NavigationState {
    pub fn new(limits: ShipLimits, anticollision_angle: f32) -> Self {
        Self {
            status: ShipStatus::Manual,
            commands: CommandQueue::default(),
            linear_target_velocity: Vec3::ZERO,
            angular_target_velocity: Vec3::ZERO,
            use_orbital_boost: false,
            center_of_mass: Vec3::ZERO,
            angular_acceleration_rate: limits.angular_acceleration_rate,
            limits,
            anticollision_angle,
        }
    }

    pub fn status(&self) -> ShipStatus {
        self.status
    }

    pub fn is_manual_pilot(&self) -> bool {
        self.status == ShipStatus::Manual
    }

    pub fn is_auto_pilot(&self) -> bool {
        self.status == ShipStatus::AutoPilot
    }

    pub fn is_docked(&self) -> bool {
        self.status == ShipStatus::Docked
    }

    pub fn set_status(&mut self, status: ShipStatus) {
        if self.status != status {
            debug!("Navigation status {:?} -> {:?}", self.status, status);
        }
        self.status = status;
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// Queue a command. The vehicle switches to autopilot unless it is docked.
    pub fn push_command(&mut self, command: NavCommand) {
        if !self.is_docked() {
            self.set_status(ShipStatus::AutoPilot);
        }
        debug!("Pushed command '{}'", command.label());
        self.commands.push(command);
    }

    pub fn current_command(&self) -> Option<&NavCommand> {
        self.commands.peek()
    }

    /// Drop the active command. An empty queue hands control back to the pilot.
    pub fn clear_current_command(&mut self) {
        if let Some(command) = self.commands.pop() {
            debug!("Cleared command '{}'", command.label());
        }

        if self.commands.is_empty() && !self.is_docked() {
            self.set_status(ShipStatus::Manual);
        }
    }

    /// Drop every queued command and return the dock grants they held, which the
    /// caller must release.
    pub fn abort_all_commands(&mut self) -> Vec<DockGrant> {
        let mut released = Vec::new();

        for command in self.commands.drain() {
            debug!("Abort command '{}'", command.label());
            if let NavCommand::Dock { grant } = command {
                released.push(grant);
            }
        }

        if !self.is_docked() {
            self.set_status(ShipStatus::Manual);
        }
        released
    }
}

/// Navigation record read and written by save/load.
#[derive(Component, Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NavigationData {
    /// Name of the station the ship is docked to.
    pub docked_to: Option<String>,
    pub docked_at: Option<u32>,
}

/// Pilot requested velocities, used while the ship is flown manually.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PilotInput {
    pub linear_target_velocity: Vec3,
    pub angular_target_velocity: Vec3,
    pub use_orbital_boost: bool,
}

/// Bounded accelerations handed to the physics step.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuationOutput {
    pub linear_acceleration: Vec3,
    /// Degrees per second squared.
    pub angular_acceleration: Vec3,
}

/// Present while docked. The ship keeps `local` relative to the station frame.
#[derive(Component, Debug, Clone, Copy)]
pub struct DockAttachment {
    pub station: Entity,
    pub slot: u32,
    pub local: Transform,
}

impl DockAttachment {
    pub fn new(station: Entity, slot: u32, station_transform: &Transform, ship_transform: &Transform) -> Self {
        let inverse = station_transform.rotation.inverse();
        Self {
            station,
            slot,
            local: Transform {
                translation: inverse * (ship_transform.translation - station_transform.translation),
                rotation: inverse * ship_transform.rotation,
                scale: ship_transform.scale,
            },
        }
    }

    /// World transform of the ship for the current station transform.
    pub fn follow(&self, station_transform: &Transform) -> Transform {
        Transform {
            translation: station_transform.translation
                + station_transform.rotation * self.local.translation,
            rotation: (station_transform.rotation * self.local.rotation).normalize(),
            scale: self.local.scale,
        }
    }
}
