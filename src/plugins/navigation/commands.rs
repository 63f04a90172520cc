//! Navigation intents and the FIFO they are executed from.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::stations::DockGrant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NavCommand {
    /// Fly to a point and stop there.
    GoToLocation { target: Vec3, precise: bool },
    /// Kill linear velocity.
    BrakeLocation,
    /// Align a local ship axis with a world axis.
    Rotate { target_axis: Vec3, local_axis: Vec3 },
    /// Kill angular velocity.
    BrakeRotation,
    /// Run the docking approach for a granted slot.
    Dock { grant: DockGrant },
}

impl NavCommand {
    pub fn label(&self) -> &'static str {
        match self {
            NavCommand::GoToLocation { .. } => "Location",
            NavCommand::BrakeLocation => "BrakeLocation",
            NavCommand::Rotate { .. } => "Rotation",
            NavCommand::BrakeRotation => "BrakeRotation",
            NavCommand::Dock { .. } => "Dock",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: VecDeque<NavCommand>,
}

impl CommandQueue {
    pub fn push(&mut self, command: NavCommand) {
        self.pending.push_back(command);
    }

    pub fn peek(&self) -> Option<&NavCommand> {
        self.pending.front()
    }

    pub fn pop(&mut self) -> Option<NavCommand> {
        self.pending.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = NavCommand> + '_ {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
