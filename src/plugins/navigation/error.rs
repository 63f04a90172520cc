use thiserror::Error;

/// Reasons a navigation request is refused. The request handler turns these into
/// rejected results and log entries; nothing propagates past the control step.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no collision-free path to target")]
    NoPath,
    #[error("dock request denied")]
    DockDenied,
    #[error("target has no docking bay")]
    InvalidDockTarget,
    #[error("ship is not docked")]
    NotDocked,
    #[error("ship has no navigation system")]
    UnknownShip,
    #[error("rotation axis has zero length")]
    InvalidAxis,
}
