use bevy::prelude::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShipKind {
    PlayerShip,
    Scout,
    Miner,
    Security,
}

#[derive(Component, Debug)]
pub struct Ship {
    pub kind: ShipKind,
}

/// Linear and angular velocity of a rigid body. Angular velocity is in degrees per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct RigidBody {
    pub mass: f32,
    /// Center of mass relative to the body origin, in local space.
    pub local_center_of_mass: Vec3,
}

impl RigidBody {
    pub fn world_center_of_mass(&self, transform: &Transform) -> Vec3 {
        transform.translation + transform.rotation * self.local_center_of_mass
    }
}

/// Bounding sphere used for anticollision and pathfinding.
#[derive(Component, Debug, Clone, Copy)]
pub struct Hull {
    pub radius: f32,
    pub movable: bool,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct ShipDamage {
    pub alive: bool,
    pub powered: bool,
}

impl Default for ShipDamage {
    fn default() -> Self {
        Self {
            alive: true,
            powered: true,
        }
    }
}

/// Ship docking port. Ship ports always face forward (local +X).
#[derive(Component, Debug, Clone, Copy)]
pub struct DockPort {
    pub local_location: Vec3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ThrusterClass {
    /// Main drive. Only used for linear thrust while boosting, never for torque.
    Boost,
    Maneuvering,
}

#[derive(Debug, Clone)]
pub struct Thruster {
    pub local_position: Vec3,
    /// Direction of the force applied to the hull, in local space.
    pub local_thrust_axis: Vec3,
    /// Undamaged maximum thrust.
    pub rated_thrust: f32,
    /// Damage-adjusted maximum thrust.
    pub max_thrust: f32,
    pub class: ThrusterClass,
    /// Current activation level in [0, 1].
    pub alpha: f32,
}

impl Thruster {
    pub fn new(local_position: Vec3, local_thrust_axis: Vec3, thrust: f32, class: ThrusterClass) -> Self {
        Self {
            local_position,
            local_thrust_axis: local_thrust_axis.normalize_or_zero(),
            rated_thrust: thrust,
            max_thrust: thrust,
            class,
            alpha: 0.0,
        }
    }

    pub fn is_boost(&self) -> bool {
        self.class == ThrusterClass::Boost
    }

    /// Apply damage as a fraction of the rated thrust.
    pub fn damage(&mut self, ratio: f32) {
        let ratio = ratio.clamp(0.0, 1.0);
        self.max_thrust = self.rated_thrust * (1.0 - ratio);
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct Engines {
    pub thrusters: Vec<Thruster>,
}

impl Engines {
    /// One rear main drive plus a three-axis maneuvering cluster at both ends of the hull.
    pub fn standard_layout(kind: ShipKind) -> Self {
        let half_length = ship_radius(kind) * 0.8;
        let half_width = ship_radius(kind) * 0.4;
        let rcs = ship_rcs_thrust(kind);
        let mut thrusters = vec![Thruster::new(
            Vec3::new(-half_length, 0.0, 0.0),
            Vec3::X,
            ship_main_thrust(kind),
            ThrusterClass::Boost,
        )];

        for end in [half_length, -half_length] {
            for axis in [Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
                thrusters.push(Thruster::new(
                    Vec3::new(end, 0.0, 0.0),
                    axis,
                    rcs,
                    ThrusterClass::Maneuvering,
                ));
            }
        }

        // Retro and forward translation
        thrusters.push(Thruster::new(
            Vec3::new(half_length, 0.0, 0.0),
            Vec3::NEG_X,
            rcs * 2.0,
            ThrusterClass::Maneuvering,
        ));
        thrusters.push(Thruster::new(
            Vec3::new(-half_length, 0.0, 0.0),
            Vec3::X,
            rcs * 2.0,
            ThrusterClass::Maneuvering,
        ));

        // Roll
        for side in [half_width, -half_width] {
            for axis in [Vec3::Z, Vec3::NEG_Z] {
                thrusters.push(Thruster::new(
                    Vec3::new(0.0, side, 0.0),
                    axis,
                    rcs,
                    ThrusterClass::Maneuvering,
                ));
            }
        }

        Self { thrusters }
    }

    /// Shut every thruster down.
    pub fn cut(&mut self) {
        for thruster in self.thrusters.iter_mut() {
            thruster.alpha = 0.0;
        }
    }
}

/// Performance limits cached by the navigation system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipLimits {
    pub linear_max_velocity: f32,
    pub angular_max_velocity: f32,
    pub linear_max_boosting_velocity: f32,
    pub angular_acceleration_rate: f32,
}

impl ShipLimits {
    pub fn for_kind(kind: ShipKind) -> Self {
        Self {
            linear_max_velocity: ship_linear_max_velocity(kind),
            angular_max_velocity: ship_angular_max_velocity(kind),
            linear_max_boosting_velocity: ship_linear_max_boosting_velocity(kind),
            angular_acceleration_rate: ship_angular_acceleration_rate(kind),
        }
    }
}

pub fn ship_linear_max_velocity(kind: ShipKind) -> f32 {
    match kind {
        ShipKind::PlayerShip => 40.0,
        ShipKind::Scout => 60.0,
        ShipKind::Miner => 25.0,
        ShipKind::Security => 45.0,
    }
}

pub fn ship_linear_max_boosting_velocity(kind: ShipKind) -> f32 {
    ship_linear_max_velocity(kind) * 2.0
}

/// Degrees per second.
pub fn ship_angular_max_velocity(kind: ShipKind) -> f32 {
    match kind {
        ShipKind::PlayerShip => 40.0,
        ShipKind::Scout => 60.0,
        ShipKind::Miner => 20.0,
        ShipKind::Security => 45.0,
    }
}

/// Degrees per second squared.
pub fn ship_angular_acceleration_rate(kind: ShipKind) -> f32 {
    match kind {
        ShipKind::PlayerShip => 30.0,
        ShipKind::Scout => 45.0,
        ShipKind::Miner => 12.0,
        ShipKind::Security => 35.0,
    }
}

pub fn ship_mass(kind: ShipKind) -> f32 {
    match kind {
        ShipKind::PlayerShip => 20_000.0,
        ShipKind::Scout => 8_000.0,
        ShipKind::Miner => 60_000.0,
        ShipKind::Security => 25_000.0,
    }
}

pub fn ship_radius(kind: ShipKind) -> f32 {
    match kind {
        ShipKind::PlayerShip => 12.0,
        ShipKind::Scout => 8.0,
        ShipKind::Miner => 22.0,
        ShipKind::Security => 14.0,
    }
}

fn ship_main_thrust(kind: ShipKind) -> f32 {
    ship_mass(kind) * 12.0
}

fn ship_rcs_thrust(kind: ShipKind) -> f32 {
    ship_mass(kind) * 3.0
}
