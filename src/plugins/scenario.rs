use bevy::app::AppExit;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::plugins::core::{sim_not_paused, EventLog};
use crate::plugins::navigation::{
    ActuationOutput, NavigationData, NavigationRequest, NavigationRequestKind,
    NavigationRequestResult, NavigationState, NavigationSystems, PilotInput, ShipDocked,
};
use crate::ships::{
    ship_mass, ship_radius, DockPort, Engines, Hull, RigidBody, Ship, ShipDamage, ShipKind,
    ShipLimits, Velocity,
};
use crate::stations::{
    station_dock_slots, station_mass, station_radius, DockingBay, Station, StationKind,
};

/// Headless demo: one ship docks at a spinning outpost while a scout routes
/// around an asteroid. Exits once the ship is docked or the tick limit runs out.
pub struct ScenarioPlugin;

impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScenarioSeed>()
            .init_resource::<Scenario>()
            .add_systems(Startup, spawn_scenario)
            .add_systems(
                FixedUpdate,
                (
                    issue_scenario_requests.before(NavigationSystems),
                    watch_scenario.after(NavigationSystems),
                )
                    .run_if(sim_not_paused),
            );
    }
}

#[derive(Resource)]
pub struct ScenarioSeed {
    pub value: u64,
}

impl Default for ScenarioSeed {
    fn default() -> Self {
        Self { value: 12345 }
    }
}

#[derive(Resource, Debug)]
pub struct Scenario {
    pub ship: Option<Entity>,
    pub station: Option<Entity>,
    pub traffic: Option<Entity>,
    pub requested: bool,
    pub ticks: u32,
    pub max_ticks: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            ship: None,
            station: None,
            traffic: None,
            requested: false,
            ticks: 0,
            // Five minutes at the default tick rate
            max_ticks: 3000,
        }
    }
}

const STATION_SPIN: f32 = 2.0;
const SHIP_START: Vec3 = Vec3::new(400.0, 150.0, 0.0);
const TRAFFIC_START: Vec3 = Vec3::new(-500.0, 400.0, 0.0);
const TRAFFIC_TARGET: Vec3 = Vec3::new(500.0, 400.0, 0.0);
const ASTEROID_LOCATION: Vec3 = Vec3::new(0.0, 400.0, 0.0);
const ASTEROID_RADIUS: f32 = 40.0;

fn spawn_scenario(mut commands: Commands, seed: Res<ScenarioSeed>, mut scenario: ResMut<Scenario>) {
    let mut rng = seed.value;

    let station = spawn_station(&mut commands, StationKind::Outpost, Vec3::ZERO);
    let ship = spawn_ship(
        &mut commands,
        ShipKind::PlayerShip,
        "Ship-Player",
        Transform::from_translation(SHIP_START),
        &mut rng,
    );
    let traffic = spawn_ship(
        &mut commands,
        ShipKind::Scout,
        "Ship-Scout",
        Transform::from_translation(TRAFFIC_START),
        &mut rng,
    );
    commands.spawn((
        Name::new("Asteroid"),
        Transform::from_translation(ASTEROID_LOCATION),
        Velocity::default(),
        Hull {
            radius: ASTEROID_RADIUS,
            movable: true,
        },
    ));

    info!(
        "Scenario ready: ship at ({:.0}, {:.0}, {:.0}), outpost spinning at {} deg/s",
        SHIP_START.x, SHIP_START.y, SHIP_START.z, STATION_SPIN
    );

    scenario.ship = Some(ship);
    scenario.station = Some(station);
    scenario.traffic = Some(traffic);
    scenario.requested = false;
    scenario.ticks = 0;
}

fn spawn_station(commands: &mut Commands, kind: StationKind, location: Vec3) -> Entity {
    commands
        .spawn((
            Station { kind },
            Name::new("Outpost"),
            Transform::from_translation(location),
            Velocity::new(Vec3::ZERO, Vec3::new(0.0, 0.0, STATION_SPIN)),
            RigidBody {
                mass: station_mass(kind),
                local_center_of_mass: Vec3::ZERO,
            },
            Hull {
                radius: station_radius(kind),
                movable: false,
            },
            DockingBay::new(station_dock_slots(kind)),
        ))
        .id()
}

fn spawn_ship(
    commands: &mut Commands,
    kind: ShipKind,
    name: &str,
    transform: Transform,
    rng: &mut u64,
) -> Entity {
    let anticollision_angle = next_unit(rng) * 360.0;
    let radius = ship_radius(kind);

    commands
        .spawn((
            (
                Ship { kind },
                Name::new(name.to_string()),
                transform,
                Velocity::default(),
                RigidBody {
                    mass: ship_mass(kind),
                    local_center_of_mass: Vec3::ZERO,
                },
                Hull {
                    radius,
                    movable: true,
                },
            ),
            (
                Engines::standard_layout(kind),
                NavigationState::new(ShipLimits::for_kind(kind), anticollision_angle),
                NavigationData::default(),
                DockPort {
                    local_location: Vec3::new(radius, 0.0, 0.0),
                },
                ShipDamage::default(),
                ActuationOutput::default(),
                PilotInput::default(),
            ),
        ))
        .id()
}

fn issue_scenario_requests(
    mut scenario: ResMut<Scenario>,
    mut requests: MessageWriter<NavigationRequest>,
) {
    if scenario.requested {
        return;
    }
    let (Some(ship), Some(station)) = (scenario.ship, scenario.station) else {
        return;
    };

    requests.write(NavigationRequest {
        ship,
        kind: NavigationRequestKind::DockAt { station },
    });
    if let Some(traffic) = scenario.traffic {
        requests.write(NavigationRequest {
            ship: traffic,
            kind: NavigationRequestKind::NavigateTo {
                target: TRAFFIC_TARGET,
            },
        });
    }
    scenario.requested = true;
}

fn watch_scenario(
    mut scenario: ResMut<Scenario>,
    mut docked: MessageReader<ShipDocked>,
    mut results: MessageReader<NavigationRequestResult>,
    mut exit: MessageWriter<AppExit>,
    mut log: ResMut<EventLog>,
) {
    let Some(ship) = scenario.ship else {
        return;
    };
    scenario.ticks += 1;

    for result in results.read() {
        if result.ship == ship && !result.accepted {
            warn!("Scenario ship request '{}' rejected", result.kind.label());
            log.push(format!("Scenario aborted: {} rejected", result.kind.label()));
            exit.write(AppExit::error());
            return;
        }
    }

    if let Some(event) = docked.read().find(|event| event.ship == ship) {
        info!(
            "Scenario complete after {} ticks: docked at slot {}",
            scenario.ticks, event.slot
        );
        log.push(format!("Scenario complete after {} ticks", scenario.ticks));
        exit.write(AppExit::Success);
        return;
    }

    if scenario.ticks >= scenario.max_ticks {
        warn!("Scenario gave up after {} ticks without docking", scenario.ticks);
        log.push("Scenario timed out".to_string());
        exit.write(AppExit::error());
    }
}

fn next_unit(state: &mut u64) -> f32 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    let value = (*state >> 33) as u32;
    (value as f32) / (u32::MAX as f32)
}
