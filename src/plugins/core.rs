use bevy::prelude::*;

use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub struct CorePlugin;

#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    pub tick_hz: f32,
    pub paused: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 10.0,
            paused: false,
        }
    }
}

/// Tuning of the guidance and docking controllers.
#[derive(Resource, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Degrees. Misalignment below this is treated as zero.
    pub angular_dead_angle: f32,
    /// Meters. Distance below this is treated as zero.
    pub linear_dead_distance: f32,
    /// Speed ceiling for precise approaches, m/s.
    pub linear_max_docking_velocity: f32,
    /// Fraction of the speed ceiling under which a velocity error is negligible.
    pub negligible_speed_ratio: f32,
    /// Distance to the nearest vehicle under which anticollision starts blending, meters.
    pub anticollision_distance: f32,
    /// Bodies larger than this are never pathfinding obstacles, meters.
    pub obstacle_max_radius: f32,
    /// How far behind the ship the retreat point is placed when undocking, meters.
    pub undock_retreat_distance: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            angular_dead_angle: 0.5,
            linear_dead_distance: 0.1,
            linear_max_docking_velocity: 10.0,
            negligible_speed_ratio: 0.0005,
            anticollision_distance: 50.0,
            obstacle_max_radius: 1000.0,
            undock_retreat_distance: 50.0,
        }
    }
}

pub const NAVIGATION_CONFIG_PATH: &str = "config/navigation.ron";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Load the navigation tuning, falling back to defaults when the file does not exist.
pub fn load_navigation_config(path: &Path) -> Result<NavigationConfig, PersistenceError> {
    if !path.exists() {
        return Ok(NavigationConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    Ok(ron::de::from_str::<NavigationConfig>(&contents)?)
}

#[derive(Resource, Debug)]
pub struct EventLog {
    entries: Vec<String>,
    max_entries: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 8,
        }
    }
}

impl EventLog {
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(0..overflow);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        let config = SimConfig::default();
        let fixed_time = fixed_time_from_config(&config);
        let navigation = match load_navigation_config(Path::new(NAVIGATION_CONFIG_PATH)) {
            Ok(navigation) => navigation,
            Err(error) => {
                error!("Navigation config load failed: {}", error);
                NavigationConfig::default()
            }
        };

        app.insert_resource(config)
            .insert_resource(fixed_time)
            .insert_resource(navigation)
            .init_resource::<EventLog>()
            .add_systems(Startup, log_startup);
    }
}

fn log_startup(config: Res<SimConfig>, navigation: Res<NavigationConfig>, mut log: ResMut<EventLog>) {
    info!(
        "Sim running at {} Hz (dead distance {} m, dead angle {} deg)",
        config.tick_hz, navigation.linear_dead_distance, navigation.angular_dead_angle
    );
    log.push(format!("Sim running at {} Hz", config.tick_hz));
}

pub fn sim_not_paused(config: Res<SimConfig>) -> bool {
    !config.paused
}

pub fn fixed_time_from_config(config: &SimConfig) -> Time<Fixed> {
    let tick_hz = if config.tick_hz <= 0.0 {
        10.0
    } else {
        config.tick_hz
    };
    let seconds = 1.0 / tick_hz;
    Time::<Fixed>::from_duration(Duration::from_secs_f32(seconds))
}
