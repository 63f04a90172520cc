use bevy::log::LogPlugin;
use bevy::prelude::*;

mod plugins;
mod ships;
mod stations;

fn main() {
    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins((
            plugins::core::CorePlugin,
            plugins::navigation::NavigationPlugin,
            plugins::physics::PhysicsPlugin,
            plugins::saveload::SaveLoadPlugin,
            plugins::scenario::ScenarioPlugin,
        ))
        .run();
}
