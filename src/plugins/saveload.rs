use bevy::ecs::message::MessageReader;
use bevy::prelude::*;

use crate::plugins::core::{EventLog, PersistenceError};
use crate::plugins::navigation::{DockAttachment, NavigationData, NavigationState, ShipStatus};
use crate::ships::DockPort;
use crate::stations::{DockInfo, DockingBay};
use std::fs;
use std::path::{Path, PathBuf};

pub struct SaveLoadPlugin;

impl Plugin for SaveLoadPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NavigationSaveFile>()
            .add_message::<SaveNavigation>()
            .add_message::<LoadNavigation>()
            .add_systems(Update, (handle_save_request, handle_load_request));
    }
}

#[derive(Message, Clone, Copy, Debug, Default)]
pub struct SaveNavigation;

#[derive(Message, Clone, Copy, Debug, Default)]
pub struct LoadNavigation;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct NavigationSave {
    #[serde(default)]
    ships: Vec<ShipNavigationRecord>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct ShipNavigationRecord {
    ship: String,
    #[serde(default)]
    docked_to: Option<String>,
    #[serde(default)]
    docked_at: Option<u32>,
}

const SAVE_PATH: &str = "saves/navigation.ron";

/// Where navigation records are written and read back.
#[derive(Resource, Debug, Clone)]
pub struct NavigationSaveFile {
    pub path: PathBuf,
}

impl Default for NavigationSaveFile {
    fn default() -> Self {
        Self {
            path: PathBuf::from(SAVE_PATH),
        }
    }
}

fn handle_save_request(
    mut requests: MessageReader<SaveNavigation>,
    file: Res<NavigationSaveFile>,
    ships: Query<(&Name, &NavigationData)>,
    mut log: ResMut<EventLog>,
) {
    if requests.read().count() == 0 {
        return;
    }

    let payload = NavigationSave {
        ships: ships
            .iter()
            .map(|(name, data)| ShipNavigationRecord {
                ship: name.as_str().to_string(),
                docked_to: data.docked_to.clone(),
                docked_at: data.docked_at,
            })
            .collect(),
    };

    match write_save_file(&file.path, &payload) {
        Ok(()) => {
            info!(
                "Saved navigation for {} ships to {}",
                payload.ships.len(),
                file.path.display()
            );
            log.push(format!("Saved to {}", file.path.display()));
        }
        Err(error) => {
            error!("Save failed: {}", error);
            log.push(format!("Save failed: {}", error));
        }
    }
}

type LoadShipQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static Name,
        &'static mut Transform,
        &'static DockPort,
        &'static mut NavigationState,
        &'static mut NavigationData,
        Option<&'static DockAttachment>,
    ),
    Without<DockingBay>,
>;

fn handle_load_request(
    mut requests: MessageReader<LoadNavigation>,
    file: Res<NavigationSaveFile>,
    mut commands: Commands,
    mut ships: LoadShipQuery,
    mut stations: Query<(Entity, &Name, &Transform, &mut DockingBay)>,
    mut log: ResMut<EventLog>,
) {
    if requests.read().count() == 0 {
        return;
    }

    let loaded = match read_save_file(&file.path) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => {
            warn!("No save found at {}", file.path.display());
            log.push("No save found".to_string());
            return;
        }
        Err(error) => {
            error!("Load failed: {}", error);
            log.push(format!("Load failed: {}", error));
            return;
        }
    };

    let mut restored = 0;
    for record in &loaded.ships {
        let Some((entity, _, mut transform, port, mut nav, mut data, attachment)) = ships
            .iter_mut()
            .find(|(_, name, ..)| name.as_str() == record.ship)
        else {
            warn!("Saved ship '{}' not found", record.ship);
            continue;
        };

        // Drop whatever the ship was doing, including any dock it holds
        for grant in nav.abort_all_commands() {
            if let Ok((_, _, _, mut bay)) = stations.get_mut(grant.station) {
                bay.release_dock(entity, grant.slot);
            }
        }
        if let Some(attachment) = attachment {
            if let Ok((_, _, _, mut bay)) = stations.get_mut(attachment.station) {
                bay.release_dock(entity, attachment.slot);
            }
            commands.entity(entity).remove::<DockAttachment>();
        }
        nav.set_status(ShipStatus::Manual);
        *data = NavigationData::default();

        if let (Some(station_name), Some(slot)) = (&record.docked_to, record.docked_at) {
            let station = stations
                .iter_mut()
                .find(|(_, name, ..)| name.as_str() == station_name.as_str());
            let Some((station, _, station_transform, mut bay)) = station else {
                warn!("Saved dock station '{}' not found", station_name);
                continue;
            };
            let Some(dock) = bay.dock_info(slot) else {
                warn!("Saved dock slot {} does not exist at '{}'", slot, station_name);
                continue;
            };
            if !bay.dock(entity, slot) {
                warn!("Saved dock slot {} at '{}' is taken", slot, station_name);
                continue;
            }

            *transform = docked_pose(port.local_location, station_transform, &dock);
            nav.set_status(ShipStatus::Docked);
            data.docked_to = Some(station_name.clone());
            data.docked_at = Some(slot);
            commands
                .entity(entity)
                .insert(DockAttachment::new(station, slot, station_transform, &transform));
        }
        restored += 1;
    }

    info!("Loaded navigation for {} ships from {}", restored, file.path.display());
    log.push(format!("Loaded {} ships from {}", restored, file.path.display()));
}

/// Ship transform with its dock port on the slot, facing into the station.
fn docked_pose(port_location: Vec3, station_transform: &Transform, dock: &DockInfo) -> Transform {
    let dock_location = station_transform.transform_point(dock.local_location);
    let dock_axis = (station_transform.rotation * dock.local_axis).normalize_or_zero();
    let rotation = if dock_axis == Vec3::ZERO {
        station_transform.rotation
    } else {
        Quat::from_rotation_arc(Vec3::X, -dock_axis)
    };

    Transform {
        translation: dock_location - rotation * port_location,
        rotation,
        scale: Vec3::ONE,
    }
}

fn read_save_file(path: &Path) -> Result<Option<NavigationSave>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    Ok(Some(ron::de::from_str::<NavigationSave>(&contents)?))
}

fn write_save_file(path: &Path, payload: &NavigationSave) -> Result<(), PersistenceError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("saves"));
    fs::create_dir_all(dir)?;

    let serialized = ron::ser::to_string_pretty(payload, ron::ser::PrettyConfig::default())?;
    fs::write(path, serialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::navigation::NavCommand;
    use crate::ships::{ShipKind, ShipLimits};
    use crate::stations::DockSlot;
    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;

    const PORT: Vec3 = Vec3::new(3.0, 0.0, 0.0);

    fn sample() -> NavigationSave {
        NavigationSave {
            ships: vec![
                ShipNavigationRecord {
                    ship: "Kestrel".to_string(),
                    docked_to: Some("Outpost".to_string()),
                    docked_at: Some(1),
                },
                ShipNavigationRecord {
                    ship: "Scout-2".to_string(),
                    docked_to: None,
                    docked_at: None,
                },
            ],
        }
    }

    #[test]
    fn save_file_round_trips_through_ron() {
        let dir = std::env::temp_dir().join(format!("starpilot-save-{}", std::process::id()));
        let path = dir.join("navigation.ron");

        write_save_file(&path, &sample()).expect("save written");
        let loaded = read_save_file(&path).expect("save read");
        assert_eq!(loaded, Some(sample()));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_save_file_is_not_an_error() {
        let loaded = read_save_file(Path::new("saves/does-not-exist.ron"));
        assert!(matches!(loaded, Ok(None)));
    }

    #[test]
    fn record_without_dock_fields_parses() {
        let parsed = ron::de::from_str::<NavigationSave>("(ships: [(ship: \"Kestrel\")])");
        let save = parsed.expect("record parses");
        assert_eq!(save.ships[0].docked_to, None);
        assert_eq!(save.ships[0].docked_at, None);
    }

    #[test]
    fn docked_pose_puts_port_on_slot_facing_station() {
        let station_transform = Transform::from_xyz(100.0, 0.0, 0.0);
        let dock = DockInfo {
            local_location: Vec3::new(0.0, 20.0, 0.0),
            local_axis: Vec3::Y,
        };
        let port = Vec3::new(3.0, 0.0, 0.0);

        let pose = docked_pose(port, &station_transform, &dock);
        assert!((pose.transform_point(port) - Vec3::new(100.0, 20.0, 0.0)).length() < 0.001);
        assert!((pose.rotation * Vec3::X - Vec3::NEG_Y).length() < 0.001);
    }

    fn record(docked_to: Option<&str>, docked_at: Option<u32>) -> NavigationSave {
        NavigationSave {
            ships: vec![ShipNavigationRecord {
                ship: "Kestrel".to_string(),
                docked_to: docked_to.map(str::to_string),
                docked_at,
            }],
        }
    }

    /// World whose save file holds `save`, with one ship and a two-slot outpost.
    fn load_world(label: &str, save: &NavigationSave) -> (World, Entity, Entity, PathBuf) {
        let dir = std::env::temp_dir().join(format!("starpilot-load-{}-{}", label, std::process::id()));
        let path = dir.join("navigation.ron");
        write_save_file(&path, save).expect("save written");

        let mut world = World::default();
        world.insert_resource(NavigationSaveFile { path });
        world.init_resource::<EventLog>();
        world.init_resource::<Messages<LoadNavigation>>();

        let ship = world
            .spawn((
                Name::new("Kestrel"),
                Transform::IDENTITY,
                DockPort {
                    local_location: PORT,
                },
                NavigationState::new(ShipLimits::for_kind(ShipKind::PlayerShip), 0.0),
                NavigationData::default(),
            ))
            .id();
        let station = world
            .spawn((
                Name::new("Outpost"),
                Transform::from_xyz(100.0, 0.0, 0.0),
                DockingBay::new(vec![
                    DockSlot::new(Vec3::new(10.0, 0.0, 0.0), Vec3::X),
                    DockSlot::new(Vec3::new(0.0, 20.0, 0.0), Vec3::Y),
                ]),
            ))
            .id();
        (world, ship, station, dir)
    }

    fn run_load(world: &mut World) {
        world.resource_mut::<Messages<LoadNavigation>>().write(LoadNavigation);
        world
            .run_system_once(handle_load_request)
            .expect("load handler runs");
    }

    #[test]
    fn load_restores_docked_ship_into_its_slot() {
        let (mut world, ship, station, dir) = load_world("docked", &record(Some("Outpost"), Some(1)));

        run_load(&mut world);

        let nav = world.get::<NavigationState>(ship).expect("navigation");
        assert_eq!(nav.status(), ShipStatus::Docked);
        let data = world.get::<NavigationData>(ship).expect("data");
        assert_eq!(data.docked_to.as_deref(), Some("Outpost"));
        assert_eq!(data.docked_at, Some(1));
        let bay = world.get::<DockingBay>(station).expect("bay");
        assert!(bay.is_docked(ship));
        let attachment = world.get::<DockAttachment>(ship).expect("attachment");
        assert_eq!((attachment.station, attachment.slot), (station, 1));
        let transform = world.get::<Transform>(ship).expect("transform");
        assert!((transform.transform_point(PORT) - Vec3::new(100.0, 20.0, 0.0)).length() < 0.001);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn load_of_undocked_record_frees_docked_ship() {
        let (mut world, ship, station, dir) = load_world("undocked", &record(None, None));
        world
            .get_mut::<DockingBay>(station)
            .expect("bay")
            .dock(ship, 0);
        world.entity_mut(ship).insert(DockAttachment {
            station,
            slot: 0,
            local: Transform::IDENTITY,
        });
        world
            .get_mut::<NavigationState>(ship)
            .expect("navigation")
            .set_status(ShipStatus::Docked);
        world.get_mut::<NavigationData>(ship).expect("data").docked_to = Some("Outpost".to_string());

        run_load(&mut world);

        let nav = world.get::<NavigationState>(ship).expect("navigation");
        assert!(nav.is_manual_pilot());
        assert_eq!(world.get::<NavigationData>(ship), Some(&NavigationData::default()));
        assert!(world.get::<DockAttachment>(ship).is_none());
        let bay = world.get::<DockingBay>(station).expect("bay");
        assert!(!bay.is_docked(ship));
        assert!(!bay.is_granted(ship));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn load_naming_missing_station_leaves_ship_manual() {
        let (mut world, ship, station, dir) = load_world("missing", &record(Some("Nowhere"), Some(0)));
        {
            let grant = world
                .get_mut::<DockingBay>(station)
                .expect("bay")
                .request_dock(station, &Transform::from_xyz(100.0, 0.0, 0.0), ship, Vec3::ZERO);
            world
                .get_mut::<NavigationState>(ship)
                .expect("navigation")
                .push_command(NavCommand::Dock { grant });
        }

        run_load(&mut world);

        let nav = world.get::<NavigationState>(ship).expect("navigation");
        assert!(nav.is_manual_pilot());
        assert!(nav.commands().is_empty());
        assert_eq!(world.get::<NavigationData>(ship), Some(&NavigationData::default()));
        assert!(world.get::<DockAttachment>(ship).is_none());
        let bay = world.get::<DockingBay>(station).expect("bay");
        assert!(!bay.is_granted(ship));

        let _ = fs::remove_dir_all(dir);
    }
}
