use bevy::prelude::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StationKind {
    Outpost,
    Shipyard,
    Refinery,
}

#[derive(Component, Debug)]
pub struct Station {
    pub kind: StationKind,
}

/// Location and axis of a dock slot, in station local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockInfo {
    pub local_location: Vec3,
    /// Outward direction of the dock.
    pub local_axis: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockSlot {
    pub info: DockInfo,
    pub granted_to: Option<Entity>,
    pub docked: Option<Entity>,
}

impl DockSlot {
    pub fn new(local_location: Vec3, local_axis: Vec3) -> Self {
        Self {
            info: DockInfo {
                local_location,
                local_axis: local_axis.normalize_or_zero(),
            },
            granted_to: None,
            docked: None,
        }
    }

    fn is_free(&self) -> bool {
        self.granted_to.is_none() && self.docked.is_none()
    }
}

/// Answer to a dock request. Holding an accepted grant is the only way to use a slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DockGrant {
    pub station: Entity,
    pub slot: u32,
    pub granted: bool,
}

/// Dock slots owned by a station. At most one ship may hold a slot at a time.
#[derive(Component, Debug, Default)]
pub struct DockingBay {
    slots: Vec<DockSlot>,
}

impl DockingBay {
    pub fn new(slots: Vec<DockSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[DockSlot] {
        &self.slots
    }

    /// Grant the free slot closest to `ship_location`. A ship that already holds a slot
    /// gets the same slot back.
    pub fn request_dock(
        &mut self,
        station: Entity,
        station_transform: &Transform,
        ship: Entity,
        ship_location: Vec3,
    ) -> DockGrant {
        if let Some(index) = self.slot_of(ship) {
            return DockGrant {
                station,
                slot: index as u32,
                granted: true,
            };
        }

        let closest = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_free())
            .map(|(index, slot)| {
                let location = station_transform.transform_point(slot.info.local_location);
                (index, location.distance_squared(ship_location))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match closest {
            Some((index, _)) => {
                self.slots[index].granted_to = Some(ship);
                DockGrant {
                    station,
                    slot: index as u32,
                    granted: true,
                }
            }
            None => DockGrant {
                station,
                slot: 0,
                granted: false,
            },
        }
    }

    /// Mark the ship as docked in a slot it was granted. Returns false for foreign slots.
    pub fn dock(&mut self, ship: Entity, slot: u32) -> bool {
        let Some(entry) = self.slots.get_mut(slot as usize) else {
            return false;
        };

        if entry.granted_to.is_some_and(|granted| granted != ship)
            || entry.docked.is_some_and(|docked| docked != ship)
        {
            return false;
        }

        entry.granted_to = Some(ship);
        entry.docked = Some(ship);
        true
    }

    pub fn release_dock(&mut self, ship: Entity, slot: u32) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            if entry.granted_to == Some(ship) {
                entry.granted_to = None;
            }
            if entry.docked == Some(ship) {
                entry.docked = None;
            }
        }
    }

    pub fn dock_info(&self, slot: u32) -> Option<DockInfo> {
        self.slots.get(slot as usize).map(|slot| slot.info)
    }

    pub fn is_granted(&self, ship: Entity) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.granted_to == Some(ship) && slot.docked != Some(ship))
    }

    pub fn is_docked(&self, ship: Entity) -> bool {
        self.slots.iter().any(|slot| slot.docked == Some(ship))
    }

    fn slot_of(&self, ship: Entity) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.granted_to == Some(ship) || slot.docked == Some(ship))
    }
}

pub fn station_radius(kind: StationKind) -> f32 {
    match kind {
        StationKind::Outpost => 60.0,
        StationKind::Shipyard => 140.0,
        StationKind::Refinery => 90.0,
    }
}

pub fn station_mass(kind: StationKind) -> f32 {
    match kind {
        StationKind::Outpost => 2.0e6,
        StationKind::Shipyard => 9.0e6,
        StationKind::Refinery => 5.0e6,
    }
}

/// Dock slots spread around the station equator, facing outward.
pub fn station_dock_slots(kind: StationKind) -> Vec<DockSlot> {
    let count = match kind {
        StationKind::Outpost => 2,
        StationKind::Shipyard => 6,
        StationKind::Refinery => 4,
    };
    let radius = station_radius(kind);

    (0..count)
        .map(|index| {
            let angle = std::f32::consts::TAU * index as f32 / count as f32;
            let axis = Vec3::new(angle.cos(), angle.sin(), 0.0);
            DockSlot::new(axis * radius, axis)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bay_with_two_slots() -> DockingBay {
        DockingBay::new(vec![
            DockSlot::new(Vec3::new(10.0, 0.0, 0.0), Vec3::X),
            DockSlot::new(Vec3::new(-10.0, 0.0, 0.0), Vec3::NEG_X),
        ])
    }

    #[test]
    fn request_dock_grants_closest_free_slot() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = bay_with_two_slots();

        let grant = bay.request_dock(station, &Transform::IDENTITY, ship, Vec3::new(-50.0, 0.0, 0.0));
        assert!(grant.granted);
        assert_eq!(grant.slot, 1);
        assert_eq!(grant.station, station);
        assert!(bay.is_granted(ship));
        assert!(!bay.is_docked(ship));
    }

    #[test]
    fn request_dock_is_denied_when_full() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let first = world.spawn_empty().id();
        let second = world.spawn_empty().id();
        let third = world.spawn_empty().id();
        let mut bay = bay_with_two_slots();

        assert!(bay.request_dock(station, &Transform::IDENTITY, first, Vec3::ZERO).granted);
        assert!(bay.request_dock(station, &Transform::IDENTITY, second, Vec3::ZERO).granted);
        let denied = bay.request_dock(station, &Transform::IDENTITY, third, Vec3::ZERO);
        assert!(!denied.granted);
    }

    #[test]
    fn repeated_request_returns_same_slot() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = bay_with_two_slots();

        let first = bay.request_dock(station, &Transform::IDENTITY, ship, Vec3::new(50.0, 0.0, 0.0));
        let second = bay.request_dock(station, &Transform::IDENTITY, ship, Vec3::new(-50.0, 0.0, 0.0));
        assert_eq!(first, second);
    }

    #[test]
    fn dock_rejects_ship_without_grant_on_taken_slot() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let owner = world.spawn_empty().id();
        let intruder = world.spawn_empty().id();
        let mut bay = bay_with_two_slots();

        let grant = bay.request_dock(station, &Transform::IDENTITY, owner, Vec3::new(50.0, 0.0, 0.0));
        assert!(!bay.dock(intruder, grant.slot));
        assert!(bay.dock(owner, grant.slot));
        assert!(bay.is_docked(owner));
        assert!(!bay.is_granted(owner));
    }

    #[test]
    fn release_dock_frees_slot() {
        let mut world = World::default();
        let station = world.spawn_empty().id();
        let ship = world.spawn_empty().id();
        let mut bay = bay_with_two_slots();

        let grant = bay.request_dock(station, &Transform::IDENTITY, ship, Vec3::ZERO);
        bay.dock(ship, grant.slot);
        bay.release_dock(ship, grant.slot);
        assert!(!bay.is_docked(ship));
        assert!(!bay.is_granted(ship));
        assert!(bay.slots().iter().all(|slot| slot.is_free()));
    }

    #[test]
    fn dock_info_out_of_range_is_none() {
        let bay = bay_with_two_slots();
        assert!(bay.dock_info(5).is_none());
        assert_eq!(bay.dock_info(0).map(|info| info.local_axis), Some(Vec3::X));
    }

    #[test]
    fn station_dock_slots_face_outward() {
        for slot in station_dock_slots(StationKind::Shipyard) {
            let outward = slot.info.local_location.normalize();
            assert!(outward.dot(slot.info.local_axis) > 0.999);
        }
    }
}
