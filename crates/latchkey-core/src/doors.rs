// ── Door name resolution ──
//
// Grant and revoke address doors by the names configured on each
// controller. The directory is rebuilt from the device list on every call
// since door names can change between operations.

use std::collections::{BTreeMap, HashMap};

use crate::error::CoreError;
use crate::model::{Device, DeviceId};

/// Keyword selecting every door in the fleet.
pub const ALL_DOORS: &str = "ALL";

/// Canonical form of a door name: lower case with all whitespace removed.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns `true` if `doors` is the single keyword `ALL`.
pub fn is_all(doors: &[String]) -> bool {
    matches!(doors, [only] if only.trim().eq_ignore_ascii_case(ALL_DOORS))
}

/// A door resolved to the controller that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorRef {
    pub device: DeviceId,
    /// 1-based door number on `device`.
    pub door: u8,
    /// Name as configured on the controller.
    pub name: String,
}

/// Normalized door name -> owning controller and door.
#[derive(Debug, Default)]
pub struct DoorDirectory {
    doors: HashMap<String, DoorRef>,
}

impl DoorDirectory {
    /// Index every named door. Fails if two doors share a normalized name,
    /// whether on the same controller or on different ones.
    pub fn build(devices: &[Device]) -> Result<Self, CoreError> {
        let mut doors: HashMap<String, DoorRef> = HashMap::new();

        for device in devices {
            for (door, name) in device.named_doors() {
                let key = normalize(name);
                let entry = DoorRef {
                    device: device.id,
                    door,
                    name: name.to_owned(),
                };

                if let Some(existing) = doors.get(&key) {
                    return Err(CoreError::AmbiguousDoor {
                        name: name.to_owned(),
                        normalized: key,
                        first: format!("{}:{} ({})", existing.device, existing.door, existing.name),
                        second: format!("{}:{} ({})", entry.device, entry.door, entry.name),
                    });
                }
                doors.insert(key, entry);
            }
        }

        Ok(Self { doors })
    }

    pub fn lookup(&self, name: &str) -> Option<&DoorRef> {
        self.doors.get(&normalize(name))
    }

    /// Resolve door names, failing on the first unknown one. `["ALL"]`
    /// selects every door in the directory.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<DoorRef>, CoreError> {
        if is_all(names) {
            let mut all: Vec<DoorRef> = self.doors.values().cloned().collect();
            all.sort_by_key(|d| (d.device, d.door));
            return Ok(all);
        }

        names
            .iter()
            .map(|name| {
                self.lookup(name)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownDoor { name: name.clone() })
            })
            .collect()
    }

    /// Resolve door names and group the door numbers by controller.
    pub fn resolve_by_device(
        &self,
        names: &[String],
    ) -> Result<BTreeMap<DeviceId, Vec<u8>>, CoreError> {
        let mut grouped: BTreeMap<DeviceId, Vec<u8>> = BTreeMap::new();
        for door in self.resolve(names)? {
            let doors = grouped.entry(door.device).or_default();
            if !doors.contains(&door.door) {
                doors.push(door.door);
            }
        }
        for doors in grouped.values_mut() {
            doors.sort_unstable();
        }
        Ok(grouped)
    }
}
