// ── Domain model ──
//
// Plain data shared by every part of the engine. Nothing in here talks to
// a controller.

pub mod card;
pub mod device;
pub mod device_id;

use std::collections::BTreeMap;

pub use card::{CardPermission, DOORS_PER_DEVICE, DoorAccess};
pub use device::{Device, TimeProfile, TimeSegment};
pub use device_id::DeviceId;

/// Cards stored on one controller, keyed by card number.
pub type CardTable = BTreeMap<u32, CardPermission>;

/// Card tables for a set of controllers.
pub type Acl = BTreeMap<DeviceId, CardTable>;
