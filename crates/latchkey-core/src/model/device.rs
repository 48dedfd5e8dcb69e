// ── Controller domain types ──

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::card::DOORS_PER_DEVICE;
use super::device_id::DeviceId;

/// A door controller as reported by the device layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    /// Display names of doors 1..4. Blank entries are unused doors.
    #[serde(default)]
    pub doors: [String; DOORS_PER_DEVICE],
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, doors: [&str; DOORS_PER_DEVICE]) -> Self {
        Self {
            id: id.into(),
            name: None,
            doors: doors.map(str::to_owned),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Configured doors as `(1-based door number, display name)`, skipping
    /// blank entries.
    pub fn named_doors(&self) -> impl Iterator<Item = (u8, &str)> {
        (1u8..).zip(self.doors.iter()).filter_map(|(door, name)| {
            let name = name.trim();
            (!name.is_empty()).then_some((door, name))
        })
    }
}

/// One daily time window of a time profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSegment {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A schedule stored on a controller and referenced from card records by id.
///
/// The reconciliation engine only ever checks that a profile exists; the
/// schedule itself is carried for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeProfile {
    pub id: u8,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Enabled weekdays, Monday first.
    #[serde(default)]
    pub weekdays: [bool; 7],
    #[serde(default)]
    pub segments: Vec<TimeSegment>,
    /// Profile evaluated after this one fails, if any.
    #[serde(default)]
    pub linked_profile: Option<u8>,
}

impl TimeProfile {
    /// A profile with no restrictions beyond its id. Mostly useful in tests
    /// and fleet snapshots.
    pub fn new(id: u8) -> Self {
        Self {
            id,
            from: None,
            to: None,
            weekdays: [true; 7],
            segments: Vec::new(),
            linked_profile: None,
        }
    }
}
