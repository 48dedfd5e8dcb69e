// ── Card permission types ──
//
// A card record as stored on a controller: validity window, one access
// value per door and an optional keypad PIN.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of doors a controller record carries.
pub const DOORS_PER_DEVICE: usize = 4;

/// Access granted to a card for a single door.
///
/// Encoded on the wire as one byte: 0 denied, 1 always, 2..=254 the id of a
/// time profile stored on the same controller, 255 reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DoorAccess {
    Denied,
    Always,
    Profile(u8),
    Reserved,
}

impl DoorAccess {
    pub const FIRST_PROFILE: u8 = 2;
    pub const LAST_PROFILE: u8 = 254;

    /// Access value for a grant: a time profile when `profile` is a valid
    /// profile id, unrestricted otherwise.
    pub fn for_grant(profile: Option<u8>) -> Self {
        match profile {
            Some(id) if Self::is_profile_id(id) => Self::Profile(id),
            _ => Self::Always,
        }
    }

    pub fn is_profile_id(value: u8) -> bool {
        (Self::FIRST_PROFILE..=Self::LAST_PROFILE).contains(&value)
    }

    /// True if the door opens for this card at some point in time.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Always | Self::Profile(_))
    }

    pub fn time_profile(self) -> Option<u8> {
        match self {
            Self::Profile(id) => Some(id),
            _ => None,
        }
    }
}

impl From<u8> for DoorAccess {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Denied,
            1 => Self::Always,
            255 => Self::Reserved,
            id => Self::Profile(id),
        }
    }
}

impl From<DoorAccess> for u8 {
    fn from(access: DoorAccess) -> Self {
        match access {
            DoorAccess::Denied => 0,
            DoorAccess::Always => 1,
            DoorAccess::Profile(id) => id,
            DoorAccess::Reserved => 255,
        }
    }
}

impl fmt::Display for DoorAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denied => f.write_str("N"),
            Self::Always => f.write_str("Y"),
            Self::Profile(id) => write!(f, "{id}"),
            Self::Reserved => f.write_str("-"),
        }
    }
}

/// A single card record on a single controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPermission {
    pub card_number: u32,
    /// First valid day (inclusive). `None` if the record carries no date.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Last valid day (inclusive).
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Access per door, index 0 is door 1. `None` if the record has no value.
    #[serde(default)]
    pub doors: [Option<DoorAccess>; DOORS_PER_DEVICE],
    /// Keypad PIN, 0 when unset.
    #[serde(default)]
    pub pin: u32,
}

impl CardPermission {
    pub fn new(
        card_number: u32,
        from: NaiveDate,
        to: NaiveDate,
        doors: [DoorAccess; DOORS_PER_DEVICE],
    ) -> Self {
        Self {
            card_number,
            from: Some(from),
            to: Some(to),
            doors: doors.map(Some),
            pin: 0,
        }
    }

    /// A record with no dates and every door denied. Used as the starting
    /// point when granting a card a controller doesn't know yet.
    pub fn denied(card_number: u32) -> Self {
        Self {
            card_number,
            from: None,
            to: None,
            doors: [Some(DoorAccess::Denied); DOORS_PER_DEVICE],
            pin: 0,
        }
    }

    #[must_use]
    pub fn with_pin(mut self, pin: u32) -> Self {
        self.pin = pin;
        self
    }

    /// Access value for a 1-based door number.
    pub fn door(&self, door: u8) -> Option<DoorAccess> {
        let slot = door.checked_sub(1)?;
        self.doors.get(usize::from(slot)).copied().flatten()
    }

    /// Set the access value for a 1-based door number. Out of range door
    /// numbers are ignored.
    pub fn set_door(&mut self, door: u8, access: DoorAccess) {
        if let Some(slot) = door
            .checked_sub(1)
            .and_then(|i| self.doors.get_mut(usize::from(i)))
        {
            *slot = Some(access);
        }
    }

    /// A card is revoked on a controller when none of its doors is
    /// `Always` or a time profile. Denied, reserved and missing values all
    /// count as closed.
    pub fn is_revoked(&self) -> bool {
        !self.doors.iter().flatten().any(|d| d.is_active())
    }

    /// Time profiles referenced by any door, ascending.
    pub fn time_profiles(&self) -> BTreeSet<u8> {
        self.doors
            .iter()
            .flatten()
            .filter_map(|d| d.time_profile())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn door_access_round_trips_raw_values() {
        for raw in [0u8, 1, 2, 29, 254, 255] {
            assert_eq!(u8::from(DoorAccess::from(raw)), raw);
        }
        assert_eq!(DoorAccess::from(0), DoorAccess::Denied);
        assert_eq!(DoorAccess::from(1), DoorAccess::Always);
        assert_eq!(DoorAccess::from(29), DoorAccess::Profile(29));
        assert_eq!(DoorAccess::from(255), DoorAccess::Reserved);
    }

    #[test]
    fn for_grant_only_uses_valid_profile_ids() {
        assert_eq!(DoorAccess::for_grant(None), DoorAccess::Always);
        assert_eq!(DoorAccess::for_grant(Some(0)), DoorAccess::Always);
        assert_eq!(DoorAccess::for_grant(Some(1)), DoorAccess::Always);
        assert_eq!(DoorAccess::for_grant(Some(2)), DoorAccess::Profile(2));
        assert_eq!(DoorAccess::for_grant(Some(254)), DoorAccess::Profile(254));
        assert_eq!(DoorAccess::for_grant(Some(255)), DoorAccess::Always);
    }

    #[test]
    fn revoked_ignores_reserved_and_missing_values() {
        let mut card = CardPermission::denied(10_058_400);
        assert!(card.is_revoked());

        card.doors = [Some(DoorAccess::Reserved), None, Some(DoorAccess::Denied), None];
        assert!(card.is_revoked());

        card.set_door(4, DoorAccess::Profile(29));
        assert!(!card.is_revoked());
    }

    #[test]
    fn set_door_is_one_based_and_bounded() {
        let mut card = CardPermission::denied(1);
        card.set_door(1, DoorAccess::Always);
        card.set_door(0, DoorAccess::Always);
        card.set_door(5, DoorAccess::Always);
        assert_eq!(card.door(1), Some(DoorAccess::Always));
        assert_eq!(card.door(2), Some(DoorAccess::Denied));
        assert_eq!(card.door(0), None);
        assert_eq!(card.door(5), None);
    }

    #[test]
    fn time_profiles_are_deduplicated() {
        let card = CardPermission::new(
            1,
            date("2023-01-01"),
            date("2023-12-31"),
            [
                DoorAccess::Profile(29),
                DoorAccess::Always,
                DoorAccess::Profile(29),
                DoorAccess::Profile(3),
            ],
        );
        assert_eq!(card.time_profiles().into_iter().collect::<Vec<_>>(), vec![3, 29]);
    }

    #[test]
    fn card_serializes_doors_as_raw_values() {
        let card = CardPermission::new(
            65537,
            date("2023-01-01"),
            date("2023-12-31"),
            [DoorAccess::Always, DoorAccess::Denied, DoorAccess::Profile(29), DoorAccess::Denied],
        );
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["doors"], serde_json::json!([1, 0, 29, 0]));
        assert_eq!(json["from"], "2023-01-01");

        let back: CardPermission = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }
}
