// ── Per-controller card diff ──
//
// Classifies every card number appearing in either table as unchanged,
// updated, added or deleted. Pure: no I/O, deterministic output order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::{Acl, CardPermission, CardTable, DeviceId};

/// Decides whether a stored card already matches the desired one.
pub trait CardEquivalence: Send + Sync {
    fn equivalent(&self, current: &CardPermission, desired: &CardPermission) -> bool;
}

/// Compares card number, validity dates and all four door values. PINs are
/// not compared, so a PIN-only change never produces a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnorePin;

/// Everything `IgnorePin` compares, plus the keypad PIN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchPin;

impl CardEquivalence for IgnorePin {
    fn equivalent(&self, current: &CardPermission, desired: &CardPermission) -> bool {
        current.card_number == desired.card_number
            && current.from == desired.from
            && current.to == desired.to
            && current.doors == desired.doors
    }
}

impl CardEquivalence for MatchPin {
    fn equivalent(&self, current: &CardPermission, desired: &CardPermission) -> bool {
        IgnorePin.equivalent(current, desired) && current.pin == desired.pin
    }
}

/// Outcome of comparing one controller's cards against the desired cards.
///
/// All four lists are disjoint and sorted by card number. `unchanged` and
/// `deleted` hold the stored records, `updated` and `added` the desired ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub unchanged: Vec<CardPermission>,
    pub updated: Vec<CardPermission>,
    pub added: Vec<CardPermission>,
    pub deleted: Vec<CardPermission>,
}

impl Diff {
    /// Returns `true` if applying this diff would not write anything.
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    /// Number of writes needed to apply this diff.
    pub fn changes(&self) -> usize {
        self.updated.len() + self.added.len() + self.deleted.len()
    }
}

/// Diff a single controller's stored cards against the desired cards.
pub fn compare<E>(device: DeviceId, current: &CardTable, desired: &CardTable, eq: &E) -> Diff
where
    E: CardEquivalence + ?Sized,
{
    let mut diff = Diff::default();
    let numbers: BTreeSet<u32> = current.keys().chain(desired.keys()).copied().collect();

    for number in numbers {
        match (current.get(&number), desired.get(&number)) {
            (Some(stored), Some(wanted)) => {
                if eq.equivalent(stored, wanted) {
                    diff.unchanged.push(stored.clone());
                } else {
                    diff.updated.push(wanted.clone());
                }
            }
            (None, Some(wanted)) => diff.added.push(wanted.clone()),
            (Some(stored), None) => diff.deleted.push(stored.clone()),
            (None, None) => {}
        }
    }

    trace!(
        device = %device,
        unchanged = diff.unchanged.len(),
        updated = diff.updated.len(),
        added = diff.added.len(),
        deleted = diff.deleted.len(),
        "compared card tables"
    );
    diff
}

/// Diff every controller appearing in either ACL. A controller missing from
/// one side is treated as having no cards there.
pub fn compare_acl<E>(current: &Acl, desired: &Acl, eq: &E) -> BTreeMap<DeviceId, Diff>
where
    E: CardEquivalence + ?Sized,
{
    let empty = CardTable::new();
    let devices: BTreeSet<DeviceId> = current.keys().chain(desired.keys()).copied().collect();

    devices
        .into_iter()
        .map(|device| {
            let stored = current.get(&device).unwrap_or(&empty);
            let wanted = desired.get(&device).unwrap_or(&empty);
            (device, compare(device, stored, wanted, eq))
        })
        .collect()
}
