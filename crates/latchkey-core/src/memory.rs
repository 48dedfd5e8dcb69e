// ── In-memory fleet ──
//
// A `DeviceAccess` backend that keeps every controller's card records in
// memory. Behaves like the hardware where the engine can tell: records live
// in numbered slots, deleting leaves a gap, and stores append. Faults can be
// injected per controller and every write is counted.
//
// The CLI persists it as a JSON fleet snapshot between runs.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::device::DeviceAccess;
use crate::error::TransportError;
use crate::model::{CardPermission, CardTable, Device, DeviceId, TimeProfile};

/// Device calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FleetOp {
    CountCards,
    CardByIndex,
    CardById,
    PutCard,
    DeleteCard,
    DeleteAllCards,
    TimeProfile,
}

#[derive(Debug)]
struct Controller {
    info: Device,
    /// Card records by 0-based slot. `None` is a deleted record.
    slots: Vec<Option<CardPermission>>,
    profiles: BTreeMap<u8, TimeProfile>,
    failing: HashSet<FleetOp>,
    declined_cards: HashSet<u32>,
    decline_all: bool,
    writes: usize,
}

impl Controller {
    fn new(info: Device) -> Self {
        Self {
            info,
            slots: Vec::new(),
            profiles: BTreeMap::new(),
            failing: HashSet::new(),
            declined_cards: HashSet::new(),
            decline_all: false,
            writes: 0,
        }
    }

    fn check(&self, op: FleetOp) -> Result<(), TransportError> {
        if self.failing.contains(&op) {
            return Err(TransportError::Timeout { timeout_ms: 5000 });
        }
        Ok(())
    }

    fn declines(&self, card: u32) -> bool {
        self.decline_all || self.declined_cards.contains(&card)
    }

    fn position(&self, card: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|c| c.card_number == card))
    }
}

/// Controllers held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryFleet {
    controllers: DashMap<DeviceId, Controller>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller, replacing any controller with the same id.
    pub fn add_device(&self, device: Device) {
        self.controllers.insert(device.id, Controller::new(device));
    }

    /// Store a card directly, bypassing fault injection and write counting.
    pub fn insert_card(&self, device: DeviceId, card: CardPermission) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            match c.position(card.card_number) {
                Some(i) => c.slots[i] = Some(card),
                None => c.slots.push(Some(card)),
            }
        }
    }

    /// Leave an empty record slot, as a controller does after a delete.
    pub fn insert_gap(&self, device: DeviceId) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            c.slots.push(None);
        }
    }

    pub fn add_time_profile(&self, device: DeviceId, profile: TimeProfile) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            c.profiles.insert(profile.id, profile);
        }
    }

    /// Make every future `op` on `device` time out.
    pub fn fail(&self, device: DeviceId, op: FleetOp) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            c.failing.insert(op);
        }
    }

    /// Make `device` decline every store and delete.
    pub fn decline_writes(&self, device: DeviceId) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            c.decline_all = true;
        }
    }

    /// Make `device` decline stores and deletes of one card.
    pub fn decline_card(&self, device: DeviceId, card: u32) {
        if let Some(mut c) = self.controllers.get_mut(&device) {
            c.declined_cards.insert(card);
        }
    }

    /// Cards currently stored on `device`.
    pub fn cards(&self, device: DeviceId) -> CardTable {
        self.controllers
            .get(&device)
            .map(|c| {
                c.slots
                    .iter()
                    .flatten()
                    .map(|card| (card.card_number, card.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn card(&self, device: DeviceId, card: u32) -> Option<CardPermission> {
        let c = self.controllers.get(&device)?;
        c.position(card).and_then(|i| c.slots[i].clone())
    }

    /// Accepted stores and deletes on `device`, including clears.
    pub fn writes(&self, device: DeviceId) -> usize {
        self.controllers.get(&device).map_or(0, |c| c.writes)
    }

    /// Accepted stores and deletes across the whole fleet.
    pub fn total_writes(&self) -> usize {
        self.controllers.iter().map(|c| c.writes).sum()
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn from_snapshot(snapshot: FleetSnapshot) -> Self {
        let fleet = Self::new();
        for entry in snapshot.devices {
            let mut controller = Controller::new(entry.device);
            controller.slots = entry.cards;
            controller.profiles = entry.profiles.into_iter().map(|p| (p.id, p)).collect();
            fleet.controllers.insert(controller.info.id, controller);
        }
        fleet
    }

    /// Current state, controllers ascending by id. Injected faults are not
    /// part of a snapshot.
    pub fn snapshot(&self) -> FleetSnapshot {
        let mut devices: Vec<DeviceSnapshot> = self
            .controllers
            .iter()
            .map(|c| DeviceSnapshot {
                device: c.info.clone(),
                cards: c.slots.clone(),
                profiles: c.profiles.values().cloned().collect(),
            })
            .collect();
        devices.sort_by_key(|d| d.device.id);
        FleetSnapshot { devices }
    }
}

/// Serialized form of a `MemoryFleet`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(flatten)]
    pub device: Device,
    /// Record slots in index order. `null` is an empty slot.
    #[serde(default)]
    pub cards: Vec<Option<CardPermission>>,
    #[serde(default)]
    pub profiles: Vec<TimeProfile>,
}

// ── DeviceAccess ─────────────────────────────────────────────────────

#[async_trait]
impl DeviceAccess for MemoryFleet {
    async fn list_devices(&self) -> Result<Vec<Device>, TransportError> {
        let mut devices: Vec<Device> = self.controllers.iter().map(|c| c.info.clone()).collect();
        devices.sort_by_key(|d| d.id);
        Ok(devices)
    }

    async fn count_cards(&self, device: DeviceId) -> Result<u32, TransportError> {
        let c = self.controllers.get(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::CountCards)?;
        let count = c.slots.iter().flatten().count();
        u32::try_from(count).map_err(|_| TransportError::Protocol {
            message: format!("card count {count} out of range"),
        })
    }

    async fn card_by_index(
        &self,
        device: DeviceId,
        index: u32,
    ) -> Result<Option<CardPermission>, TransportError> {
        let c = self.controllers.get(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::CardByIndex)?;
        let slot = index
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| c.slots.get(i));
        Ok(slot.cloned().flatten())
    }

    async fn card_by_id(
        &self,
        device: DeviceId,
        card: u32,
    ) -> Result<Option<CardPermission>, TransportError> {
        let c = self.controllers.get(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::CardById)?;
        Ok(c.position(card).and_then(|i| c.slots[i].clone()))
    }

    async fn put_card(
        &self,
        device: DeviceId,
        card: &CardPermission,
    ) -> Result<bool, TransportError> {
        let mut c = self.controllers.get_mut(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::PutCard)?;
        if c.declines(card.card_number) {
            return Ok(false);
        }

        match c.position(card.card_number) {
            Some(i) => c.slots[i] = Some(card.clone()),
            None => c.slots.push(Some(card.clone())),
        }
        c.writes += 1;
        trace!(device = %device, card = card.card_number, "stored card");
        Ok(true)
    }

    async fn delete_card(&self, device: DeviceId, card: u32) -> Result<bool, TransportError> {
        let mut c = self.controllers.get_mut(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::DeleteCard)?;
        if c.declines(card) {
            return Ok(false);
        }

        let Some(i) = c.position(card) else {
            return Ok(false);
        };
        c.slots[i] = None;
        c.writes += 1;
        trace!(device = %device, card, "deleted card");
        Ok(true)
    }

    async fn delete_all_cards(&self, device: DeviceId) -> Result<bool, TransportError> {
        let mut c = self.controllers.get_mut(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::DeleteAllCards)?;
        if c.decline_all {
            return Ok(false);
        }

        c.slots.clear();
        c.writes += 1;
        Ok(true)
    }

    async fn time_profile(
        &self,
        device: DeviceId,
        profile: u8,
    ) -> Result<Option<TimeProfile>, TransportError> {
        let c = self.controllers.get(&device).ok_or(TransportError::UnknownDevice)?;
        c.check(FleetOp::TimeProfile)?;
        Ok(c.profiles.get(&profile).cloned())
    }
}
