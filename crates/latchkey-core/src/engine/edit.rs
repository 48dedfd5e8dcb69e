// ── Single-card editors ──
//
// Grant, revoke and look up one card by door name. Controllers are visited
// one after another and the first failure ends the call.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::AclEngine;
use crate::doors::{self, DoorDirectory};
use crate::error::CoreError;
use crate::model::{CardPermission, DOORS_PER_DEVICE, Device, DeviceId, DoorAccess};
use crate::requests::{GrantRequest, RevokeRequest};

/// One door a card has a record for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorPermission {
    pub device: DeviceId,
    pub door: u8,
    /// Validity range of the card on `device`.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub access: Option<DoorAccess>,
}

/// A card's access across the fleet, keyed by door name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardAccess {
    pub card: u32,
    pub doors: BTreeMap<String, DoorPermission>,
}

impl CardAccess {
    /// Returns `true` if no controller holds a record for the card.
    pub fn is_unknown(&self) -> bool {
        self.doors.is_empty()
    }
}

impl AclEngine {
    /// Open doors for a card.
    ///
    /// With `["ALL"]` every controller gets the card with exactly the
    /// requested dates and every door open. Otherwise only the named doors
    /// change, and the dates widen to cover the request unless the card had
    /// no open door on that controller, in which case they are replaced.
    pub async fn grant(&self, devices: &[Device], request: &GrantRequest) -> Result<(), CoreError> {
        request.validate()?;

        if doors::is_all(&request.doors) {
            return self.grant_all(devices, request).await;
        }

        let directory = DoorDirectory::build(devices)?;
        let targets = directory.resolve_by_device(&request.doors)?;
        let access = DoorAccess::for_grant(request.profile);

        if let Some(profile) = access.time_profile() {
            for &device in targets.keys() {
                self.require_profile(device, profile).await?;
            }
        }

        for (&device, doors) in &targets {
            let existing = self.load_card(device, request.card).await?;
            let mut card = existing
                .clone()
                .unwrap_or_else(|| CardPermission::denied(request.card));

            merge_dates(&mut card, request.from, request.to);
            for &door in doors {
                card.set_door(door, access);
            }

            self.save_card(device, existing.as_ref(), &card).await?;
        }

        info!(card = request.card, devices = targets.len(), "granted access");
        Ok(())
    }

    async fn grant_all(&self, devices: &[Device], request: &GrantRequest) -> Result<(), CoreError> {
        for device in devices {
            let existing = self.load_card(device.id, request.card).await?;
            let pin = existing.as_ref().map_or(0, |c| c.pin);
            let card = CardPermission::new(
                request.card,
                request.from,
                request.to,
                [DoorAccess::Always; DOORS_PER_DEVICE],
            )
            .with_pin(pin);

            self.save_card(device.id, existing.as_ref(), &card).await?;
        }

        info!(card = request.card, devices = devices.len(), "granted access to all doors");
        Ok(())
    }

    /// Close doors for a card. Dates and other doors are left alone, and a
    /// controller without the card is skipped.
    pub async fn revoke(&self, devices: &[Device], request: &RevokeRequest) -> Result<(), CoreError> {
        request.validate()?;

        let directory = DoorDirectory::build(devices)?;
        let targets = directory.resolve_by_device(&request.doors)?;

        for (&device, doors) in &targets {
            let Some(existing) = self.load_card(device, request.card).await? else {
                debug!(device = %device, card = request.card, "card not on controller");
                continue;
            };

            let mut card = existing.clone();
            for &door in doors {
                card.set_door(door, DoorAccess::Denied);
            }

            self.save_card(device, Some(&existing), &card).await?;
        }

        info!(card = request.card, devices = targets.len(), "revoked access");
        Ok(())
    }

    /// Look a card up on every controller.
    pub async fn get_card(&self, devices: &[Device], card: u32) -> Result<CardAccess, CoreError> {
        DoorDirectory::build(devices)?;

        let mut access = CardAccess {
            card,
            doors: BTreeMap::new(),
        };

        for device in devices {
            let Some(record) = self.load_card(device.id, card).await? else {
                continue;
            };

            for (door, name) in device.named_doors() {
                access.doors.insert(
                    name.to_owned(),
                    DoorPermission {
                        device: device.id,
                        door,
                        from: record.from,
                        to: record.to,
                        access: record.door(door),
                    },
                );
            }
        }

        debug!(card, doors = access.doors.len(), "looked up card");
        Ok(access)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn load_card(&self, device: DeviceId, card: u32) -> Result<Option<CardPermission>, CoreError> {
        self.fleet()
            .card_by_id(device, card)
            .await
            .map_err(|e| CoreError::device(device, e))
    }

    /// Write `card` unless it matches what the controller already holds.
    async fn save_card(
        &self,
        device: DeviceId,
        existing: Option<&CardPermission>,
        card: &CardPermission,
    ) -> Result<(), CoreError> {
        if existing == Some(card) {
            debug!(device = %device, card = card.card_number, "card unchanged, not written");
            return Ok(());
        }

        let stored = self
            .fleet()
            .put_card(device, card)
            .await
            .map_err(|e| CoreError::device(device, e))?;
        if !stored {
            return Err(CoreError::Rejected {
                device,
                card: card.card_number,
            });
        }

        debug!(device = %device, card = card.card_number, "stored card");
        Ok(())
    }

    async fn require_profile(&self, device: DeviceId, profile: u8) -> Result<(), CoreError> {
        let found = self
            .fleet()
            .time_profile(device, profile)
            .await
            .map_err(|e| CoreError::device(device, e))?;

        match found {
            Some(_) => Ok(()),
            None => Err(CoreError::TimeProfileNotDefined { device, profile }),
        }
    }
}

/// Widen the card's dates to cover `from..=to`. A card with no open door on
/// this controller takes the requested dates as they are.
fn merge_dates(card: &mut CardPermission, from: NaiveDate, to: NaiveDate) {
    let revoked = card.is_revoked();

    if revoked || card.from.is_none_or(|current| current > from) {
        card.from = Some(from);
    }
    if revoked || card.to.is_none_or(|current| current < to) {
        card.to = Some(to);
    }
}
