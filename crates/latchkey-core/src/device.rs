// ── Device capability ──
//
// The engine never speaks a wire protocol. Everything it needs from a
// controller goes through `DeviceAccess`, implemented by the transport layer
// (or by `MemoryFleet` for tests and offline use).

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{CardPermission, Device, DeviceId, TimeProfile};

/// Card and time-profile primitives of a fleet of door controllers.
///
/// "Not there" is `Ok(None)` and "refused" is `Ok(false)`; `Err` is reserved
/// for requests that couldn't be completed at all.
#[async_trait]
pub trait DeviceAccess: Send + Sync {
    /// All controllers this fleet knows about.
    async fn list_devices(&self) -> Result<Vec<Device>, TransportError>;

    /// Number of card records stored on a controller.
    async fn count_cards(&self, device: DeviceId) -> Result<u32, TransportError>;

    /// Card record at a 1-based storage index. Deleted records leave gaps,
    /// which come back as `None`.
    async fn card_by_index(
        &self,
        device: DeviceId,
        index: u32,
    ) -> Result<Option<CardPermission>, TransportError>;

    async fn card_by_id(
        &self,
        device: DeviceId,
        card: u32,
    ) -> Result<Option<CardPermission>, TransportError>;

    /// Store a card, replacing any existing record with the same number.
    async fn put_card(&self, device: DeviceId, card: &CardPermission)
    -> Result<bool, TransportError>;

    async fn delete_card(&self, device: DeviceId, card: u32) -> Result<bool, TransportError>;

    async fn delete_all_cards(&self, device: DeviceId) -> Result<bool, TransportError>;

    async fn time_profile(
        &self,
        device: DeviceId,
        profile: u8,
    ) -> Result<Option<TimeProfile>, TransportError>;
}
