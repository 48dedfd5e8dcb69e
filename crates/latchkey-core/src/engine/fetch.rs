// ── GetACL ──

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::{AclEngine, SharedErrors, into_sorted, join_devices, take_errors};
use crate::error::CoreError;
use crate::model::{Acl, CardTable, DeviceId};

impl AclEngine {
    /// Read every card from every listed controller.
    ///
    /// The returned ACL has an entry for each requested controller; one that
    /// couldn't be read is left with an empty table and an error in the list.
    pub async fn get_acl(&self, devices: &[DeviceId]) -> (Acl, Vec<CoreError>) {
        let tables: Arc<DashMap<DeviceId, CardTable>> = Arc::new(DashMap::new());
        let errors: SharedErrors = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(devices.len());
        for &device in devices {
            tables.insert(device, CardTable::new());

            let engine = self.clone();
            let tables = Arc::clone(&tables);
            let errors = Arc::clone(&errors);
            handles.push((
                device,
                tokio::spawn(async move {
                    match engine.fetch_device(device).await {
                        Ok(cards) => {
                            tables.insert(device, cards);
                        }
                        Err(e) => {
                            warn!(device = %device, error = %e, "failed to read cards");
                            errors.lock().await.push(e);
                        }
                    }
                }),
            ));
        }

        join_devices(handles, &errors).await;

        let acl = into_sorted(tables);
        let errors = take_errors(&errors).await;
        info!(
            devices = acl.len(),
            cards = acl.values().map(CardTable::len).sum::<usize>(),
            errors = errors.len(),
            "fetched access control list"
        );
        (acl, errors)
    }

    /// Read one controller's cards by walking record indices from 1 until as
    /// many cards as the controller reported have been found. Deleted
    /// records leave gaps, so the walk may go past the card count.
    pub(crate) async fn fetch_device(&self, device: DeviceId) -> Result<CardTable, CoreError> {
        let expected = self
            .fleet()
            .count_cards(device)
            .await
            .map_err(|e| CoreError::device(device, e))?;
        let limit = self.config().index_scan_limit;
        debug!(device = %device, expected, "reading cards");

        let mut cards = CardTable::new();
        let mut found = 0u32;
        let mut scanned = 0u32;

        for index in 1..=limit {
            if found == expected {
                break;
            }

            match self
                .fleet()
                .card_by_index(device, index)
                .await
                .map_err(|e| CoreError::device(device, e))?
            {
                Some(card) => {
                    found += 1;
                    cards.insert(card.card_number, card);
                }
                None => trace!(device = %device, index, "empty record"),
            }
            scanned = index;
        }

        if found < expected {
            return Err(CoreError::IncompleteFetch {
                device,
                expected,
                found,
                limit,
            });
        }

        debug!(device = %device, cards = cards.len(), scanned, "read cards");
        Ok(cards)
    }
}
