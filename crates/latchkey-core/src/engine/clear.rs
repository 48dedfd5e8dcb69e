// ── ClearACL ──

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{AclEngine, SharedErrors, into_sorted, join_devices, take_errors};
use crate::error::CoreError;
use crate::model::DeviceId;

impl AclEngine {
    /// Delete every card from every listed controller.
    ///
    /// Maps each controller to whether it accepted the request. Controllers
    /// that couldn't be reached are missing from the map and add an error
    /// to the list.
    pub async fn clear_acl(&self, devices: &[DeviceId]) -> (BTreeMap<DeviceId, bool>, Vec<CoreError>) {
        let cleared: Arc<DashMap<DeviceId, bool>> = Arc::new(DashMap::new());
        let errors: SharedErrors = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(devices.len());
        for &device in devices {
            let engine = self.clone();
            let cleared = Arc::clone(&cleared);
            let errors = Arc::clone(&errors);
            handles.push((
                device,
                tokio::spawn(async move {
                    match engine.fleet().delete_all_cards(device).await {
                        Ok(accepted) => {
                            if !accepted {
                                warn!(device = %device, "controller declined to clear cards");
                            }
                            cleared.insert(device, accepted);
                        }
                        Err(e) => {
                            let e = CoreError::device(device, e);
                            warn!(device = %device, error = %e, "failed to clear cards");
                            errors.lock().await.push(e);
                        }
                    }
                }),
            ));
        }

        join_devices(handles, &errors).await;

        let cleared = into_sorted(cleared);
        let errors = take_errors(&errors).await;
        info!(
            devices = cleared.len(),
            declined = cleared.values().filter(|ok| !**ok).count(),
            errors = errors.len(),
            "cleared access control list"
        );
        (cleared, errors)
    }
}
