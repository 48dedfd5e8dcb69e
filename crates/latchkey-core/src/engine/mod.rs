// ── Reconciliation engine ──
//
// Reads, diffs and writes card permissions across a fleet of controllers.
// Fleet-wide operations run one task per controller; a failing controller
// never stops its siblings. Single-card editors run sequentially.

mod apply;
mod clear;
mod edit;
mod fetch;

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::device::DeviceAccess;
use crate::diff::{self, Diff, IgnorePin, MatchPin};
use crate::error::CoreError;
use crate::model::{Acl, Device, DeviceId};

pub use edit::{CardAccess, DoorPermission};

/// Errors collected by concurrent per-controller tasks.
type SharedErrors = Arc<Mutex<Vec<CoreError>>>;

/// Handle to a fleet of controllers. Cheap to clone: every clone shares
/// the same device backend and configuration.
#[derive(Clone)]
pub struct AclEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    fleet: Arc<dyn DeviceAccess>,
    config: EngineConfig,
}

impl AclEngine {
    pub fn new(fleet: Arc<dyn DeviceAccess>, config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner { fleet, config }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn fleet(&self) -> &dyn DeviceAccess {
        self.inner.fleet.as_ref()
    }

    /// Every controller the backend knows about, ascending by id.
    pub async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let mut devices = self.fleet().list_devices().await.map_err(CoreError::Fleet)?;
        devices.sort_by_key(|d| d.id);
        debug!(count = devices.len(), "listed controllers");
        Ok(devices)
    }

    /// Diff pre-fetched tables for every controller in either ACL, ignoring
    /// PINs.
    pub fn compare(current: &Acl, desired: &Acl) -> BTreeMap<DeviceId, Diff> {
        diff::compare_acl(current, desired, &IgnorePin)
    }

    /// Like [`AclEngine::compare`], but a PIN change counts as an update.
    pub fn compare_with_pin(current: &Acl, desired: &Acl) -> BTreeMap<DeviceId, Diff> {
        diff::compare_acl(current, desired, &MatchPin)
    }
}

// ── Task plumbing ────────────────────────────────────────────────────

/// Wait for every per-controller task. A task that panicked or was
/// cancelled is recorded as an internal error against its controller.
async fn join_devices(handles: Vec<(DeviceId, JoinHandle<()>)>, errors: &SharedErrors) {
    let outcomes = join_all(
        handles
            .into_iter()
            .map(|(device, handle)| async move { (device, handle.await) }),
    )
    .await;

    for (device, outcome) in outcomes {
        if let Err(e) = outcome {
            error!(device = %device, error = %e, "controller task aborted");
            errors
                .lock()
                .await
                .push(CoreError::Internal(format!("controller {device}: task aborted: {e}")));
        }
    }
}

/// Move the results out of a map shared with finished tasks.
fn into_sorted<V: Clone>(shared: Arc<DashMap<DeviceId, V>>) -> BTreeMap<DeviceId, V> {
    match Arc::try_unwrap(shared) {
        Ok(map) => map.into_iter().collect(),
        Err(shared) => shared
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect(),
    }
}

async fn take_errors(errors: &SharedErrors) -> Vec<CoreError> {
    std::mem::take(&mut *errors.lock().await)
}
