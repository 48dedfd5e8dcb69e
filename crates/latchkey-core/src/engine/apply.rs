// ── PutACL ──
//
// Each controller task fetches its current cards, diffs them against its
// share of the desired ACL and, unless this is a dry run, writes the
// difference one card at a time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AclEngine, SharedErrors, into_sorted, join_devices, take_errors};
use crate::diff::{self, CardEquivalence, IgnorePin, MatchPin};
use crate::error::CoreError;
use crate::model::{Acl, CardPermission, CardTable, DeviceId};
use crate::report::Report;

/// Where a successful card write lands in the report.
#[derive(Debug, Clone, Copy)]
enum Bucket {
    Updated,
    Added,
}

impl AclEngine {
    /// Bring every controller in `desired` to exactly its desired cards,
    /// ignoring PIN-only differences.
    pub async fn put_acl(
        &self,
        desired: &Acl,
        dry_run: bool,
    ) -> (BTreeMap<DeviceId, Report>, Vec<CoreError>) {
        self.put_acl_with(desired, dry_run, IgnorePin).await
    }

    /// Like [`AclEngine::put_acl`], but a PIN change is written too.
    pub async fn put_acl_with_pin(
        &self,
        desired: &Acl,
        dry_run: bool,
    ) -> (BTreeMap<DeviceId, Report>, Vec<CoreError>) {
        self.put_acl_with(desired, dry_run, MatchPin).await
    }

    /// Apply `desired` using a caller-chosen equivalence. Controllers that
    /// couldn't be read keep an empty report and add an error to the list.
    pub async fn put_acl_with<E>(
        &self,
        desired: &Acl,
        dry_run: bool,
        eq: E,
    ) -> (BTreeMap<DeviceId, Report>, Vec<CoreError>)
    where
        E: CardEquivalence + Clone + 'static,
    {
        let reports: Arc<DashMap<DeviceId, Report>> = Arc::new(DashMap::new());
        let errors: SharedErrors = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(desired.len());
        for (&device, cards) in desired {
            reports.insert(device, Report::default());

            let engine = self.clone();
            let cards = cards.clone();
            let eq = eq.clone();
            let reports = Arc::clone(&reports);
            let errors = Arc::clone(&errors);
            handles.push((
                device,
                tokio::spawn(async move {
                    match engine.apply_device(device, cards, dry_run, &eq).await {
                        Ok(report) => {
                            reports.insert(device, report);
                        }
                        Err(e) => {
                            warn!(device = %device, error = %e, "failed to read cards, skipping");
                            errors.lock().await.push(e);
                        }
                    }
                }),
            ));
        }

        join_devices(handles, &errors).await;

        let reports = into_sorted(reports);
        let errors = take_errors(&errors).await;
        info!(
            devices = reports.len(),
            dry_run,
            converged = reports.values().filter(|r| r.is_converged()).count(),
            errors = errors.len(),
            "applied access control list"
        );
        (reports, errors)
    }

    async fn apply_device<E: CardEquivalence>(
        &self,
        device: DeviceId,
        mut desired: CardTable,
        dry_run: bool,
        eq: &E,
    ) -> Result<Report, CoreError> {
        let mut current = self.fetch_device(device).await?;

        // Records must sit under their own card number. Misfiled ones are
        // skipped and the number they sit under is left alone.
        let mut misfiled = Vec::new();
        desired.retain(|&key, card| {
            let matches = key == card.card_number;
            if !matches {
                misfiled.push((key, card.card_number));
            }
            matches
        });
        for (key, _) in &misfiled {
            current.remove(key);
        }

        let diff = diff::compare(device, &current, &desired, eq);
        let mut report = if dry_run {
            Report::from_diff(&diff)
        } else {
            Report {
                unchanged: diff.unchanged.iter().map(|c| c.card_number).collect(),
                ..Report::default()
            }
        };

        for (key, number) in misfiled {
            warn!(device = %device, card = key, record = number, "card number does not match its record, skipped");
            report.errored(
                key,
                CoreError::InvalidCard {
                    card: key,
                    reason: format!("listed as card {key} but the record is for card {number}"),
                },
            );
        }

        if dry_run {
            debug!(device = %device, changes = diff.changes(), "dry run, nothing written");
            return Ok(report);
        }

        let mut profiles = ProfileCache::default();

        for card in &diff.updated {
            self.store_card(device, card, Bucket::Updated, &mut profiles, &mut report)
                .await;
        }
        for card in &diff.added {
            self.store_card(device, card, Bucket::Added, &mut profiles, &mut report)
                .await;
        }
        for card in &diff.deleted {
            self.remove_card(device, card.card_number, &mut report).await;
        }

        debug!(
            device = %device,
            unchanged = report.unchanged.len(),
            updated = report.updated.len(),
            added = report.added.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            errored = report.errored.len(),
            "applied cards"
        );
        Ok(report)
    }

    async fn store_card(
        &self,
        device: DeviceId,
        card: &CardPermission,
        bucket: Bucket,
        profiles: &mut ProfileCache,
        report: &mut Report,
    ) {
        let number = card.card_number;

        for profile in card.time_profiles() {
            match profiles.is_defined(self, device, profile).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(device = %device, card = number, profile, "time profile not defined, card skipped");
                    report.errored(number, CoreError::TimeProfileNotDefined { device, profile });
                    return;
                }
                Err(e) => {
                    report.errored(number, e);
                    return;
                }
            }
        }

        match self.fleet().put_card(device, card).await {
            Ok(true) => match bucket {
                Bucket::Updated => report.updated.push(number),
                Bucket::Added => report.added.push(number),
            },
            Ok(false) => {
                warn!(device = %device, card = number, "controller declined card");
                report.failed.push(number);
            }
            Err(e) => {
                warn!(device = %device, card = number, error = %e, "failed to store card");
                report.errored(number, CoreError::device(device, e));
            }
        }
    }

    async fn remove_card(&self, device: DeviceId, number: u32, report: &mut Report) {
        match self.fleet().delete_card(device, number).await {
            Ok(true) => report.deleted.push(number),
            Ok(false) => {
                warn!(device = %device, card = number, "controller declined delete");
                report.failed.push(number);
            }
            Err(e) => {
                warn!(device = %device, card = number, error = %e, "failed to delete card");
                report.errored(number, CoreError::device(device, e));
            }
        }
    }
}

/// Time profile lookups for a single controller task. Never outlives the
/// task, so a profile created mid-run is picked up by the next call.
#[derive(Default)]
struct ProfileCache {
    known: HashMap<u8, bool>,
}

impl ProfileCache {
    async fn is_defined(
        &mut self,
        engine: &AclEngine,
        device: DeviceId,
        profile: u8,
    ) -> Result<bool, CoreError> {
        if let Some(&defined) = self.known.get(&profile) {
            return Ok(defined);
        }

        let defined = engine
            .fleet()
            .time_profile(device, profile)
            .await
            .map_err(|e| CoreError::device(device, e))?
            .is_some();
        self.known.insert(profile, defined);
        Ok(defined)
    }
}
