// ── Apply outcomes and system-wide roll-ups ──
//
// `Report` is what one controller did with its share of a PutACL pass.
// The consolidate functions fold per-controller diffs or reports into a
// single classification per card number, and `summarize` projects reports
// into per-controller counts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::diff::Diff;
use crate::error::CoreError;
use crate::model::DeviceId;

/// Outcome of applying a diff to one controller. All lists hold card
/// numbers in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub unchanged: Vec<u32>,
    pub updated: Vec<u32>,
    pub added: Vec<u32>,
    pub deleted: Vec<u32>,
    /// The controller declined the write.
    pub failed: Vec<u32>,
    /// The write was never accepted or never attempted because of an error.
    /// The matching errors are in `errors`.
    pub errored: Vec<u32>,
    #[serde(serialize_with = "error_messages")]
    pub errors: Vec<CoreError>,
}

impl Report {
    /// Classify a diff without writing anything.
    pub fn from_diff(diff: &Diff) -> Self {
        let numbers = |cards: &[crate::model::CardPermission]| -> Vec<u32> {
            cards.iter().map(|c| c.card_number).collect()
        };

        Self {
            unchanged: numbers(&diff.unchanged),
            updated: numbers(&diff.updated),
            added: numbers(&diff.added),
            deleted: numbers(&diff.deleted),
            ..Self::default()
        }
    }

    /// Returns `true` if the controller already matched the desired state.
    pub fn is_converged(&self) -> bool {
        self.updated.is_empty()
            && self.added.is_empty()
            && self.deleted.is_empty()
            && self.failed.is_empty()
            && self.errored.is_empty()
    }

    pub(crate) fn errored(&mut self, card: u32, error: CoreError) {
        self.errored.push(card);
        self.errors.push(error);
    }
}

fn error_messages<S: Serializer>(errors: &[CoreError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

// ── Consolidation ────────────────────────────────────────────────────

/// System-wide view of a set of per-controller diffs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidatedDiff {
    pub unchanged: Vec<u32>,
    pub updated: Vec<u32>,
    pub added: Vec<u32>,
    pub deleted: Vec<u32>,
}

/// System-wide view of a set of per-controller reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidatedReport {
    pub unchanged: Vec<u32>,
    pub updated: Vec<u32>,
    pub added: Vec<u32>,
    pub deleted: Vec<u32>,
    pub failed: Vec<u32>,
    pub errored: Vec<u32>,
}

/// Per-card flags collected while folding controllers together.
#[derive(Default)]
struct Flags {
    unchanged: BTreeSet<u32>,
    updated: BTreeSet<u32>,
    added: BTreeSet<u32>,
    deleted: BTreeSet<u32>,
    failed: BTreeSet<u32>,
    errored: BTreeSet<u32>,
}

impl Flags {
    /// Apply the precedence rules: a card updated anywhere is never also
    /// reported as added, and a card is unchanged only if no controller
    /// reported anything else for it.
    fn resolve(mut self) -> Self {
        self.added.retain(|card| !self.updated.contains(card));

        let flagged: BTreeSet<u32> = self
            .updated
            .iter()
            .chain(&self.added)
            .chain(&self.deleted)
            .chain(&self.failed)
            .chain(&self.errored)
            .copied()
            .collect();
        self.unchanged.retain(|card| !flagged.contains(card));
        self
    }
}

fn sorted(set: BTreeSet<u32>) -> Vec<u32> {
    set.into_iter().collect()
}

pub fn consolidate_diffs(diffs: &BTreeMap<DeviceId, Diff>) -> ConsolidatedDiff {
    let mut flags = Flags::default();
    for diff in diffs.values() {
        flags.unchanged.extend(diff.unchanged.iter().map(|c| c.card_number));
        flags.updated.extend(diff.updated.iter().map(|c| c.card_number));
        flags.added.extend(diff.added.iter().map(|c| c.card_number));
        flags.deleted.extend(diff.deleted.iter().map(|c| c.card_number));
    }

    let flags = flags.resolve();
    ConsolidatedDiff {
        unchanged: sorted(flags.unchanged),
        updated: sorted(flags.updated),
        added: sorted(flags.added),
        deleted: sorted(flags.deleted),
    }
}

pub fn consolidate_reports(reports: &BTreeMap<DeviceId, Report>) -> ConsolidatedReport {
    let mut flags = Flags::default();
    for report in reports.values() {
        flags.unchanged.extend(&report.unchanged);
        flags.updated.extend(&report.updated);
        flags.added.extend(&report.added);
        flags.deleted.extend(&report.deleted);
        flags.failed.extend(&report.failed);
        flags.errored.extend(&report.errored);
    }

    let flags = flags.resolve();
    ConsolidatedReport {
        unchanged: sorted(flags.unchanged),
        updated: sorted(flags.updated),
        added: sorted(flags.added),
        deleted: sorted(flags.deleted),
        failed: sorted(flags.failed),
        errored: sorted(flags.errored),
    }
}

// ── Summary ──────────────────────────────────────────────────────────

/// Bucket sizes for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub device: DeviceId,
    pub unchanged: usize,
    pub updated: usize,
    pub added: usize,
    pub deleted: usize,
    pub failed: usize,
    pub errored: usize,
    pub errors: usize,
}

/// Per-controller counts, ascending by controller id.
pub fn summarize(reports: &BTreeMap<DeviceId, Report>) -> Vec<SummaryRow> {
    reports
        .iter()
        .map(|(device, r)| SummaryRow {
            device: *device,
            unchanged: r.unchanged.len(),
            updated: r.updated.len(),
            added: r.added.len(),
            deleted: r.deleted.len(),
            failed: r.failed.len(),
            errored: r.errored.len(),
            errors: r.errors.len(),
        })
        .collect()
}
