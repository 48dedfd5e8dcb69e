//! Card permission reconciliation for fleets of door controllers.
//!
//! Every controller stores a table of card records: card number, validity
//! dates, one access value per door and an optional PIN. This crate reads
//! those tables, diffs them against a desired state and writes the
//! difference back:
//!
//! - **[`AclEngine`]**: Fleet-wide operations. [`get_acl`](AclEngine::get_acl)
//!   and [`put_acl`](AclEngine::put_acl) run one task per controller and
//!   collect per-controller errors instead of failing the call.
//!   [`grant`](AclEngine::grant) and [`revoke`](AclEngine::revoke) edit a
//!   single card by door name.
//!
//! - **[`DeviceAccess`]**: The only way the engine talks to hardware.
//!   [`MemoryFleet`] implements it in memory for tests and offline use.
//!
//! - **Diffing and reporting** ([`diff`], [`report`]): Pure functions that
//!   classify cards per controller and fold results into fleet-wide views.

pub mod config;
pub mod device;
pub mod diff;
pub mod doors;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod report;
pub mod requests;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EngineConfig;
pub use device::DeviceAccess;
pub use diff::{CardEquivalence, Diff, IgnorePin, MatchPin};
pub use doors::{ALL_DOORS, DoorDirectory};
pub use engine::{AclEngine, CardAccess, DoorPermission};
pub use error::{CoreError, TransportError};
pub use memory::{FleetOp, FleetSnapshot, MemoryFleet};
pub use report::{
    ConsolidatedDiff, ConsolidatedReport, Report, SummaryRow, consolidate_diffs,
    consolidate_reports, summarize,
};
pub use requests::{GrantRequest, RevokeRequest};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Acl, CardPermission, CardTable, DOORS_PER_DEVICE, Device, DeviceId, DoorAccess, TimeProfile,
    TimeSegment,
};
