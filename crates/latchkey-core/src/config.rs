// ── Engine configuration ──
//
// Tuning knobs for a reconciliation engine. Built by the caller and handed
// to `AclEngine::new`; the core never reads config files.

use serde::{Deserialize, Serialize};

/// Highest record index scanned when reading a controller's cards. Matches
/// the largest card capacity in the controller family.
pub const DEFAULT_INDEX_SCAN_LIMIT: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Give up reading a controller after this many record indices, even if
    /// fewer cards than it reported have been found. Protects against
    /// controllers whose card count disagrees with their storage.
    #[serde(default = "default_index_scan_limit")]
    pub index_scan_limit: u32,
}

fn default_index_scan_limit() -> u32 {
    DEFAULT_INDEX_SCAN_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_scan_limit: DEFAULT_INDEX_SCAN_LIMIT,
        }
    }
}
