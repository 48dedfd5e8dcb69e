// ── Typed requests for the single-card editors ──

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Give a card access to a set of doors, or to every door with `["ALL"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub card: u32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Time profile to restrict the doors to. Values outside 2..=254 grant
    /// unrestricted access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<u8>,
    pub doors: Vec<String>,
}

impl GrantRequest {
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        validate_card(self.card)?;
        if self.from > self.to {
            return Err(CoreError::InvalidCard {
                card: self.card,
                reason: format!("valid from {} is after valid to {}", self.from, self.to),
            });
        }
        validate_doors(self.card, &self.doors)
    }
}

/// Close a set of doors, or every door with `["ALL"]`, for a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub card: u32,
    pub doors: Vec<String>,
}

impl RevokeRequest {
    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        validate_card(self.card)?;
        validate_doors(self.card, &self.doors)
    }
}

fn validate_card(card: u32) -> Result<(), CoreError> {
    if card == 0 {
        return Err(CoreError::InvalidCard {
            card,
            reason: "card number 0 is reserved".into(),
        });
    }
    Ok(())
}

fn validate_doors(card: u32, doors: &[String]) -> Result<(), CoreError> {
    if doors.iter().all(|d| d.trim().is_empty()) {
        return Err(CoreError::InvalidCard {
            card,
            reason: "no doors given".into(),
        });
    }
    Ok(())
}
