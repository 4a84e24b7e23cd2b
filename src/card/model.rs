//! Card model and status state machine

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{CardId, UserId};
use crate::error::CoreError;

/// Card status.
///
/// `Expired` is primarily a derived read-time fact: a card whose expiry date
/// has passed is treated as expired for every check regardless of the stored
/// field. See [`CardRecord::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardStatus {
    Active,
    Blocked,
    Expired,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACTIVE",
            CardStatus::Blocked => "BLOCKED",
            CardStatus::Expired => "EXPIRED",
        }
    }

    /// Validate a status transition.
    ///
    /// The only forbidden move is reactivating an expired card. Blocking and
    /// reactivation are administrative actions not restricted by balance.
    pub fn validate_transition(from: CardStatus, to: CardStatus) -> Result<(), CoreError> {
        if from == CardStatus::Expired && to == CardStatus::Active {
            return Err(CoreError::InvalidTransition(
                "Cannot activate expired card".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored card record. The PAN is kept encrypted; only the store's rendering
/// path may decrypt it.
#[derive(Debug, Clone)]
pub(crate) struct CardRecord {
    pub id: CardId,
    pub pan_encrypted: String,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    pub balance: Decimal,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Tombstone set under the record lock during retirement, so a racing
    /// two-card operation that already holds the handle observes the removal.
    pub retired: bool,
}

impl CardRecord {
    /// Status as of `today`: past-expiry cards read as `Expired` no matter
    /// what the stored field says.
    pub fn effective_status(&self, today: NaiveDate) -> CardStatus {
        if today > self.expiry_date {
            CardStatus::Expired
        } else {
            self.status
        }
    }
}

/// Card snapshot exposed at the boundary. The card number is always masked.
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: CardId,
    pub card_number: String,
    pub expiry_date: NaiveDate,
    pub status: CardStatus,
    pub balance: Decimal,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Audit row for a self-service block request. Appending one does not change
/// the card's status; the administrative consumer of the ledger does that.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRequest {
    pub id: String,
    pub card_id: CardId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permitted_transitions() {
        use CardStatus::*;
        assert!(CardStatus::validate_transition(Active, Blocked).is_ok());
        assert!(CardStatus::validate_transition(Blocked, Active).is_ok());
        assert!(CardStatus::validate_transition(Active, Expired).is_ok());
        assert!(CardStatus::validate_transition(Blocked, Expired).is_ok());
    }

    #[test]
    fn test_expired_card_cannot_be_reactivated() {
        let err = CardStatus::validate_transition(CardStatus::Expired, CardStatus::Active)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_effective_status_is_derived_from_expiry() {
        let record = CardRecord {
            id: 1,
            pan_encrypted: "ct".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            status: CardStatus::Active,
            balance: Decimal::ZERO,
            user_id: 1,
            created_at: Utc::now(),
            retired: false,
        };
        let before = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(record.effective_status(before), CardStatus::Active);
        assert_eq!(record.effective_status(after), CardStatus::Expired);
    }

    #[test]
    fn test_status_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&CardStatus::Blocked).unwrap(),
            "\"BLOCKED\""
        );
        let parsed: CardStatus = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(parsed, CardStatus::Active);
    }
}
