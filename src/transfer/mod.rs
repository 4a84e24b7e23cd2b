//! Transfer Engine
//!
//! Moves money between two cards of the same user. This is the system's only
//! multi-record write: both records are locked in ascending card-id order for
//! the whole read-validate-write sequence, so concurrent transfers sharing a
//! card serialize and the sum of the two balances changes by exactly the
//! amount moved, exactly once.
//!
//! # Precondition order
//! Ownership/existence of source, then target; both cards active; funds;
//! amount positivity; distinct cards. The funds check deliberately precedes
//! the positivity and same-card checks - callers observe exactly this error
//! per scenario and tests pin it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::card::model::{CardRecord, CardStatus};
use crate::card::store::CardStore;
use crate::core_types::{CardId, UserId};
use crate::error::CoreError;
use crate::user::UserRepository;

/// Transfer order as it crosses the boundary. The amount is an exact
/// decimal; no rounding occurs anywhere in this module.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub source_card_id: CardId,
    pub target_card_id: CardId,
    pub amount: Decimal,
}

/// Receipt for a committed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferRecord {
    pub source_card_id: CardId,
    pub target_card_id: CardId,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

pub struct TransferEngine {
    users: Arc<dyn UserRepository>,
    cards: Arc<CardStore>,
}

impl TransferEngine {
    pub fn new(users: Arc<dyn UserRepository>, cards: Arc<CardStore>) -> Self {
        Self { users, cards }
    }

    /// Execute a transfer between two of the acting user's cards.
    ///
    /// Either both balances change or neither does; a failed precondition
    /// leaves no partial mutation.
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        email: &str,
    ) -> Result<TransferRecord, CoreError> {
        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            // An unknown caller cannot own the source card.
            Err(CoreError::NotFound(_)) => {
                return Err(Self::source_not_found(request.source_card_id));
            }
            Err(e) => return Err(e),
        };

        debug!(
            source = request.source_card_id,
            target = request.target_card_id,
            amount = %request.amount,
            user_id = user.id,
            "Transfer requested"
        );

        // Fail fast on the side that is missing or foreign, naming it.
        self.cards
            .assert_owned(request.source_card_id, user.id)
            .map_err(|_| Self::source_not_found(request.source_card_id))?;
        self.cards
            .assert_owned(request.target_card_id, user.id)
            .map_err(|_| Self::target_not_found(request.target_card_id))?;

        let record = if request.source_card_id == request.target_card_id {
            // The remaining checks still run against the single record so the
            // caller sees the same error it would for two cards; the chain
            // always terminates in SameCard at the latest.
            self.cards
                .with_card_mut(request.source_card_id, |record| {
                    let record: &CardRecord = record;
                    Self::validate(request, user.id, record, record)?;
                    Err(CoreError::SameCard)
                })
        } else {
            self.cards.with_pair_mut(
                request.source_card_id,
                request.target_card_id,
                |source, target| {
                    Self::validate(request, user.id, source, target)?;

                    source.balance -= request.amount;
                    target.balance += request.amount;

                    Ok(TransferRecord {
                        source_card_id: source.id,
                        target_card_id: target.id,
                        amount: request.amount,
                        timestamp: Utc::now(),
                    })
                },
            )
        }?;

        info!(
            source = record.source_card_id,
            target = record.target_card_id,
            amount = %record.amount,
            "Transfer committed"
        );
        Ok(record)
    }

    /// Precondition chain, evaluated under the record lock(s). For the
    /// same-card path `source` and `target` alias the same record.
    fn validate(
        request: &TransferRequest,
        user_id: UserId,
        source: &CardRecord,
        target: &CardRecord,
    ) -> Result<(), CoreError> {
        if source.user_id != user_id {
            return Err(Self::source_not_found(request.source_card_id));
        }
        if target.user_id != user_id {
            return Err(Self::target_not_found(request.target_card_id));
        }

        let today = Utc::now().date_naive();
        if source.effective_status(today) != CardStatus::Active
            || target.effective_status(today) != CardStatus::Active
        {
            return Err(CoreError::CardNotActive(
                "Both cards must be active".to_string(),
            ));
        }
        if request.amount > source.balance {
            return Err(CoreError::InsufficientFunds {
                available: source.balance,
                required: request.amount,
            });
        }
        if request.amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount);
        }
        if request.source_card_id == request.target_card_id {
            return Err(CoreError::SameCard);
        }
        Ok(())
    }

    fn source_not_found(id: CardId) -> CoreError {
        CoreError::not_found(format!("Source card not found: {}", id))
    }

    fn target_not_found(id: CardId) -> CoreError {
        CoreError::not_found(format!("Target card not found: {}", id))
    }
}
