//! Card lifecycle operations
//!
//! Issuance, status transitions and retirement. Every mutation is atomic and
//! bounded to one card's state; multi-card coupling lives in the transfer
//! engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::card::generator;
use crate::card::model::{Card, CardStatus};
use crate::card::store::CardStore;
use crate::core_types::{CardId, UserId};
use crate::error::CoreError;
use crate::user::UserRepository;

pub struct CardLifecycle {
    users: Arc<dyn UserRepository>,
    cards: Arc<CardStore>,
}

impl CardLifecycle {
    pub fn new(users: Arc<dyn UserRepository>, cards: Arc<CardStore>) -> Self {
        Self { users, cards }
    }

    /// Issue a fresh card: random PAN, expiry three years out, zero balance,
    /// ACTIVE.
    pub async fn issue(&self, user_id: UserId) -> Result<Card, CoreError> {
        let user = self.users.find_by_id(user_id).await?;

        let pan = generator::generate_pan();
        let expiry = generator::expiry_from(Utc::now().date_naive());
        let card = self.cards.insert(user.id, &pan, expiry)?;

        info!(card_id = card.id, user_id = user.id, "Card issued");
        Ok(card)
    }

    /// Commit a status transition after validating it against the card's
    /// effective status (a past-expiry card counts as EXPIRED here even if
    /// the stored field still says otherwise).
    pub fn set_status(&self, card_id: CardId, target: CardStatus) -> Result<Card, CoreError> {
        let record = self.cards.with_card_mut(card_id, |record| {
            let today = Utc::now().date_naive();
            CardStatus::validate_transition(record.effective_status(today), target)?;
            record.status = target;
            Ok(record.clone())
        })?;

        info!(card_id, status = %target, "Card status updated");
        self.cards.render(&record)
    }

    /// Permanently remove a card; only a zero-balance card may go.
    pub fn retire(&self, card_id: CardId) -> Result<(), CoreError> {
        self.cards.retire(card_id)?;
        info!(card_id, "Card retired");
        Ok(())
    }

    /// Admin-wide listing with optional effective-status filter.
    pub fn list_all(&self, status: Option<CardStatus>) -> Result<Vec<Card>, CoreError> {
        self.cards.list(None, status)
    }

    /// All cards of one user; the user must exist.
    pub async fn cards_of_user(&self, user_id: UserId) -> Result<Vec<Card>, CoreError> {
        let user = self.users.find_by_id(user_id).await?;
        self.cards.list(Some(user.id), None)
    }
}
