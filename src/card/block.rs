//! Self-service block-request intake
//!
//! Records a user's request to block their own card as an audit row. The
//! intake itself never changes card status; an administrative action consumes
//! the ledger later.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::card::model::{BlockRequest, CardStatus};
use crate::card::store::CardStore;
use crate::core_types::CardId;
use crate::error::CoreError;
use crate::user::UserRepository;

pub struct BlockIntake {
    users: Arc<dyn UserRepository>,
    cards: Arc<CardStore>,
}

impl BlockIntake {
    pub fn new(users: Arc<dyn UserRepository>, cards: Arc<CardStore>) -> Self {
        Self { users, cards }
    }

    /// Validate and record a block request for the caller's card.
    ///
    /// Requires effective status ACTIVE and a balance of exactly zero; both
    /// are checked and the row appended under the card's lock, so a transfer
    /// crediting the card cannot slip between check and append. Repeat
    /// requests are recorded as additional rows.
    pub async fn request_block(
        &self,
        card_id: CardId,
        email: &str,
    ) -> Result<BlockRequest, CoreError> {
        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                return Err(CoreError::not_found(format!("CardId: {} not found", card_id)));
            }
            Err(e) => return Err(e),
        };

        let request = self.cards.with_card(card_id, |record| {
            if record.user_id != user.id {
                return Err(CoreError::not_found(format!("CardId: {} not found", card_id)));
            }
            let today = Utc::now().date_naive();
            if record.effective_status(today) != CardStatus::Active {
                return Err(CoreError::validation("Only active cards can be blocked"));
            }
            if !record.balance.is_zero() {
                return Err(CoreError::validation(
                    "Cannot block card with non-zero balance",
                ));
            }
            Ok(self.cards.append_block_request(card_id))
        })?;

        info!(card_id, request_id = %request.id, "Block request recorded");
        Ok(request)
    }
}
