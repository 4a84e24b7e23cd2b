//! Owner-scoped card read accessors
//!
//! Lookups are by the acting user's email. A card that exists but belongs to
//! someone else is reported as absent, not forbidden.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::card::model::{Card, CardStatus};
use crate::card::store::CardStore;
use crate::core_types::CardId;
use crate::error::CoreError;
use crate::user::UserRepository;

pub struct CardQueries {
    users: Arc<dyn UserRepository>,
    cards: Arc<CardStore>,
}

impl CardQueries {
    pub fn new(users: Arc<dyn UserRepository>, cards: Arc<CardStore>) -> Self {
        Self { users, cards }
    }

    /// One card, scoped to the caller.
    pub async fn card_for_user(&self, card_id: CardId, email: &str) -> Result<Card, CoreError> {
        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(CoreError::NotFound(_)) => {
                return Err(CoreError::not_found(format!("CardId: {} not found", card_id)));
            }
            Err(e) => return Err(e),
        };
        self.cards.snapshot_for_owner(card_id, user.id)
    }

    /// Sum of the caller's card balances; zero when they hold no cards.
    pub async fn balance_for_user(&self, email: &str) -> Result<Decimal, CoreError> {
        match self.users.find_by_email(email).await {
            Ok(user) => Ok(self.cards.balance_for_owner(user.id)),
            Err(CoreError::NotFound(_)) => Ok(Decimal::ZERO),
            Err(e) => Err(e),
        }
    }

    /// The caller's cards, optionally filtered by effective status.
    pub async fn cards_for_user(
        &self,
        email: &str,
        status: Option<CardStatus>,
    ) -> Result<Vec<Card>, CoreError> {
        match self.users.find_by_email(email).await {
            Ok(user) => self.cards.list(Some(user.id), status),
            Err(CoreError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncryptionConfig;
    use crate::user::{InMemoryUsers, NewUser, Role};
    use crate::vault::PanVault;
    use chrono::{Duration, Utc};
    use std::str::FromStr;

    async fn setup() -> (Arc<CardStore>, CardQueries) {
        let users = Arc::new(InMemoryUsers::new());
        for email in ["alice@example.com", "bob@example.com"] {
            users
                .create(NewUser {
                    name: email.to_string(),
                    email: email.to_string(),
                    password_hash: "$argon2id$stub".to_string(),
                    roles: vec![Role::User],
                })
                .await
                .unwrap();
        }
        let vault = Arc::new(PanVault::new(&EncryptionConfig::default()).unwrap());
        let cards = Arc::new(CardStore::new(vault));
        let queries = CardQueries::new(users, cards.clone());
        (cards, queries)
    }

    fn expiry() -> chrono::NaiveDate {
        Utc::now().date_naive() + Duration::days(365)
    }

    #[tokio::test]
    async fn test_card_for_user_scoping() {
        let (cards, queries) = setup().await;
        let card = cards.insert(1, "4276550011223344", expiry()).unwrap();

        let found = queries
            .card_for_user(card.id, "alice@example.com")
            .await
            .unwrap();
        assert_eq!(found.card_number, "**** **** **** 3344");

        // Bob sees absence, not a permission error.
        let err = queries
            .card_for_user(card.id, "bob@example.com")
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::NotFound(format!("CardId: {} not found", card.id)));

        // Unknown caller gets the same shape.
        let err = queries
            .card_for_user(card.id, "nobody@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_balance_sum_defaults_to_zero() {
        let (cards, queries) = setup().await;
        let a = cards.insert(1, "4276550011223344", expiry()).unwrap();
        let b = cards.insert(1, "4276550099887766", expiry()).unwrap();
        cards.deposit(a.id, Decimal::from_str("10.10").unwrap()).unwrap();
        cards.deposit(b.id, Decimal::from_str("5.15").unwrap()).unwrap();

        assert_eq!(
            queries.balance_for_user("alice@example.com").await.unwrap(),
            Decimal::from_str("15.25").unwrap()
        );
        assert_eq!(
            queries.balance_for_user("bob@example.com").await.unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            queries.balance_for_user("nobody@example.com").await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_cards_for_user_filter() {
        let (cards, queries) = setup().await;
        cards.insert(1, "4276550011223344", expiry()).unwrap();
        let expired = Utc::now().date_naive() - Duration::days(1);
        cards.insert(1, "4276550099887766", expired).unwrap();

        let all = queries
            .cards_for_user("alice@example.com", None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let active = queries
            .cards_for_user("alice@example.com", Some(CardStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);

        let none = queries
            .cards_for_user("nobody@example.com", None)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
