//! In-memory card store
//!
//! This is the SINGLE authority for card records and the block-request
//! ledger. PANs enter encrypted and leave masked; callers outside the store
//! never see ciphertext or plaintext.
//!
//! # Locking discipline (ENFORCED):
//! - The map lock is never taken while a record lock is held
//! - Two-record operations lock in ascending card id order, so transfers
//!   sharing a card serialize and cannot deadlock
//! - Retirement tombstones the record under its own lock before unlinking it
//!   from the map; a racing operation that already cloned the handle observes
//!   the tombstone after acquiring the lock and fails `NotFound` instead of
//!   mutating an orphan

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use ulid::Ulid;

use crate::card::masking::mask_pan;
use crate::card::model::{BlockRequest, Card, CardRecord, CardStatus};
use crate::core_types::{CardId, UserId};
use crate::error::CoreError;
use crate::vault::PanVault;

const POISONED: &str = "card store lock poisoned";

pub struct CardStore {
    vault: Arc<PanVault>,
    cards: RwLock<HashMap<CardId, Arc<Mutex<CardRecord>>>>,
    block_requests: Mutex<Vec<BlockRequest>>,
    next_id: AtomicU64,
}

impl CardStore {
    pub fn new(vault: Arc<PanVault>) -> Self {
        Self {
            vault,
            cards: RwLock::new(HashMap::new()),
            block_requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a new card for `user_id`. The PAN must be exactly 16 digits;
    /// it is encrypted before the record is stored.
    pub fn insert(
        &self,
        user_id: UserId,
        pan: &str,
        expiry_date: NaiveDate,
    ) -> Result<Card, CoreError> {
        if pan.len() != 16 || !pan.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::validation("Card number must be exactly 16 digits"));
        }

        let pan_encrypted = self.vault.encrypt(pan)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = CardRecord {
            id,
            pan_encrypted,
            expiry_date,
            status: CardStatus::Active,
            balance: Decimal::ZERO,
            user_id,
            created_at: Utc::now(),
            retired: false,
        };
        let card = self.render(&record)?;
        self.cards
            .write()
            .expect(POISONED)
            .insert(id, Arc::new(Mutex::new(record)));
        debug!(card_id = id, user_id, "Card record inserted");
        Ok(card)
    }

    fn handle(&self, id: CardId) -> Result<Arc<Mutex<CardRecord>>, CoreError> {
        self.cards
            .read()
            .expect(POISONED)
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("CardId: {} not found", id)))
    }

    /// Run `f` with shared access to one record, under its lock.
    pub(crate) fn with_card<R>(
        &self,
        id: CardId,
        f: impl FnOnce(&CardRecord) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let handle = self.handle(id)?;
        let record = handle.lock().expect(POISONED);
        if record.retired {
            return Err(CoreError::not_found(format!("CardId: {} not found", id)));
        }
        f(&record)
    }

    /// Run `f` with exclusive access to one record, under its lock.
    pub(crate) fn with_card_mut<R>(
        &self,
        id: CardId,
        f: impl FnOnce(&mut CardRecord) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let handle = self.handle(id)?;
        let mut record = handle.lock().expect(POISONED);
        if record.retired {
            return Err(CoreError::not_found(format!("CardId: {} not found", id)));
        }
        f(&mut record)
    }

    /// Run `f` with exclusive access to two distinct records.
    ///
    /// Locks are acquired in ascending id order; `f` receives the records in
    /// call order. Callers handle the `first == second` case themselves.
    pub(crate) fn with_pair_mut<R>(
        &self,
        first: CardId,
        second: CardId,
        f: impl FnOnce(&mut CardRecord, &mut CardRecord) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        debug_assert_ne!(first, second);
        let first_handle = self.handle(first)?;
        let second_handle = self.handle(second)?;

        let (low, high) = if first < second {
            (&first_handle, &second_handle)
        } else {
            (&second_handle, &first_handle)
        };
        let mut low_record = low.lock().expect(POISONED);
        let mut high_record = high.lock().expect(POISONED);

        let (first_record, second_record) = if first < second {
            (&mut *low_record, &mut *high_record)
        } else {
            (&mut *high_record, &mut *low_record)
        };
        if first_record.retired {
            return Err(CoreError::not_found(format!("CardId: {} not found", first)));
        }
        if second_record.retired {
            return Err(CoreError::not_found(format!("CardId: {} not found", second)));
        }
        f(first_record, second_record)
    }

    /// `NotFound` unless the card exists, is live, and belongs to `user_id`.
    /// Ownership failures are indistinguishable from absence on purpose.
    pub fn assert_owned(&self, id: CardId, user_id: UserId) -> Result<(), CoreError> {
        self.with_card(id, |record| {
            if record.user_id != user_id {
                return Err(CoreError::not_found(format!("CardId: {} not found", id)));
            }
            Ok(())
        })
    }

    /// Boundary snapshot of one card, masked.
    pub fn snapshot(&self, id: CardId) -> Result<Card, CoreError> {
        let record = self.with_card(id, |r| Ok(r.clone()))?;
        self.render(&record)
    }

    /// Boundary snapshot scoped to an owner.
    pub fn snapshot_for_owner(&self, id: CardId, user_id: UserId) -> Result<Card, CoreError> {
        let record = self.with_card(id, |r| {
            if r.user_id != user_id {
                return Err(CoreError::not_found(format!("CardId: {} not found", id)));
            }
            Ok(r.clone())
        })?;
        self.render(&record)
    }

    /// Map a record to its boundary form: decrypt, mask, derive status.
    pub(crate) fn render(&self, record: &CardRecord) -> Result<Card, CoreError> {
        let pan = self.vault.decrypt(&record.pan_encrypted)?;
        let today = Utc::now().date_naive();
        Ok(Card {
            id: record.id,
            card_number: mask_pan(&pan),
            expiry_date: record.expiry_date,
            status: record.effective_status(today),
            balance: record.balance,
            user_id: record.user_id,
            created_at: record.created_at,
        })
    }

    /// Credit funds onto a card (back-office funding hook, not a transfer).
    pub fn deposit(&self, id: CardId, amount: Decimal) -> Result<Card, CoreError> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount);
        }
        let record = self.with_card_mut(id, |r| {
            r.balance += amount;
            Ok(r.clone())
        })?;
        self.render(&record)
    }

    /// Permanently remove a card. Fails `NonZeroBalance` unless the balance
    /// is exactly zero.
    pub fn retire(&self, id: CardId) -> Result<(), CoreError> {
        let mut cards = self.cards.write().expect(POISONED);
        let handle = cards
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("CardId: {} not found", id)))?;
        {
            let mut record = handle.lock().expect(POISONED);
            if record.retired {
                return Err(CoreError::not_found(format!("CardId: {} not found", id)));
            }
            if !record.balance.is_zero() {
                return Err(CoreError::NonZeroBalance);
            }
            record.retired = true;
        }
        cards.remove(&id);
        debug!(card_id = id, "Card retired");
        Ok(())
    }

    /// List live cards, optionally filtered by owner and/or effective status,
    /// newest first.
    pub fn list(
        &self,
        owner: Option<UserId>,
        status: Option<CardStatus>,
    ) -> Result<Vec<Card>, CoreError> {
        let handles: Vec<_> = self
            .cards
            .read()
            .expect(POISONED)
            .values()
            .cloned()
            .collect();

        let mut out = Vec::new();
        for handle in handles {
            let record = handle.lock().expect(POISONED).clone();
            if record.retired {
                continue;
            }
            if let Some(user_id) = owner {
                if record.user_id != user_id {
                    continue;
                }
            }
            let card = self.render(&record)?;
            if let Some(wanted) = status {
                if card.status != wanted {
                    continue;
                }
            }
            out.push(card);
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    /// Sum of live balances owned by `user_id`; zero when there are none.
    pub fn balance_for_owner(&self, user_id: UserId) -> Decimal {
        let handles: Vec<_> = self
            .cards
            .read()
            .expect(POISONED)
            .values()
            .cloned()
            .collect();

        handles
            .iter()
            .map(|h| h.lock().expect(POISONED))
            .filter(|r| !r.retired && r.user_id == user_id)
            .map(|r| r.balance)
            .sum()
    }

    /// Append a block-request audit row. Repeat requests for the same card
    /// are appended as-is, never deduplicated.
    pub(crate) fn append_block_request(&self, card_id: CardId) -> BlockRequest {
        let request = BlockRequest {
            id: Ulid::new().to_string(),
            card_id,
            created_at: Utc::now(),
        };
        self.block_requests
            .lock()
            .expect(POISONED)
            .push(request.clone());
        request
    }

    /// Full block-request ledger, in append order.
    pub fn block_requests(&self) -> Vec<BlockRequest> {
        self.block_requests.lock().expect(POISONED).clone()
    }

    /// Ledger rows targeting one card, in append order.
    pub fn block_requests_for(&self, card_id: CardId) -> Vec<BlockRequest> {
        self.block_requests
            .lock()
            .expect(POISONED)
            .iter()
            .filter(|r| r.card_id == card_id)
            .cloned()
            .collect()
    }
}
