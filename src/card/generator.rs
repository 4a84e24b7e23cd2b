//! Card issuance parameters
//!
//! PANs are 16 uniformly random digits. No Luhn or BIN scheme is applied and
//! uniqueness is not checked; with 10^16 possibilities a collision is
//! astronomically unlikely and harmless to the ledger (ids, not PANs, key the
//! store).

use chrono::{Datelike, NaiveDate};
use rand::Rng;

/// Number of digits in a PAN, fixed before encryption.
pub const PAN_LEN: usize = 16;

/// Years of validity granted at issuance.
const VALIDITY_YEARS: i32 = 3;

/// Generate a fresh random 16-digit PAN.
pub fn generate_pan() -> String {
    let mut rng = rand::thread_rng();
    (0..PAN_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Expiry date for a card issued on `today`.
pub fn expiry_from(today: NaiveDate) -> NaiveDate {
    today
        .with_year(today.year() + VALIDITY_YEARS)
        // Feb 29 on a non-leap target year clamps to Feb 28
        .unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(today.year() + VALIDITY_YEARS, 2, 28).expect("valid date")
        })
}
