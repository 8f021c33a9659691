//! Common types used across the ledger.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{
    Currency, CurrencyError, INTERNAL_SCALE, MAX_AMOUNT, MAX_RATE, Money, RATE_SCALE, amount_in_range,
    rate_in_range, round_half_away,
};
