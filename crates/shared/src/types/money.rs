//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal`; intermediate results keep at least
//! [`INTERNAL_SCALE`] fractional digits and are only rounded to a currency's
//! minor unit where a value is frozen (base amounts, tax amounts).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of fractional digits carried by intermediate amounts.
pub const INTERNAL_SCALE: u32 = 8;

/// Exclusive bound on a stored amount's magnitude (18 integer digits).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Fractional digits a stored exchange or tax rate keeps.
pub const RATE_SCALE: u32 = 12;

/// Exclusive bound on a stored rate's magnitude (16 integer digits).
pub const MAX_RATE: Decimal = Decimal::from_parts(0x6FC1_0000, 0x0023_86F2, 0, false, 0);

/// Returns true if `amount` is storable without loss.
#[must_use]
pub fn amount_in_range(amount: Decimal) -> bool {
    amount.abs() < MAX_AMOUNT
}

/// Returns true if `rate` is storable without rounding.
///
/// Trailing zeros do not count towards the scale.
#[must_use]
pub fn rate_in_range(rate: Decimal) -> bool {
    rate.abs() < MAX_RATE && rate.normalize().scale() <= RATE_SCALE
}

/// Rounds `amount` to `dp` fractional digits, half away from zero.
#[must_use]
pub fn round_half_away(amount: Decimal, dp: u32) -> Decimal {
    amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Error returned when a currency code is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: '{0}'")]
pub struct CurrencyError(pub String);

/// ISO 4217 alphabetic currency code (e.g. "USD", "JPY").
///
/// The set of currencies is open; only the shape of the code is validated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses and normalizes a currency code.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError` unless the code is exactly three ASCII letters.
    pub fn new(code: &str) -> Result<Self, CurrencyError> {
        let trimmed = code.trim();
        if trimmed.len() == 3 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(CurrencyError(code.to_string()))
        }
    }

    /// Returns the upper-case code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of fractional digits in the currency's minor unit.
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" | "PYG" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" | "IQD" | "LYD" => 3,
            _ => 2,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// Represents a monetary amount with currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g. dollars, not cents).
    pub amount: Decimal,
    /// The currency the amount is denominated in.
    pub currency: Currency,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Rounds the amount to the currency's minor unit, half away from zero.
    #[must_use]
    pub fn round_to_minor(&self) -> Self {
        Self {
            amount: round_half_away(self.amount, self.currency.minor_units()),
            currency: self.currency.clone(),
        }
    }

    /// Returns true if the amount needs no rounding at the minor unit.
    #[must_use]
    pub fn is_minor_exact(&self) -> bool {
        round_half_away(self.amount, self.currency.minor_units()) == self.amount
    }

    /// Converts into `target` at `rate`, rounding to the target's minor unit.
    ///
    /// The product is computed at full precision and only the final value is
    /// rounded. Returns `None` if the product does not fit a `Decimal`.
    #[must_use]
    pub fn convert(&self, rate: Decimal, target: &Currency) -> Option<Self> {
        let product = self.amount.checked_mul(rate)?;
        Some(Self {
            amount: round_half_away(product, target.minor_units()),
            currency: target.clone(),
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:.*}",
            self.currency,
            self.currency.minor_units() as usize,
            self.amount
        )
    }
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
