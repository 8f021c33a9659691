//! Tax rate domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    AccountId, Currency, TaxRateId, TenantId, amount_in_range, rate_in_range, round_half_away,
};

use crate::error::{LedgerError, check_length};
use crate::ledger::types::{Direction, LineInput};

/// Maximum length of a jurisdiction code.
pub const MAX_JURISDICTION_LEN: usize = 20;
/// Maximum length of a category label.
pub const MAX_CATEGORY_LEN: usize = 50;

/// A rate valid over the half-open interval `[valid_from, valid_to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    /// Rate ID.
    pub id: TaxRateId,
    /// `None` for the global default, `Some` for a tenant override.
    pub tenant_id: Option<TenantId>,
    /// Jurisdiction code, upper case (e.g. "DE", "US-CA").
    pub jurisdiction: String,
    /// Category label, lower case (e.g. "standard", "reduced").
    pub category: String,
    /// Fractional rate; 0.19 means 19%.
    pub rate: Decimal,
    /// First day the rate applies.
    pub valid_from: NaiveDate,
    /// First day the rate no longer applies; `None` while current.
    pub valid_to: Option<NaiveDate>,
    /// Account tax amounts post to.
    pub account_id: Option<AccountId>,
}

impl TaxRate {
    /// Returns true if the interval contains `date`.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && self.valid_to.is_none_or(|to| date < to)
    }

    /// Returns true if the interval shares any day with `[from, to)`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: Option<NaiveDate>) -> bool {
        let starts_before_other_ends = to.is_none_or(|end| self.valid_from < end);
        let other_starts_before_end = self.valid_to.is_none_or(|end| from < end);
        starts_before_other_ends && other_starts_before_end
    }

    /// Returns true if this rate belongs to the given (jurisdiction, category, scope).
    #[must_use]
    pub fn in_scope(&self, jurisdiction: &str, category: &str, tenant_id: Option<TenantId>) -> bool {
        self.tenant_id == tenant_id && self.jurisdiction == jurisdiction && self.category == category
    }

    /// Tax on `base`, rounded half away from zero to the currency's minor unit.
    ///
    /// # Errors
    ///
    /// Returns `TaxBaseOutOfRange` if the tax would not fit a stored amount.
    pub fn tax_on(&self, base: Decimal, currency: &Currency) -> Result<Decimal, LedgerError> {
        base.checked_mul(self.rate)
            .map(|tax| round_half_away(tax, currency.minor_units()))
            .filter(|tax| amount_in_range(*tax))
            .ok_or(LedgerError::TaxBaseOutOfRange(base))
    }

    /// Builds the journal line that books the tax on `base` to the linked account.
    pub fn posting_line(
        &self,
        base: Decimal,
        currency: &Currency,
        direction: Direction,
    ) -> Result<LineInput, LedgerError> {
        let account = self.account_id.ok_or_else(|| LedgerError::InvalidAccount {
            account: format!("tax rate {}", self.id),
            reason: "no posting account is linked to this rate".to_string(),
        })?;

        Ok(LineInput::new(account, direction, self.tax_on(base, currency)?, currency.clone())
            .described(format!(
                "{} {} tax at {}",
                self.jurisdiction, self.category, self.rate
            )))
    }
}

/// Input for creating a tax rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaxRate {
    /// Jurisdiction code.
    pub jurisdiction: String,
    /// Category label.
    pub category: String,
    /// Fractional rate.
    pub rate: Decimal,
    /// Inclusive start.
    pub valid_from: NaiveDate,
    /// Exclusive end.
    pub valid_to: Option<NaiveDate>,
    /// Posting account for tax amounts.
    pub account_id: Option<AccountId>,
}

impl NewTaxRate {
    /// Validates and normalizes the input.
    ///
    /// Jurisdictions are upper-cased and categories lower-cased so lookups are
    /// case-insensitive.
    pub fn normalized(self) -> Result<Self, LedgerError> {
        if (self.rate.is_sign_negative() && !self.rate.is_zero()) || !rate_in_range(self.rate) {
            return Err(LedgerError::InvalidTaxRate(self.rate));
        }
        if let Some(to) = self.valid_to
            && to <= self.valid_from
        {
            return Err(LedgerError::InvalidDateInterval {
                from: self.valid_from,
                to,
            });
        }

        let jurisdiction = normalize_jurisdiction(&self.jurisdiction);
        let category = normalize_category(&self.category);
        check_length("jurisdiction", &jurisdiction, MAX_JURISDICTION_LEN)?;
        check_length("category", &category, MAX_CATEGORY_LEN)?;

        Ok(Self {
            jurisdiction,
            category,
            ..self
        })
    }

    /// Materializes the rate under `id` for `tenant_id`.
    #[must_use]
    pub fn into_rate(self, id: TaxRateId, tenant_id: Option<TenantId>) -> TaxRate {
        TaxRate {
            id,
            tenant_id,
            jurisdiction: self.jurisdiction,
            category: self.category,
            rate: self.rate,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            account_id: self.account_id,
        }
    }
}

/// Upper-cased, trimmed jurisdiction code.
#[must_use]
pub fn normalize_jurisdiction(jurisdiction: &str) -> String {
    jurisdiction.trim().to_ascii_uppercase()
}

/// Lower-cased, trimmed category label.
#[must_use]
pub fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}
