//! Journal entry domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, ActorId, Currency, JournalEntryId, JournalLineId};

use crate::accounts::AccountRef;
use crate::error::LedgerError;

/// Source type recorded on reversal entries.
pub const VOID_SOURCE_TYPE: &str = "VOID";

/// Side of a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Debit side.
    Debit,
    /// Credit side.
    Credit,
}

/// Journal entry lifecycle: `Draft -> Posted -> Voided`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Editable, unnumbered.
    Draft,
    /// Numbered and immutable.
    Posted,
    /// Reversed by a sibling entry; the original stays in the books.
    Voided,
}

impl EntryStatus {
    /// Returns true once the entry has been posted, including after a void.
    ///
    /// Such entries count towards balances: a voided original is netted out by
    /// its posted reversal rather than removed.
    #[must_use]
    pub const fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Voided)
    }
}

/// Pointer from an entry to the business object it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Originating module's object type (e.g. "INVOICE").
    pub source_type: String,
    /// Originating object's identifier.
    pub source_id: String,
}

impl SourceRef {
    /// Creates a source reference.
    pub fn new(source_type: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            source_id: source_id.into(),
        }
    }

    /// Source of the reversal that voids `original`.
    #[must_use]
    pub fn void_of(original: JournalEntryId) -> Self {
        Self::new(VOID_SOURCE_TYPE, original.to_string())
    }
}

/// One line of a posting request.
///
/// Exactly one of `debit` and `credit` must be positive; the constructors
/// guarantee this for well-behaved callers, validation enforces it for all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Account by id or code.
    pub account: AccountRef,
    /// Debit in transaction currency.
    pub debit: Decimal,
    /// Credit in transaction currency.
    pub credit: Decimal,
    /// Transaction currency.
    pub currency: Currency,
    /// Rate to the tenant's base currency; omitted for base-currency lines.
    pub exchange_rate: Option<Decimal>,
    /// Line memo.
    pub description: Option<String>,
}

impl LineInput {
    /// Creates a line on `direction` for `amount`.
    pub fn new(
        account: impl Into<AccountRef>,
        direction: Direction,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        let (debit, credit) = match direction {
            Direction::Debit => (amount, Decimal::ZERO),
            Direction::Credit => (Decimal::ZERO, amount),
        };
        Self {
            account: account.into(),
            debit,
            credit,
            currency,
            exchange_rate: None,
            description: None,
        }
    }

    /// Creates a debit line.
    pub fn debit(account: impl Into<AccountRef>, amount: Decimal, currency: Currency) -> Self {
        Self::new(account, Direction::Debit, amount, currency)
    }

    /// Creates a credit line.
    pub fn credit(account: impl Into<AccountRef>, amount: Decimal, currency: Currency) -> Self {
        Self::new(account, Direction::Credit, amount, currency)
    }

    /// Sets the exchange rate to base currency.
    #[must_use]
    pub fn at_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    /// Sets the line memo.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A posting request from a collaborator module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Optional external reference (e.g. invoice number).
    pub reference: Option<String>,
    /// Originating business object.
    pub source: Option<SourceRef>,
    /// Ordered lines.
    pub lines: Vec<LineInput>,
    /// Who is creating the entry.
    pub created_by: ActorId,
}

impl EntryRequest {
    /// Starts a request with no lines.
    pub fn new(entry_date: NaiveDate, description: impl Into<String>, created_by: ActorId) -> Self {
        Self {
            entry_date,
            description: description.into(),
            reference: None,
            source: None,
            lines: Vec::new(),
            created_by,
        }
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    /// Sets the external reference.
    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the originating business object.
    #[must_use]
    pub fn source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }
}

/// Information about an account needed for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// The account code.
    pub code: String,
    /// Whether the account is active.
    pub is_active: bool,
}

/// One stored leg of a journal entry. Base amounts are frozen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Line ID.
    pub id: JournalLineId,
    /// 1-based position within the entry.
    pub line_no: u32,
    /// Account the line posts to.
    pub account_id: AccountId,
    /// Line memo.
    pub description: Option<String>,
    /// Debit in transaction currency.
    pub debit: Decimal,
    /// Credit in transaction currency.
    pub credit: Decimal,
    /// Transaction currency.
    pub currency: Currency,
    /// Rate to base currency.
    pub exchange_rate: Decimal,
    /// Debit in base currency.
    pub base_debit: Decimal,
    /// Credit in base currency.
    pub base_credit: Decimal,
}

impl JournalLine {
    /// Side of the line.
    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.debit > Decimal::ZERO {
            Direction::Debit
        } else {
            Direction::Credit
        }
    }

    /// Copy of the line with debit and credit swapped in both currencies.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            id: JournalLineId::new(),
            line_no: self.line_no,
            account_id: self.account_id,
            description: self.description.clone(),
            debit: self.credit,
            credit: self.debit,
            currency: self.currency.clone(),
            exchange_rate: self.exchange_rate,
            base_debit: self.base_credit,
            base_credit: self.base_debit,
        }
    }
}

/// Base-currency totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTotals {
    /// Sum of base debits.
    pub base_debit: Decimal,
    /// Sum of base credits.
    pub base_credit: Decimal,
}

impl EntryTotals {
    /// Sums the base amounts of `lines`.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` naming the line at which a sum overflows.
    pub fn of(lines: &[JournalLine]) -> Result<Self, LedgerError> {
        lines.iter().try_fold(
            Self {
                base_debit: Decimal::ZERO,
                base_credit: Decimal::ZERO,
            },
            |totals, line| {
                let out_of_range = || LedgerError::AmountOutOfRange {
                    line: line.line_no as usize,
                };
                Ok(Self {
                    base_debit: totals
                        .base_debit
                        .checked_add(line.base_debit)
                        .ok_or_else(out_of_range)?,
                    base_credit: totals
                        .base_credit
                        .checked_add(line.base_credit)
                        .ok_or_else(out_of_range)?,
                })
            },
        )
    }

    /// Exact decimal equality; there is no tolerance.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.base_debit == self.base_credit
    }

    /// Debits minus credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.base_debit - self.base_credit
    }
}
