//! Ledger error taxonomy.
//!
//! Every failure the core can produce is a `LedgerError`, and every variant
//! belongs to exactly one [`ErrorClass`]. Validation and state errors are
//! caller-correctable; integrity alarms mean a core invariant was violated
//! and must be escalated, never logged-and-continued.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::error::{AppError, INTERNAL_CONSISTENCY_MESSAGE};
use tally_shared::types::{AccountId, JournalEntryId, TaxRateId, TenantId};
use thiserror::Error;

/// Broad category of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller-correctable input error. Never retried automatically.
    Validation,
    /// Operation not allowed in the record's current state.
    State,
    /// Unknown tenant, account, entry or rate.
    NotFound,
    /// A core invariant has been violated.
    Integrity,
    /// Infrastructure failure; the unit of work was rolled back.
    Transient,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry has no lines.
    #[error("Journal entry must have at least one line")]
    EmptyEntry,

    /// Base-currency debits and credits differ.
    #[error("entry does not balance: debits {debits}, credits {credits}")]
    UnbalancedEntry {
        /// Sum of base-currency debits.
        debits: Decimal,
        /// Sum of base-currency credits.
        credits: Decimal,
    },

    /// Entry balances but moves no value.
    #[error("Journal entry balances at zero and moves no value")]
    ZeroValueEntry,

    /// A line must carry exactly one positive side and no negative amount.
    #[error("Line {line} must have exactly one positive side (debit or credit)")]
    InvalidLineAmounts {
        /// 1-based line number.
        line: usize,
    },

    /// A line amount has more fractional digits than its currency allows.
    #[error("Line {line} amount is not exact in {currency} minor units")]
    AmountPrecision {
        /// 1-based line number.
        line: usize,
        /// Line currency code.
        currency: String,
    },

    /// A line amount, or its base-currency value, exceeds what the ledger can hold.
    #[error("Line {line} amount is out of range")]
    AmountOutOfRange {
        /// 1-based line number.
        line: usize,
    },

    /// A foreign-currency line has no exchange rate.
    #[error("Line {line} is in a foreign currency and needs an exchange rate")]
    MissingExchangeRate {
        /// 1-based line number.
        line: usize,
    },

    /// Exchange rate must be positive with at most 12 decimals, and exactly 1
    /// for base-currency lines.
    #[error("Line {line} has an invalid exchange rate")]
    InvalidExchangeRate {
        /// 1-based line number.
        line: usize,
    },

    /// Account is unknown to the tenant or inactive.
    #[error("Invalid account {account}: {reason}")]
    InvalidAccount {
        /// The code or id the caller supplied.
        account: String,
        /// Why the account was rejected.
        reason: String,
    },

    /// Currency code is malformed.
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),

    /// Account code is empty or contains unsupported characters.
    #[error("Invalid account code: '{0}'")]
    InvalidAccountCode(String),

    /// Account name is blank.
    #[error("Invalid account name: '{0}'")]
    InvalidAccountName(String),

    /// Account code already exists in the tenant.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Parent is unknown to the tenant or would create a cycle.
    #[error("Invalid parent account: {0}")]
    InvalidParent(String),

    /// Policy forbids deactivating an account that still holds a balance.
    #[error("Account {account} still has a balance of {balance}")]
    AccountHasBalance {
        /// The account.
        account: AccountId,
        /// Current posted balance.
        balance: Decimal,
    },

    /// System accounts cannot be deleted or deactivated.
    #[error("Account {0} is system-protected")]
    SystemAccountProtected(AccountId),

    /// Account is referenced by journal lines and cannot be deleted.
    #[error("Account {0} is referenced by journal lines")]
    AccountInUse(AccountId),

    /// Interval end must be strictly after its start.
    #[error("Invalid date interval: {from} to {to}")]
    InvalidDateInterval {
        /// Inclusive start.
        from: NaiveDate,
        /// Exclusive end.
        to: NaiveDate,
    },

    /// Tax rate must be non-negative with at most 12 decimals.
    #[error("Invalid tax rate: {0}")]
    InvalidTaxRate(Decimal),

    /// Tax on this base would exceed what the ledger can hold.
    #[error("Tax base {0} is out of range")]
    TaxBaseOutOfRange(Decimal),

    /// A text field is longer than storage allows.
    #[error("{field} must be at most {max} characters")]
    FieldTooLong {
        /// Name of the field.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },

    /// Another rate of the same scope is active on some of the same dates.
    #[error("Tax rate for {jurisdiction}/{category} overlaps rate {existing}")]
    OverlappingTaxRate {
        /// Jurisdiction code.
        jurisdiction: String,
        /// Rate category.
        category: String,
        /// The rate already covering part of the interval.
        existing: TaxRateId,
    },

    /// Rate already has an end date.
    #[error("Tax rate {0} is already closed")]
    TaxRateClosed(TaxRateId),

    /// A void must state why.
    #[error("A reason is required to void an entry")]
    VoidReasonRequired,

    /// Entries must be described.
    #[error("Journal entry description is required")]
    DescriptionRequired,

    /// Tenant registration input is malformed.
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    // ========== State Errors ==========
    /// Entry is already posted.
    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(JournalEntryId),

    /// Entry is already voided.
    #[error("Journal entry {0} is already voided")]
    AlreadyVoided(JournalEntryId),

    /// Only posted entries can be voided.
    #[error("Journal entry {0} is not posted")]
    NotPosted(JournalEntryId),

    /// Only drafts can be discarded.
    #[error("Journal entry {0} is not a draft")]
    NotDraft(JournalEntryId),

    /// Another writer changed the record first.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Not Found Errors ==========
    /// Tenant is unknown or inactive.
    #[error("Tenant not found: {0}")]
    TenantNotFound(TenantId),

    /// Account id is unknown to the tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account code is unknown to the tenant.
    #[error("Account code not found: '{0}'")]
    AccountCodeNotFound(String),

    /// Entry id is unknown to the tenant.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Tax rate id is unknown.
    #[error("Tax rate not found: {0}")]
    TaxRateNotFound(TaxRateId),

    /// No rate interval covers the date.
    #[error("No {category} tax rate defined for {jurisdiction} on {date}")]
    NoRateDefined {
        /// Jurisdiction code.
        jurisdiction: String,
        /// Rate category.
        category: String,
        /// Date being resolved.
        date: NaiveDate,
    },

    // ========== Integrity Errors ==========
    /// A core invariant was violated. The detail is for operators only.
    #[error("Integrity alarm: {detail}")]
    IntegrityAlarm {
        /// Operator-facing description.
        detail: String,
    },

    // ========== Transient Errors ==========
    /// The operation exceeded its deadline and was rolled back.
    #[error("Operation timed out after {after_ms} ms")]
    Timeout {
        /// Deadline that elapsed.
        after_ms: u64,
    },

    /// Storage was unavailable or failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Creates an integrity alarm.
    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::IntegrityAlarm {
            detail: detail.into(),
        }
    }

    /// Returns the class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyEntry
            | Self::UnbalancedEntry { .. }
            | Self::ZeroValueEntry
            | Self::InvalidLineAmounts { .. }
            | Self::AmountPrecision { .. }
            | Self::AmountOutOfRange { .. }
            | Self::MissingExchangeRate { .. }
            | Self::InvalidExchangeRate { .. }
            | Self::InvalidAccount { .. }
            | Self::InvalidCurrency(_)
            | Self::InvalidAccountCode(_)
            | Self::InvalidAccountName(_)
            | Self::DuplicateCode(_)
            | Self::InvalidParent(_)
            | Self::AccountHasBalance { .. }
            | Self::SystemAccountProtected(_)
            | Self::AccountInUse(_)
            | Self::InvalidDateInterval { .. }
            | Self::InvalidTaxRate(_)
            | Self::TaxBaseOutOfRange(_)
            | Self::FieldTooLong { .. }
            | Self::OverlappingTaxRate { .. }
            | Self::TaxRateClosed(_)
            | Self::VoidReasonRequired
            | Self::DescriptionRequired
            | Self::InvalidTenant(_) => ErrorClass::Validation,

            Self::AlreadyPosted(_)
            | Self::AlreadyVoided(_)
            | Self::NotPosted(_)
            | Self::NotDraft(_)
            | Self::ConcurrentModification => ErrorClass::State,

            Self::TenantNotFound(_)
            | Self::AccountNotFound(_)
            | Self::AccountCodeNotFound(_)
            | Self::EntryNotFound(_)
            | Self::TaxRateNotFound(_)
            | Self::NoRateDefined { .. } => ErrorClass::NotFound,

            Self::IntegrityAlarm { .. } => ErrorClass::Integrity,

            Self::Timeout { .. } | Self::Storage(_) => ErrorClass::Transient,
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry => "EMPTY_ENTRY",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::ZeroValueEntry => "ZERO_VALUE_ENTRY",
            Self::InvalidLineAmounts { .. } => "INVALID_LINE_AMOUNTS",
            Self::AmountPrecision { .. } => "AMOUNT_PRECISION",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::MissingExchangeRate { .. } => "MISSING_EXCHANGE_RATE",
            Self::InvalidExchangeRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::InvalidAccount { .. } => "INVALID_ACCOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidAccountCode(_) => "INVALID_ACCOUNT_CODE",
            Self::InvalidAccountName(_) => "INVALID_ACCOUNT_NAME",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::InvalidParent(_) => "INVALID_PARENT",
            Self::AccountHasBalance { .. } => "ACCOUNT_HAS_BALANCE",
            Self::SystemAccountProtected(_) => "SYSTEM_ACCOUNT_PROTECTED",
            Self::AccountInUse(_) => "ACCOUNT_IN_USE",
            Self::InvalidDateInterval { .. } => "INVALID_DATE_INTERVAL",
            Self::InvalidTaxRate(_) => "INVALID_TAX_RATE",
            Self::TaxBaseOutOfRange(_) => "TAX_BASE_OUT_OF_RANGE",
            Self::FieldTooLong { .. } => "FIELD_TOO_LONG",
            Self::OverlappingTaxRate { .. } => "OVERLAPPING_TAX_RATE",
            Self::TaxRateClosed(_) => "TAX_RATE_CLOSED",
            Self::VoidReasonRequired => "VOID_REASON_REQUIRED",
            Self::DescriptionRequired => "DESCRIPTION_REQUIRED",
            Self::InvalidTenant(_) => "INVALID_TENANT",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::AlreadyVoided(_) => "ALREADY_VOIDED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::NotDraft(_) => "NOT_DRAFT",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::TenantNotFound(_) => "TENANT_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::TaxRateNotFound(_) => "TAX_RATE_NOT_FOUND",
            Self::NoRateDefined { .. } => "NO_RATE_DEFINED",
            Self::IntegrityAlarm { .. } => "INTEGRITY_ALARM",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns true if the caller may retry. The core never retries itself.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }

    /// Message safe to show an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.class() {
            ErrorClass::Integrity => INTERNAL_CONSISTENCY_MESSAGE.to_string(),
            ErrorClass::Transient => {
                "the ledger is temporarily unavailable, please try again".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Fails with `FieldTooLong` if `value` has more than `max` characters.
pub fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), LedgerError> {
    if value.chars().count() > max {
        return Err(LedgerError::FieldTooLong { field, max });
    }
    Ok(())
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err.class() {
            ErrorClass::Validation => Self::Validation(err.user_message()),
            ErrorClass::State => Self::State(err.user_message()),
            ErrorClass::NotFound => Self::NotFound(err.user_message()),
            ErrorClass::Integrity => Self::Internal,
            ErrorClass::Transient => Self::Unavailable(err.user_message()),
        }
    }
}
