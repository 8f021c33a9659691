//! Chart of accounts domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TenantId};

/// Closed account type taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owners' residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

/// Side on which an account's balance increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Asset and Expense accounts.
    Debit,
    /// Liability, Equity and Revenue accounts.
    Credit,
}

impl NormalBalance {
    /// Signed balance of the given totals under this convention.
    ///
    /// - Debit-normal: balance = debit - credit
    /// - Credit-normal: balance = credit - debit
    #[must_use]
    pub fn balance(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

impl AccountType {
    /// All account types in statement order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// The side on which this type's balance increases.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    /// Parses a type from its storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in a tenant's chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Tenant-unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Fixed account type.
    pub account_type: AccountType,
    /// Parent account in the hierarchy.
    pub parent_id: Option<AccountId>,
    /// Whether new lines may post to this account.
    pub is_active: bool,
    /// System accounts can never be deleted or deactivated.
    pub is_system: bool,
}

impl Account {
    /// Signed balance of the given totals under this account's convention.
    #[must_use]
    pub fn balance_of(&self, debit: Decimal, credit: Decimal) -> Decimal {
        self.account_type.normal_balance().balance(debit, credit)
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Tenant-unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Optional parent, resolved inside the tenant.
    pub parent: Option<AccountRef>,
    /// Marks the account as system-protected.
    pub is_system: bool,
}

impl NewAccount {
    /// Creates input for a regular, root-level account.
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent: None,
            is_system: false,
        }
    }

    /// Places the account under `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: AccountRef) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Marks the account as system-protected.
    #[must_use]
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// How a caller names an account: by id or by tenant-scoped code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountRef {
    /// By account ID.
    Id(AccountId),
    /// By tenant-scoped code.
    Code(String),
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for AccountRef {
    fn from(code: &str) -> Self {
        Self::Code(code.to_string())
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => write!(f, "'{code}'"),
        }
    }
}
