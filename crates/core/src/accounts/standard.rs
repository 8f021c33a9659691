//! Standard system chart created when a tenant is bootstrapped.
//!
//! Posting adapters rely on these codes existing in every tenant, so they are
//! system-protected.

use super::types::{AccountType, NewAccount};

/// A system account every tenant receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardAccount {
    /// Account code.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Account type.
    pub account_type: AccountType,
}

impl StandardAccount {
    /// Input for creating this account.
    #[must_use]
    pub fn to_new_account(self) -> NewAccount {
        NewAccount::new(self.code, self.name, self.account_type).system()
    }
}

const STANDARD_CHART: [StandardAccount; 8] = [
    StandardAccount { code: "1000", name: "Cash", account_type: AccountType::Asset },
    StandardAccount { code: "1100", name: "Accounts Receivable", account_type: AccountType::Asset },
    StandardAccount { code: "2000", name: "Accounts Payable", account_type: AccountType::Liability },
    StandardAccount { code: "2100", name: "Tax Payable", account_type: AccountType::Liability },
    StandardAccount { code: "3000", name: "Owner's Equity", account_type: AccountType::Equity },
    StandardAccount { code: "3900", name: "Retained Earnings", account_type: AccountType::Equity },
    StandardAccount { code: "4000", name: "Revenue", account_type: AccountType::Revenue },
    StandardAccount { code: "5000", name: "Operating Expenses", account_type: AccountType::Expense },
];

/// The system accounts every tenant receives, in code order.
#[must_use]
pub fn standard_chart() -> &'static [StandardAccount] {
    &STANDARD_CHART
}
