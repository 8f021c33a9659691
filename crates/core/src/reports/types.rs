//! Report data types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, Currency};

use crate::accounts::AccountType;

/// Summed base-currency activity of one account, as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Total base debits.
    pub total_debit: Decimal,
    /// Total base credits.
    pub total_credit: Decimal,
}

impl AccountActivity {
    /// Net balance under the account type's normal sign convention.
    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.account_type
            .normal_balance()
            .balance(self.total_debit, self.total_credit)
    }

    /// Returns true if anything was ever posted to the account.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        !self.total_debit.is_zero() || !self.total_credit.is_zero()
    }
}

/// Trial balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Total base debits.
    pub total_debit: Decimal,
    /// Total base credits.
    pub total_credit: Decimal,
    /// Net balance in the normal direction.
    pub balance: Decimal,
    /// Net debit position, zero if the account nets to credit.
    pub debit_balance: Decimal,
    /// Net credit position, zero if the account nets to debit.
    pub credit_balance: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Inclusive cut-off date.
    pub as_of: NaiveDate,
    /// Base currency.
    pub currency: Currency,
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of row debits.
    pub total_debit: Decimal,
    /// Sum of row credits.
    pub total_credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

/// One account on a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Amount in the section's natural sign.
    pub amount: Decimal,
}

/// A titled group of statement lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSection {
    /// Section total.
    pub total: Decimal,
    /// Accounts in this section, ordered by code.
    pub lines: Vec<StatementLine>,
}

impl StatementSection {
    pub(crate) fn push(&mut self, activity: &AccountActivity) {
        let amount = activity.balance();
        self.total += amount;
        self.lines.push(StatementLine {
            account_id: activity.account_id,
            code: activity.code.clone(),
            name: activity.name.clone(),
            amount,
        });
    }
}

/// Balance sheet as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Inclusive cut-off date.
    pub as_of: NaiveDate,
    /// Base currency.
    pub currency: Currency,
    /// Asset accounts.
    pub assets: StatementSection,
    /// Liability accounts.
    pub liabilities: StatementSection,
    /// Equity accounts.
    pub equity: StatementSection,
    /// Revenue minus expenses not yet closed to equity.
    pub current_earnings: Decimal,
    /// Equity section total plus current earnings.
    pub total_equity: Decimal,
    /// Liabilities plus total equity.
    pub liabilities_and_equity: Decimal,
    /// Whether assets equal liabilities plus equity.
    pub is_balanced: bool,
}

/// Income statement over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatement {
    /// First day of the period.
    pub from: NaiveDate,
    /// Last day of the period.
    pub to: NaiveDate,
    /// Base currency.
    pub currency: Currency,
    /// Revenue accounts.
    pub revenue: StatementSection,
    /// Expense accounts.
    pub expenses: StatementSection,
    /// Revenue minus expenses.
    pub net_income: Decimal,
}
