//! Report generation service.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::Currency;

use super::types::{
    AccountActivity, BalanceSheet, IncomeStatement, StatementSection, TrialBalance,
    TrialBalanceRow,
};
use crate::accounts::AccountType;
use crate::error::LedgerError;

/// Service for generating financial reports from summed account activity.
pub struct ReportService;

impl ReportService {
    /// Generates a trial balance.
    ///
    /// Accounts without activity are omitted; rows are ordered by code.
    #[must_use]
    pub fn trial_balance(
        as_of: NaiveDate,
        currency: Currency,
        activity: Vec<AccountActivity>,
    ) -> TrialBalance {
        let mut rows: Vec<TrialBalanceRow> = activity
            .into_iter()
            .filter(AccountActivity::has_activity)
            .map(|a| {
                let net_debit = a.total_debit - a.total_credit;
                TrialBalanceRow {
                    balance: a.balance(),
                    debit_balance: net_debit.max(Decimal::ZERO),
                    credit_balance: (-net_debit).max(Decimal::ZERO),
                    account_id: a.account_id,
                    code: a.code,
                    name: a.name,
                    account_type: a.account_type,
                    total_debit: a.total_debit,
                    total_credit: a.total_credit,
                }
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));

        let total_debit: Decimal = rows.iter().map(|r| r.total_debit).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.total_credit).sum();

        TrialBalance {
            as_of,
            currency,
            rows,
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Turns an unbalanced trial balance into an integrity alarm.
    pub fn ensure_balanced(report: &TrialBalance) -> Result<(), LedgerError> {
        if report.is_balanced {
            return Ok(());
        }
        Err(LedgerError::integrity(format!(
            "trial balance as of {} does not balance: debits {}, credits {}",
            report.as_of, report.total_debit, report.total_credit
        )))
    }

    /// Generates a balance sheet.
    ///
    /// Revenue and expense activity is rolled into equity as current earnings.
    #[must_use]
    pub fn balance_sheet(
        as_of: NaiveDate,
        currency: Currency,
        mut activity: Vec<AccountActivity>,
    ) -> BalanceSheet {
        activity.sort_by(|a, b| a.code.cmp(&b.code));

        let mut assets = StatementSection::default();
        let mut liabilities = StatementSection::default();
        let mut equity = StatementSection::default();
        let mut current_earnings = Decimal::ZERO;

        for account in activity.iter().filter(|a| a.has_activity()) {
            match account.account_type {
                AccountType::Asset => assets.push(account),
                AccountType::Liability => liabilities.push(account),
                AccountType::Equity => equity.push(account),
                AccountType::Revenue => current_earnings += account.balance(),
                AccountType::Expense => current_earnings -= account.balance(),
            }
        }

        let total_equity = equity.total + current_earnings;
        let liabilities_and_equity = liabilities.total + total_equity;

        BalanceSheet {
            as_of,
            currency,
            is_balanced: assets.total == liabilities_and_equity,
            assets,
            liabilities,
            equity,
            current_earnings,
            total_equity,
            liabilities_and_equity,
        }
    }

    /// Generates an income statement over `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateInterval` if `from` is after `to`.
    pub fn income_statement(
        from: NaiveDate,
        to: NaiveDate,
        currency: Currency,
        mut activity: Vec<AccountActivity>,
    ) -> Result<IncomeStatement, LedgerError> {
        check_period(from, to)?;
        activity.sort_by(|a, b| a.code.cmp(&b.code));

        let mut revenue = StatementSection::default();
        let mut expenses = StatementSection::default();

        for account in activity.iter().filter(|a| a.has_activity()) {
            match account.account_type {
                AccountType::Revenue => revenue.push(account),
                AccountType::Expense => expenses.push(account),
                _ => {}
            }
        }

        Ok(IncomeStatement {
            from,
            to,
            currency,
            net_income: revenue.total - expenses.total,
            revenue,
            expenses,
        })
    }
}

/// Checks that a reporting period is not inverted.
pub fn check_period(from: NaiveDate, to: NaiveDate) -> Result<(), LedgerError> {
    if from > to {
        return Err(LedgerError::InvalidDateInterval { from, to });
    }
    Ok(())
}
