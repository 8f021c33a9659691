//! Tests for report generation.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::{AccountId, Currency};

use super::service::ReportService;
use super::types::AccountActivity;
use crate::accounts::AccountType;
use crate::error::LedgerError;

fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn activity(code: &str, account_type: AccountType, debit: Decimal, credit: Decimal) -> AccountActivity {
    AccountActivity {
        account_id: AccountId::new(),
        code: code.to_string(),
        name: format!("Account {code}"),
        account_type,
        total_debit: debit,
        total_credit: credit,
    }
}

/// A small chart covering every account type.
const CHART: [(&str, AccountType); 6] = [
    ("1000", AccountType::Asset),
    ("1100", AccountType::Asset),
    ("2000", AccountType::Liability),
    ("3000", AccountType::Equity),
    ("4000", AccountType::Revenue),
    ("5000", AccountType::Expense),
];

/// Posts each (debit account, credit account, amount) transfer and sums per account.
fn aggregate(transfers: &[(usize, usize, Decimal)]) -> Vec<AccountActivity> {
    let mut accounts: Vec<AccountActivity> = CHART
        .iter()
        .map(|(code, ty)| activity(code, *ty, Decimal::ZERO, Decimal::ZERO))
        .collect();
    for (debit, credit, amount) in transfers {
        accounts[*debit].total_debit += *amount;
        accounts[*credit].total_credit += *amount;
    }
    accounts
}

fn transfer_strategy() -> impl Strategy<Value = (usize, usize, Decimal)> {
    (
        0..CHART.len(),
        0..CHART.len(),
        (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any set of balanced entries produces a balanced trial balance.
    #[test]
    fn prop_trial_balance_of_balanced_entries_balances(
        transfers in prop::collection::vec(transfer_strategy(), 0..30),
    ) {
        let report = ReportService::trial_balance(as_of(), usd(), aggregate(&transfers));

        prop_assert!(report.is_balanced);
        prop_assert_eq!(report.total_debit, report.total_credit);
        prop_assert!(ReportService::ensure_balanced(&report).is_ok());

        let net_debits: Decimal = report.rows.iter().map(|r| r.debit_balance).sum();
        let net_credits: Decimal = report.rows.iter().map(|r| r.credit_balance).sum();
        prop_assert_eq!(net_debits, net_credits);
    }

    /// Assets = Liabilities + Equity once current earnings are included.
    #[test]
    fn prop_balance_sheet_equation_holds(
        transfers in prop::collection::vec(transfer_strategy(), 0..30),
    ) {
        let sheet = ReportService::balance_sheet(as_of(), usd(), aggregate(&transfers));
        prop_assert!(sheet.is_balanced);
        prop_assert_eq!(sheet.assets.total, sheet.liabilities_and_equity);
    }

    /// Current earnings on the balance sheet equal net income over all time.
    #[test]
    fn prop_current_earnings_equal_net_income(
        transfers in prop::collection::vec(transfer_strategy(), 0..30),
    ) {
        let accounts = aggregate(&transfers);
        let sheet = ReportService::balance_sheet(as_of(), usd(), accounts.clone());
        let from = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let income = ReportService::income_statement(from, as_of(), usd(), accounts)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(sheet.current_earnings, income.net_income);
    }
}

#[test]
fn test_trial_balance_rows_are_ordered_and_skip_idle_accounts() {
    let report = ReportService::trial_balance(
        as_of(),
        usd(),
        vec![
            activity("4000", AccountType::Revenue, dec!(0), dec!(1000.00)),
            activity("1500", AccountType::Asset, dec!(0), dec!(0)),
            activity("1100", AccountType::Asset, dec!(1000.00), dec!(0)),
        ],
    );

    let codes: Vec<&str> = report.rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["1100", "4000"]);
    assert_eq!(report.rows[0].debit_balance, dec!(1000.00));
    assert_eq!(report.rows[0].credit_balance, dec!(0));
    assert_eq!(report.rows[1].balance, dec!(1000.00));
    assert_eq!(report.rows[1].credit_balance, dec!(1000.00));
    assert!(report.is_balanced);
}

#[test]
fn test_voided_pair_keeps_rows_at_zero_net() {
    let report = ReportService::trial_balance(
        as_of(),
        usd(),
        vec![
            activity("1100", AccountType::Asset, dec!(1000.00), dec!(1000.00)),
            activity("4000", AccountType::Revenue, dec!(1000.00), dec!(1000.00)),
        ],
    );
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.balance.is_zero()));
    assert!(report.is_balanced);
}

#[test]
fn test_unbalanced_trial_balance_raises_integrity_alarm() {
    let report = ReportService::trial_balance(
        as_of(),
        usd(),
        vec![
            activity("1100", AccountType::Asset, dec!(1000.00), dec!(0)),
            activity("4000", AccountType::Revenue, dec!(0), dec!(999.99)),
        ],
    );
    assert!(!report.is_balanced);
    assert!(matches!(
        ReportService::ensure_balanced(&report),
        Err(LedgerError::IntegrityAlarm { .. })
    ));
}

#[test]
fn test_income_statement_sections() {
    let statement = ReportService::income_statement(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        as_of(),
        usd(),
        vec![
            activity("4000", AccountType::Revenue, dec!(0), dec!(5000.00)),
            activity("5000", AccountType::Expense, dec!(1200.00), dec!(0)),
            activity("1000", AccountType::Asset, dec!(3800.00), dec!(0)),
        ],
    )
    .unwrap();

    assert_eq!(statement.revenue.total, dec!(5000.00));
    assert_eq!(statement.expenses.total, dec!(1200.00));
    assert_eq!(statement.net_income, dec!(3800.00));
    assert_eq!(statement.revenue.lines.len(), 1);
}

#[test]
fn test_income_statement_rejects_inverted_period() {
    let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    assert_eq!(
        ReportService::income_statement(from, to, usd(), vec![]),
        Err(LedgerError::InvalidDateInterval { from, to })
    );
}
