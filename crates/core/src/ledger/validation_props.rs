//! Property-based tests for draft validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, ActorId, Currency};

use super::types::{AccountInfo, EntryRequest, LineInput};
use super::validation::EntryValidator;
use crate::accounts::AccountRef;
use crate::error::{ErrorClass, LedgerError};

fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

/// Amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Every code resolves to an active account with a stable ID.
fn lookup(ids: &[AccountId]) -> impl Fn(&AccountRef) -> Option<AccountInfo> + '_ {
    move |account: &AccountRef| match account {
        AccountRef::Code(code) => code.parse::<usize>().ok().and_then(|idx| {
            ids.get(idx).map(|id| AccountInfo {
                id: *id,
                code: code.clone(),
                is_active: true,
            })
        }),
        AccountRef::Id(_) => None,
    }
}

/// A request debiting each amount to its own account and crediting the sum.
fn balanced_request(debits: &[Decimal]) -> EntryRequest {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    let total: Decimal = debits.iter().copied().sum();
    let mut request = EntryRequest::new(date, "generated", ActorId::new());
    for (idx, amount) in debits.iter().enumerate() {
        request = request.line(LineInput::debit(idx.to_string().as_str(), *amount, usd()));
    }
    request.line(LineInput::credit(debits.len().to_string().as_str(), total, usd()))
}

/// Any non-negative decimal `rust_decimal` can represent.
fn any_magnitude() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), 0u32..=28)
        .prop_map(|(lo, mid, hi, scale)| Decimal::from_parts(lo, mid, hi, false, scale))
}

fn account_ids(n: usize) -> Vec<AccountId> {
    (0..=n).map(|_| AccountId::new()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any entry whose credits equal its debits resolves, and totals match the input.
    #[test]
    fn prop_balanced_entries_resolve(debits in prop::collection::vec(positive_amount(), 1..8)) {
        let ids = account_ids(debits.len());
        let request = balanced_request(&debits);
        let total: Decimal = debits.iter().copied().sum();

        let (lines, totals) = EntryValidator::validate_and_resolve(&request, &usd(), lookup(&ids))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(lines.len(), debits.len() + 1);
        prop_assert_eq!(totals.base_debit, total);
        prop_assert_eq!(totals.base_credit, total);
        for (idx, line) in lines.iter().enumerate() {
            prop_assert_eq!(line.line_no as usize, idx + 1);
        }
    }

    /// Moving any single line by one minor unit makes the entry unbalanced.
    #[test]
    fn prop_one_cent_off_is_rejected(
        debits in prop::collection::vec(positive_amount(), 1..8),
        bump_up in any::<bool>(),
    ) {
        let ids = account_ids(debits.len());
        let mut request = balanced_request(&debits);
        let last = request.lines.len() - 1;
        let cent = Decimal::new(1, 2);
        if bump_up {
            request.lines[last].credit += cent;
        } else {
            request.lines[0].debit += cent;
        }

        let result = EntryValidator::validate_and_resolve(&request, &usd(), lookup(&ids));
        let is_unbalanced = matches!(result, Err(LedgerError::UnbalancedEntry { .. }));
        prop_assert!(is_unbalanced);
    }

    /// Line order never changes acceptance or totals.
    #[test]
    fn prop_line_order_is_irrelevant(debits in prop::collection::vec(positive_amount(), 1..8)) {
        let ids = account_ids(debits.len());
        let request = balanced_request(&debits);
        let mut reversed = request.clone();
        reversed.lines.reverse();

        let (_, forward) = EntryValidator::validate_and_resolve(&request, &usd(), lookup(&ids))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let (_, backward) = EntryValidator::validate_and_resolve(&reversed, &usd(), lookup(&ids))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(forward, backward);
    }

    /// Extreme amounts and rates end in a result or a validation error, never a panic.
    #[test]
    fn prop_extreme_inputs_fail_as_validation(amount in any_magnitude(), rate in any_magnitude()) {
        let ids = account_ids(1);
        let eur = Currency::new("EUR").unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let request = EntryRequest::new(date, "generated", ActorId::new())
            .line(LineInput::debit("0", amount, eur.clone()).at_rate(rate))
            .line(LineInput::credit("1", amount, eur).at_rate(rate));

        if let Err(err) = EntryValidator::validate_and_resolve(&request, &usd(), lookup(&ids)) {
            prop_assert_eq!(err.class(), ErrorClass::Validation, "{}", err);
        }
    }

    /// A line with both sides set is always rejected, whatever the totals.
    #[test]
    fn prop_two_sided_lines_rejected(debit in positive_amount(), credit in positive_amount()) {
        prop_assert_eq!(
            EntryValidator::check_sides(1, debit, credit),
            Err(LedgerError::InvalidLineAmounts { line: 1 })
        );
    }
}
