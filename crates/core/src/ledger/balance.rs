//! Account balance calculations.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, Currency};

use crate::accounts::NormalBalance;

/// Posted balance of one account as of a date, in the tenant's base currency.
///
/// - Debit-normal accounts (Asset, Expense): balance = debits - credits
/// - Credit-normal accounts (Liability, Equity, Revenue): balance = credits - debits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Inclusive cut-off date.
    pub as_of: NaiveDate,
    /// Sum of base debits.
    pub total_debit: Decimal,
    /// Sum of base credits.
    pub total_credit: Decimal,
    /// Net balance in the account's normal direction.
    pub balance: Decimal,
    /// Tenant base currency.
    pub currency: Currency,
}

impl AccountBalance {
    /// Balance with nothing posted.
    #[must_use]
    pub fn empty(account_id: AccountId, as_of: NaiveDate, currency: Currency) -> Self {
        Self {
            account_id,
            as_of,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            balance: Decimal::ZERO,
            currency,
        }
    }

    /// Builds a balance from summed base totals.
    #[must_use]
    pub fn from_totals(
        account_id: AccountId,
        as_of: NaiveDate,
        normal: NormalBalance,
        total_debit: Decimal,
        total_credit: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            account_id,
            as_of,
            total_debit,
            total_credit,
            balance: normal.balance(total_debit, total_credit),
            currency,
        }
    }

    /// Returns true if nothing remains on the account.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.balance.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The two normal directions always report opposite balances.
        #[test]
        fn prop_normal_directions_are_opposite(
            debit in amount_strategy(),
            credit in amount_strategy(),
        ) {
            let id = AccountId::new();
            let as_debit = AccountBalance::from_totals(id, as_of(), NormalBalance::Debit, debit, credit, usd());
            let as_credit = AccountBalance::from_totals(id, as_of(), NormalBalance::Credit, debit, credit, usd());
            prop_assert_eq!(as_debit.balance, -as_credit.balance);
            prop_assert_eq!(as_debit.balance, debit - credit);
        }
    }

    #[test]
    fn test_debit_normal_balance() {
        let balance = AccountBalance::from_totals(
            AccountId::new(),
            as_of(),
            NormalBalance::Debit,
            dec!(1000.00),
            dec!(250.00),
            usd(),
        );
        assert_eq!(balance.balance, dec!(750.00));
    }

    #[test]
    fn test_credit_normal_balance() {
        let balance = AccountBalance::from_totals(
            AccountId::new(),
            as_of(),
            NormalBalance::Credit,
            dec!(30),
            dec!(100),
            usd(),
        );
        assert_eq!(balance.balance, dec!(70));
    }

    #[test]
    fn test_empty_balance_is_zero() {
        let balance = AccountBalance::empty(AccountId::new(), as_of(), usd());
        assert!(balance.is_zero());
        assert_eq!(balance.total_debit, Decimal::ZERO);
    }
}
