//! Property-based tests for effective-rate resolution.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{TaxRateId, TenantId};

use super::resolver::{check_no_overlap, effective_rate};
use super::types::{NewTaxRate, TaxRate};
use crate::error::LedgerError;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn day(offset: u64) -> NaiveDate {
    epoch().checked_add_days(Days::new(offset)).unwrap()
}

fn new_rate(rate: Decimal, from: NaiveDate, to: Option<NaiveDate>) -> NewTaxRate {
    NewTaxRate {
        jurisdiction: "DE".to_string(),
        category: "standard".to_string(),
        rate,
        valid_from: from,
        valid_to: to,
        account_id: None,
    }
}

/// Back-to-back intervals starting at the epoch, the last one open-ended.
fn contiguous_schedule(lengths: &[u64], tenant_id: Option<TenantId>) -> Vec<TaxRate> {
    let mut start = 0;
    let mut rates = Vec::with_capacity(lengths.len());
    for (idx, len) in lengths.iter().enumerate() {
        let end = start + len;
        let to = (idx + 1 < lengths.len()).then(|| day(end));
        rates.push(
            new_rate(Decimal::new(idx as i64 + 1, 2), day(start), to).into_rate(TaxRateId::new(), tenant_id),
        );
        start = end;
    }
    rates
}

fn lengths_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..400, 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every date at or after the first start resolves to exactly the rate whose interval holds it.
    #[test]
    fn prop_contiguous_schedule_resolves_uniquely(
        lengths in lengths_strategy(),
        offset in 0u64..2_500,
    ) {
        let rates = contiguous_schedule(&lengths, None);
        let on = day(offset);
        let found = effective_rate(&rates, "de", "Standard", TenantId::new(), on)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert!(found.covers(on));
        prop_assert_eq!(rates.iter().filter(|r| r.covers(on)).count(), 1);
    }

    /// Resolution is a pure function of the candidate set.
    #[test]
    fn prop_resolution_is_deterministic(
        lengths in lengths_strategy(),
        offset in 0u64..2_500,
    ) {
        let rates = contiguous_schedule(&lengths, None);
        let mut shuffled = rates.clone();
        shuffled.reverse();
        let tenant = TenantId::new();

        let a = effective_rate(&rates, "DE", "standard", tenant, day(offset)).map(|r| r.id);
        let b = effective_rate(&shuffled, "DE", "standard", tenant, day(offset)).map(|r| r.id);
        prop_assert_eq!(a, b);
    }

    /// A tenant override covering the date always wins over the global rate.
    #[test]
    fn prop_tenant_override_wins(
        lengths in lengths_strategy(),
        offset in 0u64..2_500,
    ) {
        let tenant = TenantId::new();
        let mut rates = contiguous_schedule(&lengths, None);
        let override_rate = new_rate(Decimal::new(7, 2), epoch(), None).into_rate(TaxRateId::new(), Some(tenant));
        rates.push(override_rate.clone());

        let found = effective_rate(&rates, "DE", "standard", tenant, day(offset))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(found.id, override_rate.id);

        let other = effective_rate(&rates, "DE", "standard", TenantId::new(), day(offset))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(other.tenant_id.is_none());
    }

    /// Any interval starting inside an existing one is refused.
    #[test]
    fn prop_overlap_detected(
        lengths in lengths_strategy(),
        offset in 0u64..2_500,
    ) {
        let rates = contiguous_schedule(&lengths, None);
        let candidate = new_rate(Decimal::new(5, 2), day(offset), None);
        let result = check_no_overlap(&rates, None, &candidate);
        let is_overlap = matches!(result, Err(LedgerError::OverlappingTaxRate { .. }));
        prop_assert!(is_overlap);

        prop_assert!(check_no_overlap(&rates, Some(TenantId::new()), &candidate).is_ok());
    }
}

#[test]
fn test_date_before_first_rate_has_no_rate() {
    let rates = contiguous_schedule(&[30], None);
    let before = NaiveDate::from_ymd_opt(2019, 12, 31).unwrap();
    assert!(matches!(
        effective_rate(&rates, "DE", "standard", TenantId::new(), before),
        Err(LedgerError::NoRateDefined { .. })
    ));
}
