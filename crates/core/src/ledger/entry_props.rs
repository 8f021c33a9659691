//! Property-based tests for posting, voiding and reversal.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tally_shared::types::{AccountId, ActorId, Currency, JournalLineId, TenantId};

use super::entry::JournalEntry;
use super::numbering::EntryNumber;
use super::types::{EntryRequest, EntryStatus, EntryTotals, JournalLine};

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_line(line_no: u32, account_id: AccountId, debit: Decimal, credit: Decimal) -> JournalLine {
    JournalLine {
        id: JournalLineId::new(),
        line_no,
        account_id,
        description: None,
        debit,
        credit,
        currency: Currency::new("USD").unwrap(),
        exchange_rate: Decimal::ONE,
        base_debit: debit,
        base_credit: credit,
    }
}

/// A posted entry debiting one account per amount and crediting a single account.
fn posted_entry(debits: &[Decimal]) -> JournalEntry {
    let total: Decimal = debits.iter().copied().sum();
    let mut lines: Vec<JournalLine> = debits
        .iter()
        .enumerate()
        .map(|(idx, amount)| make_line(idx as u32 + 1, AccountId::new(), *amount, Decimal::ZERO))
        .collect();
    lines.push(make_line(debits.len() as u32 + 1, AccountId::new(), Decimal::ZERO, total));

    let request = EntryRequest::new(
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        "generated",
        ActorId::new(),
    );
    let mut entry = JournalEntry::draft(TenantId::new(), &request, lines, Utc::now());
    entry.post(EntryNumber::new("JE", 1, 5), ActorId::new(), Utc::now()).unwrap();
    entry
}

/// Net base movement per account over a set of entries.
fn net_by_account(entries: &[&JournalEntry]) -> HashMap<AccountId, Decimal> {
    let mut net = HashMap::new();
    for entry in entries {
        for line in &entry.lines {
            *net.entry(line.account_id).or_insert(Decimal::ZERO) += line.base_debit - line.base_credit;
        }
    }
    net
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An entry and its reversal leave every account where it started.
    #[test]
    fn prop_reversal_nets_to_zero(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let original = posted_entry(&debits);
        let reversal = original.reversal(ActorId::new(), "correction", Utc::now())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(reversal.totals(), original.totals());
        for (_, net) in net_by_account(&[&original, &reversal]) {
            prop_assert_eq!(net, Decimal::ZERO);
        }
    }

    /// Reversing twice gives back the original lines.
    #[test]
    fn prop_double_swap_is_identity(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let original = posted_entry(&debits);
        for line in &original.lines {
            let twice = line.swapped().swapped();
            prop_assert_eq!(twice.debit, line.debit);
            prop_assert_eq!(twice.credit, line.credit);
            prop_assert_eq!(twice.account_id, line.account_id);
        }
    }

    /// Voiding never changes the sealed content.
    #[test]
    fn prop_void_preserves_digest(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let original = posted_entry(&debits);
        let reversal = original.reversal(ActorId::new(), "correction", Utc::now())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        let mut voided = original.clone();
        voided.mark_voided(reversal.id, ActorId::new(), "correction", Utc::now())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(voided.status, EntryStatus::Voided);
        prop_assert_eq!(voided.content_digest(), original.content_digest());
        prop_assert!(voided.verify_integrity().is_ok());
    }

    /// Posted totals always balance.
    #[test]
    fn prop_posted_totals_balance(debits in prop::collection::vec(positive_amount(), 1..6)) {
        let entry = posted_entry(&debits);
        let totals: EntryTotals = entry.totals()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(totals.is_balanced());
        prop_assert_eq!(totals.difference(), Decimal::ZERO);
    }
}
