//! Draft validation and line resolution.
//!
//! Everything here runs before any write. A request that passes produces the
//! exact lines that will be stored, with base amounts frozen.

use rust_decimal::Decimal;
use tally_shared::types::{Currency, JournalLineId, Money, amount_in_range, rate_in_range};

use super::types::{AccountInfo, EntryRequest, EntryTotals, JournalLine, LineInput};
use crate::accounts::AccountRef;
use crate::error::{LedgerError, check_length};

/// Maximum length of an entry's external reference.
pub const MAX_REFERENCE_LEN: usize = 100;
/// Maximum length of a source type.
pub const MAX_SOURCE_TYPE_LEN: usize = 50;
/// Maximum length of a source id.
pub const MAX_SOURCE_ID_LEN: usize = 100;

/// Validates posting requests and resolves them into journal lines.
///
/// This service contains pure business logic with no database dependencies;
/// account lookups are supplied by the caller.
pub struct EntryValidator;

impl EntryValidator {
    /// Validate and resolve a posting request.
    ///
    /// Steps, in order:
    /// 1. Description is present, reference and source fit, and at least one line exists
    /// 2. Each line has exactly one positive side, in range and exact at its currency's minor unit
    /// 3. Each line's exchange rate is valid for its currency
    /// 4. Each account exists in the tenant and is active
    /// 5. Base amounts are computed, rounded half away from zero and range-checked
    /// 6. Base debits equal base credits exactly, and the total is nonzero
    ///
    /// # Errors
    ///
    /// Returns the first `LedgerError` encountered.
    pub fn validate_and_resolve<A>(
        request: &EntryRequest,
        base_currency: &Currency,
        account_lookup: A,
    ) -> Result<(Vec<JournalLine>, EntryTotals), LedgerError>
    where
        A: Fn(&AccountRef) -> Option<AccountInfo>,
    {
        if request.description.trim().is_empty() {
            return Err(LedgerError::DescriptionRequired);
        }
        if let Some(reference) = &request.reference {
            check_length("reference", reference, MAX_REFERENCE_LEN)?;
        }
        if let Some(source) = &request.source {
            check_length("source type", &source.source_type, MAX_SOURCE_TYPE_LEN)?;
            check_length("source id", &source.source_id, MAX_SOURCE_ID_LEN)?;
        }
        if request.lines.is_empty() {
            return Err(LedgerError::EmptyEntry);
        }

        let mut resolved = Vec::with_capacity(request.lines.len());
        for (idx, line) in request.lines.iter().enumerate() {
            resolved.push(Self::resolve_line(idx + 1, line, base_currency, &account_lookup)?);
        }

        let totals = EntryTotals::of(&resolved)?;
        Self::check_totals(&totals)?;

        Ok((resolved, totals))
    }

    /// Checks that base totals balance exactly and move value.
    pub fn check_totals(totals: &EntryTotals) -> Result<(), LedgerError> {
        if !totals.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debits: totals.base_debit,
                credits: totals.base_credit,
            });
        }
        if totals.base_debit <= Decimal::ZERO {
            return Err(LedgerError::ZeroValueEntry);
        }
        Ok(())
    }

    /// Checks that exactly one side is positive and neither is negative.
    pub fn check_sides(line_no: usize, debit: Decimal, credit: Decimal) -> Result<Decimal, LedgerError> {
        match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, false) if credit.is_zero() => Ok(debit),
            (false, true) if debit.is_zero() => Ok(credit),
            _ => Err(LedgerError::InvalidLineAmounts { line: line_no }),
        }
    }

    fn resolve_line<A>(
        line_no: usize,
        line: &LineInput,
        base_currency: &Currency,
        account_lookup: &A,
    ) -> Result<JournalLine, LedgerError>
    where
        A: Fn(&AccountRef) -> Option<AccountInfo>,
    {
        let amount = Self::check_sides(line_no, line.debit, line.credit)?;
        if !amount_in_range(amount) {
            return Err(LedgerError::AmountOutOfRange { line: line_no });
        }

        let money = Money::new(amount, line.currency.clone());
        if !money.is_minor_exact() {
            return Err(LedgerError::AmountPrecision {
                line: line_no,
                currency: line.currency.to_string(),
            });
        }

        let exchange_rate = Self::resolve_rate(line_no, line, base_currency)?;

        let account = account_lookup(&line.account).ok_or_else(|| LedgerError::InvalidAccount {
            account: line.account.to_string(),
            reason: "account does not exist in this tenant".to_string(),
        })?;
        if !account.is_active {
            return Err(LedgerError::InvalidAccount {
                account: account.code,
                reason: "account is inactive".to_string(),
            });
        }

        let base = money
            .convert(exchange_rate, base_currency)
            .map(|converted| converted.amount)
            .filter(|base| amount_in_range(*base))
            .ok_or(LedgerError::AmountOutOfRange { line: line_no })?;
        let (base_debit, base_credit) = if line.debit > Decimal::ZERO {
            (base, Decimal::ZERO)
        } else {
            (Decimal::ZERO, base)
        };

        Ok(JournalLine {
            id: JournalLineId::new(),
            line_no: u32::try_from(line_no).unwrap_or(u32::MAX),
            account_id: account.id,
            description: line.description.clone(),
            debit: line.debit,
            credit: line.credit,
            currency: line.currency.clone(),
            exchange_rate,
            base_debit,
            base_credit,
        })
    }

    fn resolve_rate(
        line_no: usize,
        line: &LineInput,
        base_currency: &Currency,
    ) -> Result<Decimal, LedgerError> {
        if &line.currency == base_currency {
            return match line.exchange_rate {
                None => Ok(Decimal::ONE),
                Some(rate) if rate == Decimal::ONE => Ok(Decimal::ONE),
                Some(_) => Err(LedgerError::InvalidExchangeRate { line: line_no }),
            };
        }

        match line.exchange_rate {
            None => Err(LedgerError::MissingExchangeRate { line: line_no }),
            Some(rate) if rate > Decimal::ZERO && rate_in_range(rate) => Ok(rate),
            Some(_) => Err(LedgerError::InvalidExchangeRate { line: line_no }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{LineInput, SourceRef};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tally_shared::types::{AccountId, ActorId};

    fn usd() -> Currency {
        Currency::new("USD").unwrap()
    }

    fn eur() -> Currency {
        Currency::new("EUR").unwrap()
    }

    struct Chart(HashMap<String, AccountInfo>);

    impl Chart {
        fn new() -> Self {
            let mut accounts = HashMap::new();
            for (code, active) in [("1100", true), ("4000", true), ("2100", true), ("9999", false)] {
                accounts.insert(
                    code.to_string(),
                    AccountInfo {
                        id: AccountId::new(),
                        code: code.to_string(),
                        is_active: active,
                    },
                );
            }
            Self(accounts)
        }

        fn lookup(&self) -> impl Fn(&AccountRef) -> Option<AccountInfo> + '_ {
            |account: &AccountRef| match account {
                AccountRef::Code(code) => self.0.get(code).cloned(),
                AccountRef::Id(id) => self.0.values().find(|a| a.id == *id).cloned(),
            }
        }
    }

    fn request(lines: Vec<LineInput>) -> EntryRequest {
        let mut request = EntryRequest::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            "Invoice INV-001",
            ActorId::new(),
        );
        request.lines = lines;
        request
    }

    #[test]
    fn test_balanced_entry_resolves() {
        let chart = Chart::new();
        let req = request(vec![
            LineInput::debit("1100", dec!(1000.00), usd()),
            LineInput::credit("4000", dec!(1000.00), usd()),
        ]);

        let (lines, totals) = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_no, 1);
        assert_eq!(lines[0].base_debit, dec!(1000.00));
        assert_eq!(lines[1].base_credit, dec!(1000.00));
        assert_eq!(lines[0].exchange_rate, Decimal::ONE);
        assert_eq!(totals.base_debit, dec!(1000.00));
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_unbalanced_entry_reports_both_totals() {
        let chart = Chart::new();
        let req = request(vec![
            LineInput::debit("1100", dec!(1000.00), usd()),
            LineInput::credit("4000", dec!(999.99), usd()),
        ]);

        let result = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup());
        assert_eq!(
            result.unwrap_err(),
            LedgerError::UnbalancedEntry {
                debits: dec!(1000.00),
                credits: dec!(999.99)
            }
        );
    }

    #[test]
    fn test_empty_entry_rejected() {
        let chart = Chart::new();
        let result = EntryValidator::validate_and_resolve(&request(vec![]), &usd(), chart.lookup());
        assert_eq!(result.unwrap_err(), LedgerError::EmptyEntry);
    }

    #[test]
    fn test_blank_description_rejected() {
        let chart = Chart::new();
        let mut req = request(vec![LineInput::debit("1100", dec!(1), usd())]);
        req.description = "   ".to_string();
        let result = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup());
        assert_eq!(result.unwrap_err(), LedgerError::DescriptionRequired);
    }

    #[test]
    fn test_line_must_have_exactly_one_side() {
        let chart = Chart::new();
        let mut both = LineInput::debit("1100", dec!(10), usd());
        both.credit = dec!(10);
        let neither = LineInput::debit("1100", Decimal::ZERO, usd());
        let negative = LineInput::debit("1100", dec!(-10), usd());

        for bad in [both, neither, negative] {
            let req = request(vec![LineInput::credit("4000", dec!(10), usd()), bad]);
            let result = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup());
            assert_eq!(result.unwrap_err(), LedgerError::InvalidLineAmounts { line: 2 });
        }
    }

    #[test]
    fn test_unknown_and_inactive_accounts_rejected() {
        let chart = Chart::new();

        let req = request(vec![
            LineInput::debit("1234", dec!(10), usd()),
            LineInput::credit("4000", dec!(10), usd()),
        ]);
        let result = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup());
        assert!(matches!(result, Err(LedgerError::InvalidAccount { account, .. }) if account == "'1234'"));

        let req = request(vec![
            LineInput::debit("9999", dec!(10), usd()),
            LineInput::credit("4000", dec!(10), usd()),
        ]);
        let result = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup());
        assert!(matches!(result, Err(LedgerError::InvalidAccount { reason, .. }) if reason.contains("inactive")));
    }

    #[test]
    fn test_account_may_be_named_by_id() {
        let chart = Chart::new();
        let ar = chart.0["1100"].id;
        let req = request(vec![
            LineInput::debit(ar, dec!(5), usd()),
            LineInput::credit("4000", dec!(5), usd()),
        ]);
        let (lines, _) = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap();
        assert_eq!(lines[0].account_id, ar);
    }

    #[test]
    fn test_foreign_currency_lines_convert_and_freeze_base() {
        let chart = Chart::new();
        // 100.00 EUR at 1.08555 = 108.555 USD -> 108.56 (half away from zero)
        let req = request(vec![
            LineInput::debit("1100", dec!(100.00), eur()).at_rate(dec!(1.08555)),
            LineInput::credit("4000", dec!(108.56), usd()),
        ]);

        let (lines, totals) = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap();
        assert_eq!(lines[0].debit, dec!(100.00));
        assert_eq!(lines[0].currency, eur());
        assert_eq!(lines[0].exchange_rate, dec!(1.08555));
        assert_eq!(lines[0].base_debit, dec!(108.56));
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_exchange_rate_rules() {
        let chart = Chart::new();

        let req = request(vec![
            LineInput::debit("1100", dec!(100), eur()),
            LineInput::credit("4000", dec!(100), usd()),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::MissingExchangeRate { line: 1 }
        );

        let req = request(vec![
            LineInput::debit("1100", dec!(100), eur()).at_rate(dec!(0)),
            LineInput::credit("4000", dec!(100), usd()),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::InvalidExchangeRate { line: 1 }
        );

        let req = request(vec![
            LineInput::debit("1100", dec!(100), usd()),
            LineInput::credit("4000", dec!(100), usd()).at_rate(dec!(1.1)),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::InvalidExchangeRate { line: 2 }
        );
    }

    #[test]
    fn test_amount_must_fit_currency_minor_unit() {
        let chart = Chart::new();
        let req = request(vec![
            LineInput::debit("1100", dec!(10.005), usd()),
            LineInput::credit("4000", dec!(10.005), usd()),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::AmountPrecision {
                line: 1,
                currency: "USD".to_string()
            }
        );
    }

    #[test]
    fn test_huge_foreign_amount_is_rejected_not_panicking() {
        let chart = Chart::new();
        let req = request(vec![
            LineInput::debit("1100", Decimal::MAX, eur()).at_rate(dec!(2)),
            LineInput::credit("4000", Decimal::MAX, eur()).at_rate(dec!(2)),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::AmountOutOfRange { line: 1 }
        );
    }

    #[test]
    fn test_amounts_must_fit_storage() {
        let chart = Chart::new();

        let req = request(vec![
            LineInput::debit("1100", dec!(1000000000000000000.00), usd()),
            LineInput::credit("4000", dec!(1000000000000000000.00), usd()),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::AmountOutOfRange { line: 1 }
        );

        // In range in EUR, out of range once converted.
        let req = request(vec![
            LineInput::debit("1100", dec!(900000000000000000.00), eur()).at_rate(dec!(2)),
            LineInput::credit("4000", dec!(900000000000000000.00), eur()).at_rate(dec!(2)),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::AmountOutOfRange { line: 1 }
        );
    }

    #[test]
    fn test_rate_beyond_stored_precision_is_rejected() {
        let chart = Chart::new();
        let req = request(vec![
            LineInput::debit("1100", dec!(1000000.00), eur()).at_rate(dec!(1.2345678901235)),
            LineInput::credit("4000", dec!(1234567.89), usd()),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::InvalidExchangeRate { line: 1 }
        );

        let req = request(vec![
            LineInput::debit("1100", dec!(1000000.00), eur()).at_rate(dec!(1.234567890124)),
            LineInput::credit("4000", dec!(1234567.89), usd()),
        ]);
        let (lines, _) = EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap();
        assert_eq!(lines[0].exchange_rate, dec!(1.234567890124));
        assert_eq!(lines[0].base_debit, dec!(1234567.89));
    }

    #[test]
    fn test_reference_and_source_lengths() {
        let chart = Chart::new();
        let lines = vec![
            LineInput::debit("1100", dec!(10), usd()),
            LineInput::credit("4000", dec!(10), usd()),
        ];

        let mut req = request(lines.clone());
        req.reference = Some("R".repeat(MAX_REFERENCE_LEN + 1));
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::FieldTooLong { field: "reference", max: 100 }
        );

        let mut req = request(lines.clone());
        req.source = Some(SourceRef::new("S".repeat(MAX_SOURCE_TYPE_LEN + 1), "17"));
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::FieldTooLong { field: "source type", max: 50 }
        );

        let mut req = request(lines);
        req.reference = Some("R".repeat(MAX_REFERENCE_LEN));
        req.source = Some(SourceRef::new("INVOICE", "7".repeat(MAX_SOURCE_ID_LEN)));
        assert!(EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).is_ok());
    }

    #[test]
    fn test_balanced_at_zero_is_rejected() {
        let chart = Chart::new();
        // 0.01 EUR at 0.001 rounds to a zero base amount on both sides.
        let req = request(vec![
            LineInput::debit("1100", dec!(0.01), eur()).at_rate(dec!(0.001)),
            LineInput::credit("4000", dec!(0.01), eur()).at_rate(dec!(0.001)),
        ]);
        assert_eq!(
            EntryValidator::validate_and_resolve(&req, &usd(), chart.lookup()).unwrap_err(),
            LedgerError::ZeroValueEntry
        );
    }
}
