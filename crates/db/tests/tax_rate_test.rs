//! Integration tests for effective-dated tax rates.

mod common;

use common::{date, ledger, unique_jurisdiction, usd_tenant};
use rust_decimal_macros::dec;
use tally_core::LedgerError;
use tally_core::tax::NewTaxRate;

fn rate(jurisdiction: &str, rate: rust_decimal::Decimal, from: chrono::NaiveDate) -> NewTaxRate {
    NewTaxRate {
        jurisdiction: jurisdiction.to_string(),
        category: "Standard".to_string(),
        rate,
        valid_from: from,
        valid_to: None,
        account_id: None,
    }
}

#[tokio::test]
async fn test_tenant_override_takes_precedence_over_global() {
    let Some(core) = ledger().await else { return };
    let alpha = usd_tenant(&core).await;
    let beta = usd_tenant(&core).await;
    let jurisdiction = unique_jurisdiction();

    core.create_global_tax_rate(rate(&jurisdiction, dec!(0.20), date(2024, 1, 1)))
        .await
        .unwrap();

    // Warm the cache before the override lands
    let before = core
        .effective_rate(alpha.id, &jurisdiction, "standard", date(2024, 7, 1))
        .await
        .unwrap();
    assert_eq!(before.rate, dec!(0.20));

    let tax_payable = core.resolve_account(alpha.id, "2100").await.unwrap();
    let mut override_rate = rate(&jurisdiction, dec!(0.10), date(2024, 6, 1));
    override_rate.account_id = Some(tax_payable.id);
    let created = core.create_tax_rate(alpha.id, override_rate).await.unwrap();
    assert_eq!(created.tenant_id, Some(alpha.id));
    assert_eq!(created.category, "standard");

    let cases = [
        (alpha.id, date(2024, 3, 1), dec!(0.20)),
        (alpha.id, date(2024, 7, 1), dec!(0.10)),
        (beta.id, date(2024, 7, 1), dec!(0.20)),
    ];
    for (tenant, on, expected) in cases {
        let resolved = core
            .effective_rate(tenant, &jurisdiction.to_lowercase(), "STANDARD", on)
            .await
            .unwrap();
        assert_eq!(resolved.rate, expected, "tenant {tenant} on {on}");
    }
}

#[tokio::test]
async fn test_resolution_is_deterministic_over_repeated_calls() {
    let Some(core) = ledger().await else { return };
    let tenant = usd_tenant(&core).await;
    let jurisdiction = unique_jurisdiction();
    core.create_global_tax_rate(rate(&jurisdiction, dec!(0.075), date(2023, 1, 1)))
        .await
        .unwrap();

    let first = core
        .effective_rate(tenant.id, &jurisdiction, "standard", date(2024, 1, 1))
        .await
        .unwrap();
    for _ in 0..5 {
        let again = core
            .effective_rate(tenant.id, &jurisdiction, "standard", date(2024, 1, 1))
            .await
            .unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_gaps_and_overlaps() {
    let Some(core) = ledger().await else { return };
    let tenant = usd_tenant(&core).await;
    let jurisdiction = unique_jurisdiction();

    let first = core
        .create_global_tax_rate(rate(&jurisdiction, dec!(0.05), date(2024, 1, 1)))
        .await
        .unwrap();

    let err = core
        .create_global_tax_rate(rate(&jurisdiction, dec!(0.06), date(2024, 6, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::OverlappingTaxRate { .. }), "{err:?}");

    core.close_global_tax_rate(first.id, date(2024, 6, 1))
        .await
        .unwrap();
    assert_eq!(
        core.close_global_tax_rate(first.id, date(2024, 7, 1)).await,
        Err(LedgerError::TaxRateClosed(first.id))
    );

    // The closing date itself is no longer covered
    let err = core
        .effective_rate(tenant.id, &jurisdiction, "standard", date(2024, 6, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoRateDefined { .. }), "{err:?}");

    core.create_global_tax_rate(rate(&jurisdiction, dec!(0.06), date(2024, 6, 1)))
        .await
        .unwrap();
    let resolved = core
        .effective_rate(tenant.id, &jurisdiction, "standard", date(2024, 6, 1))
        .await
        .unwrap();
    assert_eq!(resolved.rate, dec!(0.06));

    let err = core
        .effective_rate(tenant.id, &jurisdiction, "standard", date(2023, 12, 31))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoRateDefined { .. }), "{err:?}");
}

#[tokio::test]
async fn test_global_rate_cannot_carry_an_account() {
    let Some(core) = ledger().await else { return };
    let tenant = usd_tenant(&core).await;
    let tax_payable = core.resolve_account(tenant.id, "2100").await.unwrap();

    let mut global = rate(&unique_jurisdiction(), dec!(0.1), date(2024, 1, 1));
    global.account_id = Some(tax_payable.id);
    let err = core.create_global_tax_rate(global).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAccount { .. }), "{err:?}");
}

#[tokio::test]
async fn test_created_rate_is_the_rate_later_resolved() {
    let Some(core) = ledger().await else { return };
    let tenant = usd_tenant(&core).await;
    let jurisdiction = unique_jurisdiction();

    let err = core
        .create_tax_rate(tenant.id, rate(&jurisdiction, dec!(0.0725000000001), date(2024, 1, 1)))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidTaxRate(dec!(0.0725000000001)));

    let created = core
        .create_tax_rate(tenant.id, rate(&jurisdiction, dec!(0.072500000001), date(2024, 1, 1)))
        .await
        .unwrap();
    let resolved = core
        .effective_rate(tenant.id, &jurisdiction, "standard", date(2024, 2, 1))
        .await
        .unwrap();
    assert_eq!(resolved.rate, created.rate);
}
