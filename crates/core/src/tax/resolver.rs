//! Effective-rate resolution and interval rules.

use chrono::NaiveDate;
use tally_shared::types::TenantId;

use super::types::{NewTaxRate, TaxRate, normalize_category, normalize_jurisdiction};
use crate::error::LedgerError;

/// Resolves the single rate covering `on` for (jurisdiction, category).
///
/// A rate scoped to `tenant_id` wins over the global default. `candidates`
/// may contain unrelated rates; they are ignored.
///
/// # Errors
///
/// - `NoRateDefined` if no interval covers the date
/// - `IntegrityAlarm` if two rates of the same scope cover it
pub fn effective_rate<'a>(
    candidates: &'a [TaxRate],
    jurisdiction: &str,
    category: &str,
    tenant_id: TenantId,
    on: NaiveDate,
) -> Result<&'a TaxRate, LedgerError> {
    let jurisdiction = normalize_jurisdiction(jurisdiction);
    let category = normalize_category(category);

    for scope in [Some(tenant_id), None] {
        let mut covering = candidates
            .iter()
            .filter(|r| r.in_scope(&jurisdiction, &category, scope) && r.covers(on));

        if let Some(found) = covering.next() {
            if let Some(other) = covering.next() {
                return Err(LedgerError::integrity(format!(
                    "tax rates {} and {} both cover {jurisdiction}/{category} on {on}",
                    found.id, other.id
                )));
            }
            return Ok(found);
        }
    }

    Err(LedgerError::NoRateDefined {
        jurisdiction,
        category,
        date: on,
    })
}

/// Checks that `new` does not overlap any rate of the same scope in `existing`.
///
/// `new` must already be normalized.
pub fn check_no_overlap(
    existing: &[TaxRate],
    tenant_id: Option<TenantId>,
    new: &NewTaxRate,
) -> Result<(), LedgerError> {
    let clash = existing.iter().find(|r| {
        r.in_scope(&new.jurisdiction, &new.category, tenant_id)
            && r.overlaps(new.valid_from, new.valid_to)
    });

    match clash {
        Some(r) => Err(LedgerError::OverlappingTaxRate {
            jurisdiction: new.jurisdiction.clone(),
            category: new.category.clone(),
            existing: r.id,
        }),
        None => Ok(()),
    }
}

/// Checks that `rate` may be closed on `valid_to`.
///
/// Only open rates can be closed, and never on or before their first day.
pub fn check_can_close(rate: &TaxRate, valid_to: NaiveDate) -> Result<(), LedgerError> {
    if rate.valid_to.is_some() {
        return Err(LedgerError::TaxRateClosed(rate.id));
    }
    if valid_to <= rate.valid_from {
        return Err(LedgerError::InvalidDateInterval {
            from: rate.valid_from,
            to: valid_to,
        });
    }
    Ok(())
}
