//! Tax rate records and effective-rate resolution.
//!
//! Rates are valid over half-open intervals `[valid_from, valid_to)`. A
//! tenant override beats the global default when both cover a date. The
//! resolved number is frozen into journal lines at computation time, so later
//! rate changes never alter posted amounts.

pub mod resolver;
pub mod types;

#[cfg(test)]
mod resolver_props;

pub use resolver::{check_can_close, check_no_overlap, effective_rate};
pub use types::{
    MAX_CATEGORY_LEN, MAX_JURISDICTION_LEN, NewTaxRate, TaxRate, normalize_category,
    normalize_jurisdiction,
};
