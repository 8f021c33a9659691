//! Financial report generation.
//!
//! Pure aggregation over summed account activity:
//! - Trial Balance
//! - Balance Sheet
//! - Income Statement

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::{ReportService, check_period};
pub use types::*;
