//! Core ledger logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here; the `tally-db`
//! crate persists what this crate decides.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts taxonomy and hierarchy rules
//! - `tax` - Tax rate records and effective-rate resolution
//! - `ledger` - Journal entry validation, state machine, numbering and reversal
//! - `reports` - Trial balance and statement aggregation
//! - `error` - The error taxonomy shared by every module

pub mod accounts;
pub mod error;
pub mod ledger;
pub mod reports;
pub mod tax;

pub use error::{ErrorClass, LedgerError, check_length};
