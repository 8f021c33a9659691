//! `SeaORM` entities for the ledger schema.
//!
//! Crate-private: repositories are the only code that touches tables.

pub mod accounts;
pub mod entry_sequences;
pub mod journal_entries;
pub mod journal_lines;
pub mod sea_orm_active_enums;
pub mod tax_rates;
pub mod tenants;
