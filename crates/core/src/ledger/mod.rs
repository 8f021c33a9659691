//! Double-entry journal logic.
//!
//! This module implements the journal engine's pure half:
//! - Request and line types
//! - Draft validation and base-currency resolution
//! - The entry aggregate, its state machine and content digest
//! - Entry numbering
//! - Balance calculations

pub mod balance;
pub mod entry;
pub mod numbering;
pub mod types;
pub mod validation;

#[cfg(test)]
mod entry_props;
#[cfg(test)]
mod validation_props;

pub use balance::AccountBalance;
pub use entry::JournalEntry;
pub use numbering::EntryNumber;
pub use types::{
    AccountInfo, Direction, EntryRequest, EntryStatus, EntryTotals, JournalLine, LineInput,
    SourceRef, VOID_SOURCE_TYPE,
};
pub use validation::{EntryValidator, MAX_REFERENCE_LEN, MAX_SOURCE_ID_LEN, MAX_SOURCE_TYPE_LEN};
