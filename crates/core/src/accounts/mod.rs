//! Chart of accounts.
//!
//! The account type taxonomy is closed and fixed per account: changing a
//! type would retroactively flip the sign of every historical balance.

pub mod rules;
pub mod standard;
pub mod types;

pub use rules::{
    MAX_CODE_LEN, MAX_NAME_LEN, check_can_deactivate, check_can_delete, check_no_cycle,
    check_parent, normalize_code, validate_name,
};
pub use standard::{StandardAccount, standard_chart};
pub use types::{Account, AccountRef, AccountType, NewAccount, NormalBalance};
