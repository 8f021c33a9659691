//! Chart of accounts business rules.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tally_shared::config::DeactivationPolicy;
use tally_shared::types::{AccountId, TenantId};

use super::types::Account;
use crate::error::{LedgerError, check_length};

/// Maximum length of an account code.
pub const MAX_CODE_LEN: usize = 20;

/// Maximum length of an account name.
pub const MAX_NAME_LEN: usize = 255;

/// Trims and validates an account code.
///
/// Codes are 1-20 characters of ASCII letters, digits, `.`, `-` or `_`.
pub fn normalize_code(code: &str) -> Result<String, LedgerError> {
    let trimmed = code.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_CODE_LEN
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'));

    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(LedgerError::InvalidAccountCode(code.to_string()))
    }
}

/// Trims a display name and rejects blank or overlong ones.
pub fn validate_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidAccountName(name.to_string()));
    }
    check_length("account name", trimmed, MAX_NAME_LEN)?;
    Ok(trimmed.to_string())
}

/// Checks that `parent` may hold children of `tenant_id`.
pub fn check_parent(tenant_id: TenantId, parent: &Account) -> Result<(), LedgerError> {
    if parent.tenant_id != tenant_id {
        return Err(LedgerError::InvalidParent(format!(
            "account {} belongs to another tenant",
            parent.code
        )));
    }
    Ok(())
}

/// Checks that making `new_parent` the parent of `account` keeps the tree acyclic.
///
/// `parent_of` returns the current parent of any account in the tenant.
pub fn check_no_cycle<F>(
    account: AccountId,
    new_parent: Option<AccountId>,
    parent_of: F,
) -> Result<(), LedgerError>
where
    F: Fn(AccountId) -> Option<AccountId>,
{
    let mut seen = HashSet::new();
    let mut cursor = new_parent;

    while let Some(current) = cursor {
        if current == account {
            return Err(LedgerError::InvalidParent(format!(
                "moving account {account} under {current} would create a cycle"
            )));
        }
        if !seen.insert(current) {
            return Err(LedgerError::integrity(format!(
                "account hierarchy already contains a cycle through {current}"
            )));
        }
        cursor = parent_of(current);
    }

    Ok(())
}

/// Checks whether `account` may be deactivated given its posted balance.
pub fn check_can_deactivate(
    account: &Account,
    balance: Decimal,
    policy: DeactivationPolicy,
) -> Result<(), LedgerError> {
    if account.is_system {
        return Err(LedgerError::SystemAccountProtected(account.id));
    }
    if policy == DeactivationPolicy::RequireZeroBalance && !balance.is_zero() {
        return Err(LedgerError::AccountHasBalance {
            account: account.id,
            balance,
        });
    }
    Ok(())
}

/// Checks whether `account` may be deleted.
///
/// Accounts are deleted only while no journal line references them.
pub fn check_can_delete(account: &Account, line_count: u64) -> Result<(), LedgerError> {
    if account.is_system {
        return Err(LedgerError::SystemAccountProtected(account.id));
    }
    if line_count > 0 {
        return Err(LedgerError::AccountInUse(account.id));
    }
    Ok(())
}
