//! Mapping of storage failures onto the ledger error taxonomy.

use sea_orm::DbErr;
use tally_core::LedgerError;

/// Unique constraint on `(tenant_id, code)` in `accounts`.
pub(crate) const ACCOUNT_CODE_CONSTRAINT: &str = "uq_accounts_tenant_code";

/// Unique constraint on `(tenant_id, entry_sequence)` in `journal_entries`.
pub(crate) const ENTRY_SEQUENCE_CONSTRAINT: &str = "uq_journal_entries_sequence";

/// Exclusion constraint that keeps tax rate intervals of one scope disjoint.
pub(crate) const TAX_RATE_OVERLAP_CONSTRAINT: &str = "ex_tax_rates_overlap";

/// Raised by the deferred balance trigger when a committed entry does not balance.
const UNBALANCED_AT_COMMIT: &str = "does not balance";

/// Maps a storage error to a ledger error.
///
/// Races that the database caught for us become `ConcurrentModification`.
/// A balance trigger firing means the core let an unbalanced entry through,
/// which is an integrity alarm. Everything else is a transient storage error.
pub(crate) fn storage(err: DbErr) -> LedgerError {
    if violates(&err, ENTRY_SEQUENCE_CONSTRAINT) || violates(&err, TAX_RATE_OVERLAP_CONSTRAINT) {
        return LedgerError::ConcurrentModification;
    }
    if violates(&err, UNBALANCED_AT_COMMIT) {
        return LedgerError::integrity(format!("storage rejected an unbalanced entry: {err}"));
    }
    LedgerError::Storage(err.to_string())
}

/// Returns true if `err` was raised by the named constraint or trigger.
pub(crate) fn violates(err: &DbErr, constraint: &str) -> bool {
    err.to_string().contains(constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ErrorClass;

    #[test]
    fn test_sequence_race_is_concurrent_modification() {
        let err = DbErr::Custom(format!(
            "duplicate key value violates unique constraint \"{ENTRY_SEQUENCE_CONSTRAINT}\""
        ));
        assert_eq!(storage(err), LedgerError::ConcurrentModification);
    }

    #[test]
    fn test_overlap_race_is_concurrent_modification() {
        let err = DbErr::Custom(format!(
            "conflicting key value violates exclusion constraint \"{TAX_RATE_OVERLAP_CONSTRAINT}\""
        ));
        assert_eq!(storage(err), LedgerError::ConcurrentModification);
    }

    #[test]
    fn test_balance_trigger_is_integrity_alarm() {
        let err = DbErr::Custom("journal entry 42 does not balance: debits 10, credits 9".into());
        assert_eq!(storage(err).class(), ErrorClass::Integrity);
    }

    #[test]
    fn test_other_failures_are_transient() {
        let err = storage(DbErr::Custom("connection reset by peer".into()));
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_violates_matches_constraint_name() {
        let err = DbErr::Custom(format!("violates \"{ACCOUNT_CODE_CONSTRAINT}\""));
        assert!(violates(&err, ACCOUNT_CODE_CONSTRAINT));
        assert!(!violates(&err, ENTRY_SEQUENCE_CONSTRAINT));
    }
}
