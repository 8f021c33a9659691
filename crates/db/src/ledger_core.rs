//! The ledger's programmatic boundary.
//!
//! [`LedgerCore`] is what collaborator modules call. Each operation opens a
//! [`TenantScope`], runs every read and write on its transaction, and commits
//! only when all of them succeeded. Dropping the scope on an error or on a
//! deadline rolls the transaction back.
//!
//! The deadline covers the work, not the commit of a tenant-scoped write: a
//! write that returns `Timeout` never committed, and a commit that starts in
//! time runs to completion.

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use tally_core::accounts::{Account, AccountRef, NewAccount};
use tally_core::ledger::{AccountBalance, EntryNumber, EntryRequest, EntryValidator, JournalEntry};
use tally_core::reports::{
    BalanceSheet, IncomeStatement, ReportService, TrialBalance, check_period,
};
use tally_core::tax::{NewTaxRate, TaxRate, effective_rate};
use tally_core::{ErrorClass, LedgerError};
use tally_shared::AppConfig;
use tally_shared::config::{CacheConfig, LedgerConfig};
use tally_shared::types::{AccountId, ActorId, JournalEntryId, TaxRateId, TenantId};
use tracing::Instrument;

use crate::cache::ReferenceCache;
use crate::repositories::{AccountRepository, JournalRepository, ReportRepository, TaxRateRepository};
use crate::tenant::{NewTenant, Tenant, TenantScope, register_tenant};

/// Log target for integrity alarms.
pub const INTEGRITY_TARGET: &str = "tally::integrity";

/// Entry point to the general ledger.
#[derive(Clone)]
pub struct LedgerCore {
    db: DatabaseConnection,
    config: LedgerConfig,
    cache: ReferenceCache,
    accounts: AccountRepository,
    tax_rates: TaxRateRepository,
    journal: JournalRepository,
    reports: ReportRepository,
    deadline: Duration,
}

impl LedgerCore {
    /// Creates a ledger over `db` using the loaded application config.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self::with_config(db, config.ledger.clone(), &config.cache)
    }

    /// Creates a ledger from explicit ledger and cache settings.
    #[must_use]
    pub fn with_config(db: DatabaseConnection, ledger: LedgerConfig, cache: &CacheConfig) -> Self {
        let cache = ReferenceCache::new(cache);
        Self {
            db,
            deadline: Duration::from_millis(ledger.operation_timeout_ms),
            accounts: AccountRepository::new(cache.clone()),
            tax_rates: TaxRateRepository::new(cache.clone()),
            journal: JournalRepository::new(ledger.entry_number_width),
            reports: ReportRepository::new(),
            cache,
            config: ledger,
        }
    }

    /// Returns a handle whose operations use `deadline` instead of the configured one.
    ///
    /// Tenant-scoped writes commit after the deadline check, so a `Timeout`
    /// from one of them is safe to retry. Tenant registration and global rate
    /// writes commit inside their own transaction and stay fully bounded; a
    /// `Timeout` there may follow a commit that landed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The shared reference cache.
    #[must_use]
    pub const fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // ------------------------------------------------------------------
    // Tenants
    // ------------------------------------------------------------------

    /// Registers a tenant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTenant` or `InvalidCurrency` for malformed input.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn register_tenant(&self, input: NewTenant) -> Result<Tenant, LedgerError> {
        self.bounded(register_tenant(&self.db, input, &self.config.default_entry_prefix))
            .await
    }

    /// Loads a tenant, failing if it is unknown or inactive.
    ///
    /// # Errors
    ///
    /// Returns `TenantNotFound` if the tenant does not resolve.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn tenant(&self, tenant: TenantId) -> Result<Tenant, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let found = scope.tenant().clone();
            scope.commit().await?;
            Ok::<_, LedgerError>(found)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Chart of accounts
    // ------------------------------------------------------------------

    /// Creates any missing standard system accounts for the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not resolve or storage fails.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn bootstrap_chart(&self, tenant: TenantId) -> Result<Vec<Account>, LedgerError> {
        let created = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let created = self.accounts.bootstrap_chart(&scope).await?;
                Ok::<_, LedgerError>((scope, created))
            })
            .await?;
        tracing::info!(created = created.len(), "Bootstrapped chart of accounts");
        Ok(created)
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateCode`, `InvalidParent` or a malformed-input error.
    #[tracing::instrument(skip(self, input), fields(tenant = %tenant, code = %input.code))]
    pub async fn create_account(&self, tenant: TenantId, input: NewAccount) -> Result<Account, LedgerError> {
        self.bounded_write(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let account = self.accounts.create(&scope, input).await?;
            Ok::<_, LedgerError>((scope, account))
        })
        .await
    }

    /// Gets an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn get_account(&self, tenant: TenantId, id: AccountId) -> Result<Account, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let account = self.accounts.get(&scope, id).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(account)
        })
        .await
    }

    /// Resolves an account by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` if the tenant has no such code.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn resolve_account(&self, tenant: TenantId, code: &str) -> Result<Account, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let account = self.accounts.get_by_code(&scope, code).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(account)
        })
        .await
    }

    /// Lists the tenant's accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not resolve or storage fails.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn list_accounts(&self, tenant: TenantId) -> Result<Vec<Account>, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let accounts = self.accounts.list(&scope).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(accounts)
        })
        .await
    }

    /// Renames an account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountName` or `AccountNotFound`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn rename_account(
        &self,
        tenant: TenantId,
        id: AccountId,
        name: &str,
    ) -> Result<Account, LedgerError> {
        let result = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let account = self.accounts.rename(&scope, id, name).await?;
                Ok::<_, LedgerError>((scope, account))
            })
            .await;
        self.cache.invalidate_account(tenant, id).await;
        result
    }

    /// Moves an account under a new parent, or to the root.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParent` if the parent is unknown or the move would create a cycle.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn move_account(
        &self,
        tenant: TenantId,
        id: AccountId,
        new_parent: Option<AccountRef>,
    ) -> Result<Account, LedgerError> {
        let result = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let account = self.accounts.move_to(&scope, id, new_parent.as_ref()).await?;
                Ok::<_, LedgerError>((scope, account))
            })
            .await;
        self.cache.invalidate_account(tenant, id).await;
        result
    }

    /// Deactivates an account under the configured policy.
    ///
    /// # Errors
    ///
    /// Returns `SystemAccountProtected` or `AccountHasBalance`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn deactivate_account(&self, tenant: TenantId, id: AccountId) -> Result<Account, LedgerError> {
        let policy = self.config.deactivation_policy;
        let result = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let account = self.accounts.deactivate(&scope, id, policy).await?;
                Ok::<_, LedgerError>((scope, account))
            })
            .await;
        self.cache.invalidate_account(tenant, id).await;
        if let Ok(account) = &result {
            tracing::info!(account = %account.code, "Deactivated account");
        }
        result
    }

    /// Deletes an account nothing references.
    ///
    /// # Errors
    ///
    /// Returns `SystemAccountProtected` or `AccountInUse`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn delete_account(&self, tenant: TenantId, id: AccountId) -> Result<(), LedgerError> {
        let result = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                self.accounts.delete(&scope, id).await?;
                Ok::<_, LedgerError>((scope, ()))
            })
            .await;
        self.cache.invalidate_account(tenant, id).await;
        result
    }

    // ------------------------------------------------------------------
    // Tax rates
    // ------------------------------------------------------------------

    /// Creates a tenant override rate.
    ///
    /// # Errors
    ///
    /// Returns `OverlappingTaxRate`, `InvalidTaxRate` or `InvalidDateInterval`.
    #[tracing::instrument(skip(self, input), fields(tenant = %tenant, jurisdiction = %input.jurisdiction))]
    pub async fn create_tax_rate(&self, tenant: TenantId, input: NewTaxRate) -> Result<TaxRate, LedgerError> {
        let rate = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let rate = self.tax_rates.create(&scope, input).await?;
                Ok::<_, LedgerError>((scope, rate))
            })
            .await?;
        self.cache
            .invalidate_tax_scope(tenant, &rate.jurisdiction, &rate.category)
            .await;
        Ok(rate)
    }

    /// Creates a global default rate. Administrative; runs without a tenant scope.
    ///
    /// # Errors
    ///
    /// Returns `OverlappingTaxRate`, `InvalidTaxRate` or `InvalidDateInterval`.
    #[tracing::instrument(skip(self, input), fields(jurisdiction = %input.jurisdiction))]
    pub async fn create_global_tax_rate(&self, input: NewTaxRate) -> Result<TaxRate, LedgerError> {
        let rate = self
            .bounded(self.tax_rates.create_global(&self.db, input))
            .await?;
        self.cache.invalidate_all_tax_rates();
        Ok(rate)
    }

    /// Closes an open tenant override.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateNotFound`, `TaxRateClosed` or `InvalidDateInterval`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn close_tax_rate(
        &self,
        tenant: TenantId,
        id: TaxRateId,
        valid_to: NaiveDate,
    ) -> Result<TaxRate, LedgerError> {
        let rate = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let rate = self.tax_rates.close(&scope, id, valid_to).await?;
                Ok::<_, LedgerError>((scope, rate))
            })
            .await?;
        self.cache
            .invalidate_tax_scope(tenant, &rate.jurisdiction, &rate.category)
            .await;
        Ok(rate)
    }

    /// Closes an open global rate. Administrative; runs without a tenant scope.
    ///
    /// # Errors
    ///
    /// Returns `TaxRateNotFound`, `TaxRateClosed` or `InvalidDateInterval`.
    #[tracing::instrument(skip(self))]
    pub async fn close_global_tax_rate(
        &self,
        id: TaxRateId,
        valid_to: NaiveDate,
    ) -> Result<TaxRate, LedgerError> {
        let rate = self
            .bounded(self.tax_rates.close_global(&self.db, id, valid_to))
            .await?;
        self.cache.invalidate_all_tax_rates();
        Ok(rate)
    }

    /// Lists the rates visible to the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant does not resolve or storage fails.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn list_tax_rates(
        &self,
        tenant: TenantId,
        jurisdiction: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<TaxRate>, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let rates = self.tax_rates.list(&scope, jurisdiction, category).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(rates)
        })
        .await
    }

    /// Resolves the rate in force on `on`, preferring the tenant's override.
    ///
    /// # Errors
    ///
    /// - `NoRateDefined` if no interval covers the date
    /// - `IntegrityAlarm` if two rates of one scope cover it
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn effective_rate(
        &self,
        tenant: TenantId,
        jurisdiction: &str,
        category: &str,
        on: NaiveDate,
    ) -> Result<TaxRate, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let candidates = self.tax_rates.candidates(&scope, jurisdiction, category).await?;
            scope.commit().await?;
            let rate = effective_rate(&candidates, jurisdiction, category, tenant, on)?.clone();
            Ok::<_, LedgerError>(rate)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Journal entries
    // ------------------------------------------------------------------

    /// Validates a posting request and stores it as a draft.
    ///
    /// Nothing is written unless every line validates and the entry balances.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, such as `UnbalancedEntry`,
    /// `EmptyEntry` or `InvalidAccount`.
    #[tracing::instrument(skip(self, request), fields(tenant = %tenant, lines = request.lines.len()))]
    pub async fn create_draft(
        &self,
        tenant: TenantId,
        request: EntryRequest,
    ) -> Result<JournalEntry, LedgerError> {
        self.bounded_write(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let accounts = self
                .accounts
                .lookup_for_entry(&scope, request.lines.iter().map(|line| &line.account))
                .await?;

            let (lines, totals) = EntryValidator::validate_and_resolve(
                &request,
                &scope.tenant().base_currency,
                |account| accounts.get(account).cloned(),
            )?;

            let entry = JournalEntry::draft(tenant, &request, lines, Utc::now());
            self.journal.insert_draft(&scope, &entry).await?;

            tracing::debug!(entry_id = %entry.id, total = %totals.base_debit, "Created draft");
            Ok::<_, LedgerError>((scope, entry))
        })
        .await
    }

    /// Posts a draft and returns its entry number.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyPosted` or `AlreadyVoided`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant, entry = %id))]
    pub async fn post(
        &self,
        tenant: TenantId,
        id: JournalEntryId,
        actor: ActorId,
    ) -> Result<EntryNumber, LedgerError> {
        let number = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let entry = self.journal.post(&scope, id, actor, Utc::now()).await?;
                let number = entry.number.ok_or_else(|| {
                    LedgerError::integrity(format!("posted entry {id} has no entry number"))
                })?;
                Ok::<_, LedgerError>((scope, number))
            })
            .await?;
        tracing::info!(number = %number, "Posted journal entry");
        Ok(number)
    }

    /// Voids a posted entry and returns the ID of its posted reversal.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `NotPosted` or `VoidReasonRequired`.
    #[tracing::instrument(skip(self, reason), fields(tenant = %tenant, entry = %id))]
    pub async fn void(
        &self,
        tenant: TenantId,
        id: JournalEntryId,
        actor: ActorId,
        reason: &str,
    ) -> Result<JournalEntryId, LedgerError> {
        let outcome = self
            .bounded_write(async {
                let scope = TenantScope::begin(&self.db, tenant).await?;
                let outcome = self.journal.void(&scope, id, actor, reason, Utc::now()).await?;
                Ok::<_, LedgerError>((scope, outcome))
            })
            .await?;
        tracing::info!(
            reversal = %outcome.reversal.id,
            number = ?outcome.reversal.number.as_ref().map(ToString::to_string),
            "Voided journal entry"
        );
        Ok(outcome.reversal.id)
    }

    /// Gets an entry with its ordered lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the tenant has no such entry.
    #[tracing::instrument(skip(self), fields(tenant = %tenant, entry = %id))]
    pub async fn get_entry(&self, tenant: TenantId, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let entry = self.journal.get(&scope, id).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(entry)
        })
        .await
    }

    /// Deletes a draft.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or `NotDraft`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant, entry = %id))]
    pub async fn discard_draft(&self, tenant: TenantId, id: JournalEntryId) -> Result<(), LedgerError> {
        self.bounded_write(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            self.journal.discard(&scope, id).await?;
            Ok::<_, LedgerError>((scope, ()))
        })
        .await
    }

    /// Recomputes a posted entry's digest and compares it with the recorded one.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityAlarm` if the entry was altered after posting.
    #[tracing::instrument(skip(self), fields(tenant = %tenant, entry = %id))]
    pub async fn verify_entry(&self, tenant: TenantId, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let entry = self.journal.get(&scope, id).await?;
            scope.commit().await?;
            entry.verify_integrity()?;
            Ok::<_, LedgerError>(entry)
        })
        .await
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// Posted balance of an account as of a date, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn account_balance(
        &self,
        tenant: TenantId,
        account: AccountId,
        as_of: NaiveDate,
    ) -> Result<AccountBalance, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let account = self.accounts.get(&scope, account).await?;
            let balance = self.reports.account_balance(&scope, &account, as_of).await?;
            scope.commit().await?;
            Ok::<_, LedgerError>(balance)
        })
        .await
    }

    /// Trial balance as of a date.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityAlarm` if debits and credits differ.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn trial_balance(&self, tenant: TenantId, as_of: NaiveDate) -> Result<TrialBalance, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let activity = self.reports.activity_as_of(&scope, as_of).await?;
            let currency = scope.tenant().base_currency.clone();
            scope.commit().await?;

            let report = ReportService::trial_balance(as_of, currency, activity);
            ReportService::ensure_balanced(&report)?;
            Ok::<_, LedgerError>(report)
        })
        .await
    }

    /// Balance sheet as of a date.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityAlarm` if assets differ from liabilities plus equity.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn balance_sheet(&self, tenant: TenantId, as_of: NaiveDate) -> Result<BalanceSheet, LedgerError> {
        self.bounded(async {
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let activity = self.reports.activity_as_of(&scope, as_of).await?;
            let currency = scope.tenant().base_currency.clone();
            scope.commit().await?;

            let sheet = ReportService::balance_sheet(as_of, currency, activity);
            if !sheet.is_balanced {
                return Err(LedgerError::integrity(format!(
                    "balance sheet as of {as_of} does not balance: assets {}, liabilities and equity {}",
                    sheet.assets.total, sheet.liabilities_and_equity
                )));
            }
            Ok(sheet)
        })
        .await
    }

    /// Income statement over entries dated in `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateInterval` if `from` is after `to`.
    #[tracing::instrument(skip(self), fields(tenant = %tenant))]
    pub async fn income_statement(
        &self,
        tenant: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<IncomeStatement, LedgerError> {
        self.bounded(async {
            check_period(from, to)?;
            let scope = TenantScope::begin(&self.db, tenant).await?;
            let activity = self.reports.activity_between(&scope, from, to).await?;
            let currency = scope.tenant().base_currency.clone();
            scope.commit().await?;

            ReportService::income_statement(from, to, currency, activity)
        })
        .await
    }

    /// Runs `operation` under the deadline and logs its failure by class.
    ///
    /// The deadline covers everything `operation` does, including any commit
    /// inside it.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        let result = self.timed(operation).await;
        if let Err(err) = &result {
            report_failure(err);
        }
        result
    }

    /// Runs `work` under the deadline and commits the scope it hands back.
    async fn bounded_write<T, F>(&self, work: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<(TenantScope, T), LedgerError>>,
    {
        self.bounded_then(work, |(scope, value)| async move {
            scope.commit().await?;
            Ok::<_, LedgerError>(value)
        })
        .await
    }

    /// Runs `work` under the deadline, then `finish` on its output without one.
    async fn bounded_then<W, T, F, C, Fut>(&self, work: F, finish: C) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<W, LedgerError>>,
        C: FnOnce(W) -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let result = match self.timed(work).await {
            Ok(done) => finish(done).in_current_span().await,
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            report_failure(err);
        }
        result
    }

    async fn timed<T, F>(&self, operation: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        match tokio::time::timeout(self.deadline, operation.in_current_span()).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout {
                after_ms: u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl std::fmt::Debug for LedgerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerCore")
            .field("config", &self.config)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

fn report_failure(err: &LedgerError) {
    match err.class() {
        ErrorClass::Integrity => {
            tracing::error!(target: INTEGRITY_TARGET, code = err.error_code(), error = %err, "Integrity alarm");
        }
        ErrorClass::Transient => {
            tracing::warn!(code = err.error_code(), error = %err, "Ledger operation failed");
        }
        ErrorClass::Validation | ErrorClass::State | ErrorClass::NotFound => {
            tracing::debug!(code = err.error_code(), error = %err, "Ledger operation rejected");
        }
    }
}
