//! Per-tenant reference data caching using Moka.
//!
//! Accounts and tax rate candidates are read often but change rarely. Keys
//! always carry the tenant, so one tenant can never observe another tenant's
//! cached records.
//!
//! Writers invalidate after commit, and every invalidation advances a
//! generation counter. Readers take [`ReferenceCache::generation`] before
//! their query and hand it back when filling; a fill that raced an
//! invalidation is dropped instead of resurrecting the old row.
//!
//! Invalidation is local to this process. Other processes see a change once
//! their entries expire after `ttl_secs`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use tally_core::accounts::Account;
use tally_core::tax::TaxRate;
use tally_shared::config::CacheConfig;
use tally_shared::types::{AccountId, TenantId};

/// Cache key of one tax scope as seen by a tenant.
type TaxScopeKey = (TenantId, String, String);

/// Cache of accounts and tax rate candidates.
#[derive(Clone)]
pub struct ReferenceCache {
    accounts: Cache<(TenantId, AccountId), Arc<Account>>,
    account_codes: Cache<(TenantId, String), AccountId>,
    tax_rates: Cache<TaxScopeKey, Arc<Vec<TaxRate>>>,
    generation: Arc<AtomicU64>,
}

impl ReferenceCache {
    /// Creates a cache sized and aged by `config`.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.ttl_secs);
        Self {
            accounts: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(ttl)
                .build(),
            account_codes: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(ttl)
                .build(),
            tax_rates: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current invalidation generation. Read it before querying storage.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn advance(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Cached account, if present.
    pub async fn account(&self, tenant_id: TenantId, id: AccountId) -> Option<Arc<Account>> {
        self.accounts.get(&(tenant_id, id)).await
    }

    /// Cached id of the account with `code`, if present.
    pub async fn account_id_by_code(&self, tenant_id: TenantId, code: &str) -> Option<AccountId> {
        self.account_codes.get(&(tenant_id, code.to_string())).await
    }

    /// Caches `account`, read at generation `observed`, under its own tenant.
    pub async fn put_account(&self, observed: u64, account: Account) {
        let key = (account.tenant_id, account.id);
        let code_key = (account.tenant_id, account.code.clone());
        self.account_codes.insert(code_key.clone(), account.id).await;
        self.accounts.insert(key, Arc::new(account)).await;

        if self.generation() != observed {
            self.accounts.invalidate(&key).await;
            self.account_codes.invalidate(&code_key).await;
        }
    }

    /// Drops one account and its code mapping.
    pub async fn invalidate_account(&self, tenant_id: TenantId, id: AccountId) {
        self.advance();
        if let Some(account) = self.accounts.remove(&(tenant_id, id)).await {
            self.account_codes
                .invalidate(&(tenant_id, account.code.clone()))
                .await;
        }
    }

    /// Cached candidate rates for (jurisdiction, category), tenant overrides included.
    pub async fn tax_candidates(
        &self,
        tenant_id: TenantId,
        jurisdiction: &str,
        category: &str,
    ) -> Option<Arc<Vec<TaxRate>>> {
        self.tax_rates
            .get(&(tenant_id, jurisdiction.to_string(), category.to_string()))
            .await
    }

    /// Caches the candidate rates for (jurisdiction, category), read at generation `observed`.
    pub async fn put_tax_candidates(
        &self,
        observed: u64,
        tenant_id: TenantId,
        jurisdiction: &str,
        category: &str,
        rates: Vec<TaxRate>,
    ) -> Arc<Vec<TaxRate>> {
        let rates = Arc::new(rates);
        let key = (tenant_id, jurisdiction.to_string(), category.to_string());
        self.tax_rates.insert(key.clone(), Arc::clone(&rates)).await;

        if self.generation() != observed {
            self.tax_rates.invalidate(&key).await;
        }
        rates
    }

    /// Drops one tenant's view of a tax scope.
    pub async fn invalidate_tax_scope(&self, tenant_id: TenantId, jurisdiction: &str, category: &str) {
        self.advance();
        self.tax_rates
            .invalidate(&(tenant_id, jurisdiction.to_string(), category.to_string()))
            .await;
    }

    /// Drops every cached tax scope. Global rate writes affect all tenants.
    pub fn invalidate_all_tax_rates(&self) {
        self.advance();
        self.tax_rates.invalidate_all();
    }

    /// Number of cached records across all caches.
    ///
    /// Counts are eventually consistent; call `run_pending_tasks` first for an
    /// exact figure.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.accounts.entry_count() + self.account_codes.entry_count() + self.tax_rates.entry_count()
    }

    /// Runs pending maintenance so counts and invalidations settle.
    pub async fn run_pending_tasks(&self) {
        self.accounts.run_pending_tasks().await;
        self.account_codes.run_pending_tasks().await;
        self.tax_rates.run_pending_tasks().await;
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ReferenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCache")
            .field("entries", &self.entry_count())
            .finish()
    }
}
