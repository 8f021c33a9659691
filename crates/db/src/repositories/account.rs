//! Chart of accounts persistence.
//!
//! Every query filters on the scope's tenant in addition to the RLS policy.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tally_core::LedgerError;
use tally_core::accounts::{
    Account, AccountRef, NewAccount, check_can_deactivate, check_can_delete, check_no_cycle,
    check_parent, normalize_code, standard_chart, validate_name,
};
use tally_core::ledger::AccountInfo;
use tally_shared::config::DeactivationPolicy;
use tally_shared::types::{AccountId, TenantId};
use uuid::Uuid;

use super::report::account_totals;
use crate::cache::ReferenceCache;
use crate::entities::{accounts, journal_lines, tax_rates};
use crate::error::{ACCOUNT_CODE_CONSTRAINT, storage, violates};
use crate::tenant::TenantScope;

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            tenant_id: TenantId::from_uuid(model.tenant_id),
            code: model.code,
            name: model.name,
            account_type: model.account_type.into(),
            parent_id: model.parent_id.map(AccountId::from_uuid),
            is_active: model.is_active,
            is_system: model.is_system,
        }
    }
}

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    cache: ReferenceCache,
}

impl AccountRepository {
    /// Creates a repository reading through `cache`.
    #[must_use]
    pub fn new(cache: ReferenceCache) -> Self {
        Self { cache }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccountCode` / `InvalidAccountName` for malformed input
    /// - `InvalidParent` if the parent does not exist in the tenant
    /// - `DuplicateCode` if the code is taken
    pub async fn create(&self, scope: &TenantScope, input: NewAccount) -> Result<Account, LedgerError> {
        let code = normalize_code(&input.code)?;
        let name = validate_name(&input.name)?;

        let parent_id = match &input.parent {
            Some(parent_ref) => {
                let parent = self.find_by_ref(scope, parent_ref).await?.ok_or_else(|| {
                    LedgerError::InvalidParent(format!(
                        "account {parent_ref} does not exist in this tenant"
                    ))
                })?;
                check_parent(scope.tenant_id(), &parent)?;
                Some(parent.id)
            }
            None => None,
        };

        if self.find_model_by_code(scope, &code).await?.is_some() {
            return Err(LedgerError::DuplicateCode(code));
        }

        let result = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            tenant_id: Set(scope.tenant_uuid()),
            code: Set(code.clone()),
            name: Set(name),
            account_type: Set(input.account_type.into()),
            parent_id: Set(parent_id.map(AccountId::into_inner)),
            is_active: Set(true),
            is_system: Set(input.is_system),
            ..Default::default()
        }
        .insert(scope.conn())
        .await;

        match result {
            Ok(model) => Ok(model.into()),
            Err(err) if violates(&err, ACCOUNT_CODE_CONSTRAINT) => {
                Err(LedgerError::DuplicateCode(code))
            }
            Err(err) => Err(storage(err)),
        }
    }

    /// Gets an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    pub async fn get(&self, scope: &TenantScope, id: AccountId) -> Result<Account, LedgerError> {
        self.find(scope, id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Resolves an account by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` if the tenant has no such code.
    pub async fn get_by_code(&self, scope: &TenantScope, code: &str) -> Result<Account, LedgerError> {
        self.find_by_code(scope, code)
            .await?
            .ok_or_else(|| LedgerError::AccountCodeNotFound(code.trim().to_string()))
    }

    /// Finds an account by id or code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_ref(
        &self,
        scope: &TenantScope,
        account: &AccountRef,
    ) -> Result<Option<Account>, LedgerError> {
        match account {
            AccountRef::Id(id) => self.find(scope, *id).await,
            AccountRef::Code(code) => self.find_by_code(scope, code).await,
        }
    }

    /// Lists the tenant's accounts ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, scope: &TenantScope) -> Result<Vec<Account>, LedgerError> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .order_by_asc(accounts::Column::Code)
            .all(scope.conn())
            .await
            .map_err(storage)?;

        Ok(models.into_iter().map(Account::from).collect())
    }

    /// Renames an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccountName` if the name is blank
    /// - `AccountNotFound` if the account does not exist
    pub async fn rename(
        &self,
        scope: &TenantScope,
        id: AccountId,
        name: &str,
    ) -> Result<Account, LedgerError> {
        let name = validate_name(name)?;
        let model = self.load_model(scope, id).await?;

        let mut active: accounts::ActiveModel = model.into();
        active.name = Set(name);
        let updated = active.update(scope.conn()).await.map_err(storage)?;
        Ok(updated.into())
    }

    /// Moves an account under `new_parent`, or to the root when `None`.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `InvalidParent` if the parent is unknown or the move would create a cycle
    pub async fn move_to(
        &self,
        scope: &TenantScope,
        id: AccountId,
        new_parent: Option<&AccountRef>,
    ) -> Result<Account, LedgerError> {
        let model = self.load_model(scope, id).await?;

        let parent_id = match new_parent {
            Some(parent_ref) => {
                let parent = self.find_by_ref(scope, parent_ref).await?.ok_or_else(|| {
                    LedgerError::InvalidParent(format!(
                        "account {parent_ref} does not exist in this tenant"
                    ))
                })?;
                check_parent(scope.tenant_id(), &parent)?;
                Some(parent.id)
            }
            None => None,
        };

        let parents = self.parent_map(scope).await?;
        check_no_cycle(id, parent_id, |account| {
            parents
                .get(&account.into_inner())
                .copied()
                .flatten()
                .map(AccountId::from_uuid)
        })?;

        let mut active: accounts::ActiveModel = model.into();
        active.parent_id = Set(parent_id.map(AccountId::into_inner));
        let updated = active.update(scope.conn()).await.map_err(storage)?;
        Ok(updated.into())
    }

    /// Deactivates an account under `policy`.
    ///
    /// Historical lines are untouched; the account only stops accepting new ones.
    ///
    /// # Errors
    ///
    /// - `SystemAccountProtected` for system accounts
    /// - `AccountHasBalance` if the policy requires a zero balance
    pub async fn deactivate(
        &self,
        scope: &TenantScope,
        id: AccountId,
        policy: DeactivationPolicy,
    ) -> Result<Account, LedgerError> {
        let model = self.load_model(scope, id).await?;
        let account = Account::from(model.clone());

        let (debit, credit) = account_totals(scope, id, None).await?;
        check_can_deactivate(&account, account.balance_of(debit, credit), policy)?;

        if !account.is_active {
            return Ok(account);
        }

        let mut active: accounts::ActiveModel = model.into();
        active.is_active = Set(false);
        let updated = active.update(scope.conn()).await.map_err(storage)?;
        Ok(updated.into())
    }

    /// Deletes an account that nothing references.
    ///
    /// # Errors
    ///
    /// - `SystemAccountProtected` for system accounts
    /// - `AccountInUse` if journal lines, child accounts or tax rates reference it
    pub async fn delete(&self, scope: &TenantScope, id: AccountId) -> Result<(), LedgerError> {
        let account = Account::from(self.load_model(scope, id).await?);
        let tenant = scope.tenant_uuid();

        let line_count = journal_lines::Entity::find()
            .filter(journal_lines::Column::TenantId.eq(tenant))
            .filter(journal_lines::Column::AccountId.eq(id.into_inner()))
            .count(scope.conn())
            .await
            .map_err(storage)?;
        check_can_delete(&account, line_count)?;

        let children = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant))
            .filter(accounts::Column::ParentId.eq(id.into_inner()))
            .count(scope.conn())
            .await
            .map_err(storage)?;
        let linked_rates = tax_rates::Entity::find()
            .filter(tax_rates::Column::TenantId.eq(tenant))
            .filter(tax_rates::Column::AccountId.eq(id.into_inner()))
            .count(scope.conn())
            .await
            .map_err(storage)?;
        if children > 0 || linked_rates > 0 {
            return Err(LedgerError::AccountInUse(id));
        }

        accounts::Entity::delete_many()
            .filter(accounts::Column::TenantId.eq(tenant))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(scope.conn())
            .await
            .map_err(storage)?;
        Ok(())
    }

    /// Creates any missing standard system accounts.
    ///
    /// Returns only the accounts created by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or insert fails.
    pub async fn bootstrap_chart(&self, scope: &TenantScope) -> Result<Vec<Account>, LedgerError> {
        let mut created = Vec::new();
        for standard in standard_chart() {
            if self.find_model_by_code(scope, standard.code).await?.is_some() {
                continue;
            }
            created.push(self.create(scope, standard.to_new_account()).await?);
        }
        Ok(created)
    }

    /// Resolves every distinct account reference of an entry request.
    ///
    /// Reads storage directly, never the cache, and holds a share lock on the
    /// rows until the scope ends, so an account cannot be deactivated between
    /// this check and the insert of lines against it. References unknown to
    /// the tenant are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn lookup_for_entry<'a, I>(
        &self,
        scope: &TenantScope,
        refs: I,
    ) -> Result<HashMap<AccountRef, AccountInfo>, LedgerError>
    where
        I: IntoIterator<Item = &'a AccountRef>,
    {
        let refs: Vec<&AccountRef> = refs.into_iter().collect();
        let mut ids = Vec::new();
        let mut codes = Vec::new();
        for account_ref in &refs {
            match account_ref {
                AccountRef::Id(id) => ids.push(id.into_inner()),
                AccountRef::Code(code) => codes.push(code.trim().to_string()),
            }
        }

        let rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(
                Condition::any()
                    .add(accounts::Column::Id.is_in(ids))
                    .add(accounts::Column::Code.is_in(codes)),
            )
            .lock_shared()
            .all(scope.conn())
            .await
            .map_err(storage)?;

        let mut found = HashMap::new();
        for account_ref in refs {
            let row = match account_ref {
                AccountRef::Id(id) => rows.iter().find(|row| row.id == id.into_inner()),
                AccountRef::Code(code) => rows.iter().find(|row| row.code == code.trim()),
            };
            if let Some(row) = row {
                found.insert(
                    account_ref.clone(),
                    AccountInfo {
                        id: AccountId::from_uuid(row.id),
                        code: row.code.clone(),
                        is_active: row.is_active,
                    },
                );
            }
        }
        Ok(found)
    }

    async fn find(&self, scope: &TenantScope, id: AccountId) -> Result<Option<Account>, LedgerError> {
        if let Some(cached) = self.cache.account(scope.tenant_id(), id).await {
            return Ok(Some((*cached).clone()));
        }

        let observed = self.cache.generation();
        let model = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .one(scope.conn())
            .await
            .map_err(storage)?;

        Ok(match model {
            Some(model) => {
                let account = Account::from(model);
                self.cache.put_account(observed, account.clone()).await;
                Some(account)
            }
            None => None,
        })
    }

    async fn find_by_code(&self, scope: &TenantScope, code: &str) -> Result<Option<Account>, LedgerError> {
        let code = code.trim();
        if let Some(id) = self.cache.account_id_by_code(scope.tenant_id(), code).await {
            return self.find(scope, id).await;
        }

        let observed = self.cache.generation();
        Ok(match self.find_model_by_code(scope, code).await? {
            Some(model) => {
                let account = Account::from(model);
                self.cache.put_account(observed, account.clone()).await;
                Some(account)
            }
            None => None,
        })
    }

    async fn find_model_by_code(
        &self,
        scope: &TenantScope,
        code: &str,
    ) -> Result<Option<accounts::Model>, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .filter(accounts::Column::Code.eq(code))
            .one(scope.conn())
            .await
            .map_err(storage)
    }

    /// Loads the row for a write, bypassing the cache.
    async fn load_model(&self, scope: &TenantScope, id: AccountId) -> Result<accounts::Model, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .one(scope.conn())
            .await
            .map_err(storage)?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn parent_map(&self, scope: &TenantScope) -> Result<HashMap<Uuid, Option<Uuid>>, LedgerError> {
        let pairs: Vec<(Uuid, Option<Uuid>)> = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
            .select_only()
            .column(accounts::Column::Id)
            .column(accounts::Column::ParentId)
            .into_tuple()
            .all(scope.conn())
            .await
            .map_err(storage)?;

        Ok(pairs.into_iter().collect())
    }
}
