//! Tax rate persistence.
//!
//! Tenant overrides are written inside a [`TenantScope`]. Global defaults are
//! administrative and written in a transaction with no tenant set, which is
//! the only context the RLS policies accept for them.

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::LedgerError;
use tally_core::tax::{
    NewTaxRate, TaxRate, check_can_close, check_no_overlap, normalize_category,
    normalize_jurisdiction,
};
use tally_shared::types::{AccountId, TaxRateId, TenantId};
use uuid::Uuid;

use crate::cache::ReferenceCache;
use crate::entities::{accounts, tax_rates};
use crate::error::storage;
use crate::tenant::{TenantScope, set_tenant_context};

impl From<tax_rates::Model> for TaxRate {
    fn from(model: tax_rates::Model) -> Self {
        Self {
            id: TaxRateId::from_uuid(model.id),
            tenant_id: model.tenant_id.map(TenantId::from_uuid),
            jurisdiction: model.jurisdiction,
            category: model.category,
            rate: model.rate,
            valid_from: model.valid_from,
            valid_to: model.valid_to,
            account_id: model.account_id.map(AccountId::from_uuid),
        }
    }
}

/// Tax rate repository.
#[derive(Debug, Clone)]
pub struct TaxRateRepository {
    cache: ReferenceCache,
}

impl TaxRateRepository {
    /// Creates a repository reading through `cache`.
    #[must_use]
    pub fn new(cache: ReferenceCache) -> Self {
        Self { cache }
    }

    /// Creates a tenant override.
    ///
    /// # Errors
    ///
    /// - `InvalidTaxRate` / `InvalidDateInterval` for malformed input
    /// - `AccountNotFound` if the posting account is not in the tenant
    /// - `OverlappingTaxRate` if another override of the scope covers any of the dates
    pub async fn create(&self, scope: &TenantScope, input: NewTaxRate) -> Result<TaxRate, LedgerError> {
        let input = input.normalized()?;

        if let Some(account_id) = input.account_id {
            let exists = accounts::Entity::find_by_id(account_id.into_inner())
                .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
                .one(scope.conn())
                .await
                .map_err(storage)?
                .is_some();
            if !exists {
                return Err(LedgerError::AccountNotFound(account_id));
            }
        }

        insert_rate(scope.conn(), Some(scope.tenant_id()), input).await
    }

    /// Creates a global default rate.
    ///
    /// # Errors
    ///
    /// - `InvalidTaxRate` / `InvalidDateInterval` for malformed input
    /// - `InvalidAccount` if a posting account is given
    /// - `OverlappingTaxRate` if another global rate of the scope covers any of the dates
    pub async fn create_global(
        &self,
        db: &DatabaseConnection,
        input: NewTaxRate,
    ) -> Result<TaxRate, LedgerError> {
        let input = input.normalized()?;
        if let Some(account_id) = input.account_id {
            return Err(LedgerError::InvalidAccount {
                account: account_id.to_string(),
                reason: "global tax rates carry no posting account".to_string(),
            });
        }

        let txn = db.begin().await.map_err(storage)?;
        set_tenant_context(&txn, None).await.map_err(storage)?;
        let rate = insert_rate(&txn, None, input).await?;
        txn.commit().await.map_err(storage)?;
        Ok(rate)
    }

    /// Closes an open tenant override on `valid_to`.
    ///
    /// # Errors
    ///
    /// - `TaxRateNotFound` if the tenant has no such override
    /// - `TaxRateClosed` / `InvalidDateInterval` if it cannot be closed on that date
    pub async fn close(
        &self,
        scope: &TenantScope,
        id: TaxRateId,
        valid_to: NaiveDate,
    ) -> Result<TaxRate, LedgerError> {
        let model = tax_rates::Entity::find_by_id(id.into_inner())
            .filter(tax_rates::Column::TenantId.eq(scope.tenant_uuid()))
            .one(scope.conn())
            .await
            .map_err(storage)?
            .ok_or(LedgerError::TaxRateNotFound(id))?;

        close_rate(scope.conn(), model, valid_to).await
    }

    /// Closes an open global rate on `valid_to`.
    ///
    /// # Errors
    ///
    /// - `TaxRateNotFound` if there is no such global rate
    /// - `TaxRateClosed` / `InvalidDateInterval` if it cannot be closed on that date
    pub async fn close_global(
        &self,
        db: &DatabaseConnection,
        id: TaxRateId,
        valid_to: NaiveDate,
    ) -> Result<TaxRate, LedgerError> {
        let txn = db.begin().await.map_err(storage)?;
        set_tenant_context(&txn, None).await.map_err(storage)?;

        let model = tax_rates::Entity::find_by_id(id.into_inner())
            .filter(tax_rates::Column::TenantId.is_null())
            .one(&txn)
            .await
            .map_err(storage)?
            .ok_or(LedgerError::TaxRateNotFound(id))?;

        let rate = close_rate(&txn, model, valid_to).await?;
        txn.commit().await.map_err(storage)?;
        Ok(rate)
    }

    /// Lists the rates visible to the tenant: its overrides and the global defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        scope: &TenantScope,
        jurisdiction: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<TaxRate>, LedgerError> {
        let mut query = tax_rates::Entity::find().filter(visible_to(scope.tenant_uuid()));
        if let Some(jurisdiction) = jurisdiction {
            query = query.filter(tax_rates::Column::Jurisdiction.eq(normalize_jurisdiction(jurisdiction)));
        }
        if let Some(category) = category {
            query = query.filter(tax_rates::Column::Category.eq(normalize_category(category)));
        }

        let models = query
            .order_by_asc(tax_rates::Column::Jurisdiction)
            .order_by_asc(tax_rates::Column::Category)
            .order_by_asc(tax_rates::Column::ValidFrom)
            .all(scope.conn())
            .await
            .map_err(storage)?;

        Ok(models.into_iter().map(TaxRate::from).collect())
    }

    /// Candidate rates for one (jurisdiction, category), overrides and globals together.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn candidates(
        &self,
        scope: &TenantScope,
        jurisdiction: &str,
        category: &str,
    ) -> Result<Arc<Vec<TaxRate>>, LedgerError> {
        let jurisdiction = normalize_jurisdiction(jurisdiction);
        let category = normalize_category(category);

        if let Some(cached) = self
            .cache
            .tax_candidates(scope.tenant_id(), &jurisdiction, &category)
            .await
        {
            return Ok(cached);
        }

        let observed = self.cache.generation();
        let rates: Vec<TaxRate> = tax_rates::Entity::find()
            .filter(visible_to(scope.tenant_uuid()))
            .filter(tax_rates::Column::Jurisdiction.eq(jurisdiction.as_str()))
            .filter(tax_rates::Column::Category.eq(category.as_str()))
            .order_by_asc(tax_rates::Column::ValidFrom)
            .all(scope.conn())
            .await
            .map_err(storage)?
            .into_iter()
            .map(TaxRate::from)
            .collect();

        Ok(self
            .cache
            .put_tax_candidates(observed, scope.tenant_id(), &jurisdiction, &category, rates)
            .await)
    }
}

/// Overrides of `tenant` plus the global defaults.
fn visible_to(tenant: Uuid) -> Condition {
    Condition::any()
        .add(tax_rates::Column::TenantId.eq(tenant))
        .add(tax_rates::Column::TenantId.is_null())
}

/// Checks overlap within the scope and inserts the rate.
async fn insert_rate<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Option<TenantId>,
    input: NewTaxRate,
) -> Result<TaxRate, LedgerError> {
    let scope_filter = match tenant_id {
        Some(tenant) => tax_rates::Column::TenantId.eq(tenant.into_inner()),
        None => tax_rates::Column::TenantId.is_null(),
    };
    let existing: Vec<TaxRate> = tax_rates::Entity::find()
        .filter(scope_filter)
        .filter(tax_rates::Column::Jurisdiction.eq(input.jurisdiction.as_str()))
        .filter(tax_rates::Column::Category.eq(input.category.as_str()))
        .all(conn)
        .await
        .map_err(storage)?
        .into_iter()
        .map(TaxRate::from)
        .collect();
    check_no_overlap(&existing, tenant_id, &input)?;

    let rate = input.into_rate(TaxRateId::new(), tenant_id);
    tax_rates::ActiveModel {
        id: Set(rate.id.into_inner()),
        tenant_id: Set(rate.tenant_id.map(TenantId::into_inner)),
        jurisdiction: Set(rate.jurisdiction.clone()),
        category: Set(rate.category.clone()),
        rate: Set(rate.rate),
        valid_from: Set(rate.valid_from),
        valid_to: Set(rate.valid_to),
        account_id: Set(rate.account_id.map(AccountId::into_inner)),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(storage)?;

    Ok(rate)
}

async fn close_rate<C: ConnectionTrait>(
    conn: &C,
    model: tax_rates::Model,
    valid_to: NaiveDate,
) -> Result<TaxRate, LedgerError> {
    check_can_close(&TaxRate::from(model.clone()), valid_to)?;

    let mut active: tax_rates::ActiveModel = model.into();
    active.valid_to = Set(Some(valid_to));
    let updated = active.update(conn).await.map_err(storage)?;
    Ok(updated.into())
}
