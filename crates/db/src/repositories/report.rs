//! Aggregate reads over posted journal lines.
//!
//! An entry counts toward balances once it has been posted, so both Posted and
//! Voided entries are summed: a voided original and its reversal net to zero.
//! Drafts never count.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter, QuerySelect, QueryTrait,
    RelationTrait, Select,
};
use tally_core::LedgerError;
use tally_core::accounts::Account;
use tally_core::ledger::AccountBalance;
use tally_core::reports::AccountActivity;
use tally_shared::types::AccountId;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::EntryStatus;
use crate::entities::{accounts, journal_entries, journal_lines};
use crate::error::storage;
use crate::tenant::TenantScope;

#[derive(Debug, FromQueryResult)]
struct TotalsRow {
    account_id: Uuid,
    total_debit: Option<Decimal>,
    total_credit: Option<Decimal>,
}

/// Read-only aggregates for balances and reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRepository;

impl ReportRepository {
    /// Creates the repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Posted balance of `account` as of `as_of`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn account_balance(
        &self,
        scope: &TenantScope,
        account: &Account,
        as_of: NaiveDate,
    ) -> Result<AccountBalance, LedgerError> {
        let (debit, credit) = account_totals(scope, account.id, Some(as_of)).await?;
        Ok(AccountBalance::from_totals(
            account.id,
            as_of,
            account.account_type.normal_balance(),
            debit,
            credit,
            scope.tenant().base_currency.clone(),
        ))
    }

    /// Activity of every account from the beginning of time through `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn activity_as_of(
        &self,
        scope: &TenantScope,
        as_of: NaiveDate,
    ) -> Result<Vec<AccountActivity>, LedgerError> {
        activity(scope, None, as_of).await
    }

    /// Activity of every account over entries dated in `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn activity_between(
        &self,
        scope: &TenantScope,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AccountActivity>, LedgerError> {
        activity(scope, Some(from), to).await
    }
}

/// Lines of balance-bearing entries in the scope's tenant, joined to their entry.
fn balance_bearing_lines(
    scope: &TenantScope,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Select<journal_lines::Entity> {
    journal_lines::Entity::find()
        .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
        .filter(journal_lines::Column::TenantId.eq(scope.tenant_uuid()))
        .filter(journal_entries::Column::TenantId.eq(scope.tenant_uuid()))
        .filter(journal_entries::Column::Status.ne(EntryStatus::Draft))
        .apply_if(from, |query, from| {
            query.filter(journal_entries::Column::EntryDate.gte(from))
        })
        .apply_if(to, |query, to| {
            query.filter(journal_entries::Column::EntryDate.lte(to))
        })
}

fn with_sums(query: Select<journal_lines::Entity>) -> Select<journal_lines::Entity> {
    query
        .select_only()
        .column(journal_lines::Column::AccountId)
        .column_as(
            Expr::col((journal_lines::Entity, journal_lines::Column::BaseDebit)).sum(),
            "total_debit",
        )
        .column_as(
            Expr::col((journal_lines::Entity, journal_lines::Column::BaseCredit)).sum(),
            "total_credit",
        )
        .group_by(journal_lines::Column::AccountId)
}

/// Base-currency debit and credit totals of one account, optionally up to a date.
pub(crate) async fn account_totals(
    scope: &TenantScope,
    account_id: AccountId,
    as_of: Option<NaiveDate>,
) -> Result<(Decimal, Decimal), LedgerError> {
    let row = with_sums(
        balance_bearing_lines(scope, None, as_of)
            .filter(journal_lines::Column::AccountId.eq(account_id.into_inner())),
    )
    .into_model::<TotalsRow>()
    .one(scope.conn())
    .await
    .map_err(storage)?;

    Ok(row.map_or((Decimal::ZERO, Decimal::ZERO), |r| {
        (
            r.total_debit.unwrap_or_default(),
            r.total_credit.unwrap_or_default(),
        )
    }))
}

async fn activity(
    scope: &TenantScope,
    from: Option<NaiveDate>,
    to: NaiveDate,
) -> Result<Vec<AccountActivity>, LedgerError> {
    let totals: HashMap<Uuid, (Decimal, Decimal)> =
        with_sums(balance_bearing_lines(scope, from, Some(to)))
            .into_model::<TotalsRow>()
            .all(scope.conn())
            .await
            .map_err(storage)?
            .into_iter()
            .map(|r| {
                (
                    r.account_id,
                    (
                        r.total_debit.unwrap_or_default(),
                        r.total_credit.unwrap_or_default(),
                    ),
                )
            })
            .collect();

    let accounts = accounts::Entity::find()
        .filter(accounts::Column::TenantId.eq(scope.tenant_uuid()))
        .all(scope.conn())
        .await
        .map_err(storage)?;

    Ok(accounts
        .into_iter()
        .map(|account| {
            let (total_debit, total_credit) = totals
                .get(&account.id)
                .copied()
                .unwrap_or((Decimal::ZERO, Decimal::ZERO));
            AccountActivity {
                account_id: AccountId::from_uuid(account.id),
                code: account.code,
                name: account.name,
                account_type: account.account_type.into(),
                total_debit,
                total_credit,
            }
        })
        .collect())
}
