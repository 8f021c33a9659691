//! Tenant registry and tenant-scoped units of work.
//!
//! Every ledger operation runs inside a [`TenantScope`]: one database
//! transaction whose `app.current_tenant_id` setting drives the row-level
//! security policies. Repositories additionally filter on `tenant_id`, so
//! isolation holds even for roles that bypass RLS.
//!
//! ```ignore
//! let scope = TenantScope::begin(&db, tenant_id).await?;
//! let accounts = accounts.list(&scope).await?;
//! scope.commit().await?;
//! ```

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tally_core::LedgerError;
use tally_shared::types::{Currency, TenantId};
use uuid::Uuid;

use crate::entities::tenants;
use crate::error::storage;

const SET_TENANT_SQL: &str = "SELECT set_config('app.current_tenant_id', $1, true)";

/// Maximum length of an entry number prefix.
pub const MAX_PREFIX_LEN: usize = 10;

/// Maximum length of a tenant name.
pub const MAX_TENANT_NAME_LEN: usize = 255;

/// A ledger tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Currency all base amounts are kept in.
    pub base_currency: Currency,
    /// Prefix of posted entry numbers.
    pub entry_prefix: String,
    /// Inactive tenants cannot open a scope.
    pub is_active: bool,
}

impl TryFrom<tenants::Model> for Tenant {
    type Error = LedgerError;

    fn try_from(model: tenants::Model) -> Result<Self, Self::Error> {
        let base_currency = Currency::new(&model.base_currency)
            .map_err(|_| LedgerError::integrity(format!(
                "tenant {} has malformed base currency '{}'",
                model.id, model.base_currency
            )))?;

        Ok(Self {
            id: TenantId::from_uuid(model.id),
            name: model.name,
            base_currency,
            entry_prefix: model.entry_prefix,
            is_active: model.is_active,
        })
    }
}

/// Input for registering a tenant.
#[derive(Debug, Clone)]
pub struct NewTenant {
    /// Display name.
    pub name: String,
    /// Base currency code.
    pub base_currency: String,
    /// Entry number prefix; the configured default when `None`.
    pub entry_prefix: Option<String>,
}

impl NewTenant {
    /// Creates input using the default entry prefix.
    pub fn new(name: impl Into<String>, base_currency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_currency: base_currency.into(),
            entry_prefix: None,
        }
    }

    /// Sets the entry number prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_prefix = Some(prefix.into());
        self
    }
}

/// A transaction bound to one tenant.
///
/// Dropping the scope without committing rolls the transaction back.
pub struct TenantScope {
    txn: DatabaseTransaction,
    tenant: Tenant,
}

impl TenantScope {
    /// Opens a transaction scoped to `tenant_id`.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the tenant is unknown or inactive
    /// - `Storage` if the transaction cannot be started
    pub async fn begin(db: &DatabaseConnection, tenant_id: TenantId) -> Result<Self, LedgerError> {
        let txn = db.begin().await.map_err(storage)?;
        set_tenant_context(&txn, Some(tenant_id))
            .await
            .map_err(storage)?;

        let model = tenants::Entity::find_by_id(tenant_id.into_inner())
            .filter(tenants::Column::IsActive.eq(true))
            .one(&txn)
            .await
            .map_err(storage)?
            .ok_or(LedgerError::TenantNotFound(tenant_id))?;

        let tenant = Tenant::try_from(model)?;
        Ok(Self { txn, tenant })
    }

    /// The tenant this scope is bound to.
    #[must_use]
    pub const fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// The tenant ID.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant.id
    }

    pub(crate) const fn tenant_uuid(&self) -> Uuid {
        self.tenant.id.into_inner()
    }

    /// The underlying transaction. Every query of the unit of work runs on it.
    pub(crate) const fn conn(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails, including deferred constraint
    /// failures.
    pub async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(storage)
    }

    /// Rolls the unit of work back.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(storage)
    }
}

/// Sets the RLS tenant for the rest of the transaction; `None` clears it.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub(crate) async fn set_tenant_context<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Option<TenantId>,
) -> Result<(), DbErr> {
    let value = tenant_id.map(|id| id.to_string()).unwrap_or_default();
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        SET_TENANT_SQL,
        [value.into()],
    ))
    .await?;
    Ok(())
}

/// Validates registration input, filling in the default prefix.
fn normalize_new_tenant(
    input: NewTenant,
    default_prefix: &str,
) -> Result<(String, Currency, String), LedgerError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(LedgerError::InvalidTenant("name is required".to_string()));
    }
    if name.chars().count() > MAX_TENANT_NAME_LEN {
        return Err(LedgerError::InvalidTenant(format!(
            "name must be at most {MAX_TENANT_NAME_LEN} characters"
        )));
    }

    let base_currency = Currency::new(&input.base_currency)
        .map_err(|_| LedgerError::InvalidCurrency(input.base_currency.clone()))?;

    let prefix = input
        .entry_prefix
        .map_or_else(|| default_prefix.to_string(), |p| p.trim().to_string());
    let prefix_ok = !prefix.is_empty()
        && prefix.len() <= MAX_PREFIX_LEN
        && prefix.bytes().all(|b| b.is_ascii_alphanumeric());
    if !prefix_ok {
        return Err(LedgerError::InvalidTenant(format!(
            "entry prefix '{prefix}' must be 1-{MAX_PREFIX_LEN} letters or digits"
        )));
    }

    Ok((name, base_currency, prefix))
}

/// Registers a tenant.
///
/// The insert runs in a transaction already scoped to the new tenant so the
/// tenant policy admits it.
///
/// # Errors
///
/// - `InvalidTenant` / `InvalidCurrency` for malformed input
/// - `Storage` if the insert fails
pub async fn register_tenant(
    db: &DatabaseConnection,
    input: NewTenant,
    default_prefix: &str,
) -> Result<Tenant, LedgerError> {
    let (name, base_currency, entry_prefix) = normalize_new_tenant(input, default_prefix)?;
    let id = TenantId::new();

    let txn = db.begin().await.map_err(storage)?;
    set_tenant_context(&txn, Some(id)).await.map_err(storage)?;

    let model = tenants::ActiveModel {
        id: Set(id.into_inner()),
        name: Set(name),
        base_currency: Set(base_currency.as_str().to_string()),
        entry_prefix: Set(entry_prefix),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(storage)?;

    txn.commit().await.map_err(storage)?;

    tracing::info!(tenant_id = %id, "Registered tenant");
    Tenant::try_from(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_new_tenant_uses_default_prefix() {
        let (name, currency, prefix) =
            normalize_new_tenant(NewTenant::new("  Acme GmbH ", "EUR"), "JE").unwrap();
        assert_eq!(name, "Acme GmbH");
        assert_eq!(currency.as_str(), "EUR");
        assert_eq!(prefix, "JE");
    }

    #[test]
    fn test_new_tenant_keeps_custom_prefix() {
        let input = NewTenant::new("Acme", "USD").with_prefix("GL");
        let (_, _, prefix) = normalize_new_tenant(input, "JE").unwrap();
        assert_eq!(prefix, "GL");
    }

    #[rstest]
    #[case("", "empty")]
    #[case("J-E", "contains a dash")]
    #[case("ABCDEFGHIJK", "eleven characters")]
    fn test_new_tenant_rejects_bad_prefix(#[case] prefix: &str, #[case] _why: &str) {
        let input = NewTenant::new("Acme", "USD").with_prefix(prefix);
        assert!(matches!(
            normalize_new_tenant(input, "JE"),
            Err(LedgerError::InvalidTenant(_))
        ));
    }

    #[test]
    fn test_new_tenant_rejects_blank_name() {
        assert!(matches!(
            normalize_new_tenant(NewTenant::new("   ", "USD"), "JE"),
            Err(LedgerError::InvalidTenant(_))
        ));
    }

    #[test]
    fn test_new_tenant_rejects_overlong_name() {
        let name = "A".repeat(MAX_TENANT_NAME_LEN + 1);
        assert!(matches!(
            normalize_new_tenant(NewTenant::new(name.as_str(), "USD"), "JE"),
            Err(LedgerError::InvalidTenant(_))
        ));
        let name = "A".repeat(MAX_TENANT_NAME_LEN);
        assert!(normalize_new_tenant(NewTenant::new(name.as_str(), "USD"), "JE").is_ok());
    }

    #[test]
    fn test_new_tenant_rejects_bad_currency() {
        assert_eq!(
            normalize_new_tenant(NewTenant::new("Acme", "dollars"), "JE").map(|_| ()),
            Err(LedgerError::InvalidCurrency("dollars".to_string()))
        );
    }
}
