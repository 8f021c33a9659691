//! Database layer with `SeaORM` entities, repositories and the ledger facade.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and migrations
//! - Tenant-scoped units of work ([`TenantScope`])
//! - Repositories that enforce core rules against storage
//! - The per-tenant [`ReferenceCache`]
//! - [`LedgerCore`], the programmatic boundary collaborators call

pub mod cache;
pub(crate) mod entities;
mod error;
pub mod ledger_core;
pub mod migration;
pub mod repositories;
pub mod tenant;

pub use cache::ReferenceCache;
pub use ledger_core::LedgerCore;
pub use tenant::{NewTenant, Tenant, TenantScope};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    tracing::debug!(
        max_connections = config.max_connections,
        "Connecting to database"
    );
    Database::connect(options).await
}
