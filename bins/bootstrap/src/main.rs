//! Administrative setup for the Tally ledger.
//!
//! Configuration comes from `config/*.toml` and `TALLY__*` environment variables.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tally_core::tax::NewTaxRate;
use tally_db::{LedgerCore, NewTenant, connect};
use tally_shared::AppConfig;
use tally_shared::config::{LogFormat, LoggingConfig};
use tally_shared::types::{TaxRateId, TenantId};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "bootstrap")]
#[command(about = "Administrative setup for Tally tenants and global tax rates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a tenant and create its standard chart of accounts
    Tenant {
        /// Display name
        name: String,
        /// ISO 4217 base currency, e.g. "USD"
        currency: String,
        /// Entry number prefix (defaults to the configured one)
        prefix: Option<String>,
    },

    /// Create any standard accounts the tenant is missing
    Chart {
        /// Tenant ID
        tenant: TenantId,
    },

    /// Add a global default tax rate
    GlobalRate {
        jurisdiction: String,
        category: String,
        /// Decimal fraction, e.g. 0.0725
        rate: Decimal,
        /// First day in force (YYYY-MM-DD)
        valid_from: NaiveDate,
        /// Last day in force; open-ended when omitted
        valid_to: Option<NaiveDate>,
    },

    /// Close an open global default tax rate
    CloseGlobalRate {
        /// Tax rate ID
        id: TaxRateId,
        /// Last day in force (YYYY-MM-DD)
        valid_to: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");
    let ledger = LedgerCore::new(db, &config);

    match cli.command {
        Command::Tenant {
            name,
            currency,
            prefix,
        } => register(&ledger, name, currency, prefix).await,
        Command::Chart { tenant } => chart(&ledger, tenant).await,
        Command::GlobalRate {
            jurisdiction,
            category,
            rate,
            valid_from,
            valid_to,
        } => {
            let input = NewTaxRate {
                jurisdiction,
                category,
                rate,
                valid_from,
                valid_to,
                account_id: None,
            };
            global_rate(&ledger, input).await
        }
        Command::CloseGlobalRate { id, valid_to } => close_global_rate(&ledger, id, valid_to).await,
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn register(
    ledger: &LedgerCore,
    name: String,
    currency: String,
    prefix: Option<String>,
) -> anyhow::Result<()> {
    let mut input = NewTenant::new(name, currency);
    if let Some(prefix) = prefix {
        input = input.with_prefix(prefix);
    }

    let tenant = ledger.register_tenant(input).await?;
    let accounts = ledger.bootstrap_chart(tenant.id).await?;
    info!(
        tenant_id = %tenant.id,
        prefix = %tenant.entry_prefix,
        accounts = accounts.len(),
        "Tenant ready"
    );
    println!("{}", tenant.id);
    Ok(())
}

async fn chart(ledger: &LedgerCore, tenant: TenantId) -> anyhow::Result<()> {
    let created = ledger.bootstrap_chart(tenant).await?;
    for account in &created {
        println!("{} {}", account.code, account.name);
    }
    Ok(())
}

async fn global_rate(ledger: &LedgerCore, input: NewTaxRate) -> anyhow::Result<()> {
    let created = ledger.create_global_tax_rate(input).await?;
    info!(
        rate_id = %created.id,
        jurisdiction = %created.jurisdiction,
        category = %created.category,
        "Global tax rate created"
    );
    println!("{}", created.id);
    Ok(())
}

async fn close_global_rate(
    ledger: &LedgerCore,
    id: TaxRateId,
    valid_to: NaiveDate,
) -> anyhow::Result<()> {
    let closed = ledger.close_global_tax_rate(id, valid_to).await?;
    info!(rate_id = %closed.id, "Global tax rate closed");
    Ok(())
}
