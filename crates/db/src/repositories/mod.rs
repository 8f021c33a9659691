//! Repository abstractions for data access.
//!
//! Every repository function takes a [`TenantScope`](crate::tenant::TenantScope)
//! and runs on its transaction, so a unit of work never spans tenants.

pub mod account;
pub mod journal;
pub mod report;
pub mod tax_rate;

pub use account::AccountRepository;
pub use journal::{JournalRepository, VoidOutcome};
pub use report::ReportRepository;
pub use tax_rate::TaxRateRepository;
