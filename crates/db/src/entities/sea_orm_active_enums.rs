//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "revenue")]
    Revenue,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_status")]
pub enum EntryStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "voided")]
    Voided,
}

impl From<tally_core::accounts::AccountType> for AccountType {
    fn from(value: tally_core::accounts::AccountType) -> Self {
        use tally_core::accounts::AccountType as Domain;
        match value {
            Domain::Asset => Self::Asset,
            Domain::Liability => Self::Liability,
            Domain::Equity => Self::Equity,
            Domain::Revenue => Self::Revenue,
            Domain::Expense => Self::Expense,
        }
    }
}

impl From<AccountType> for tally_core::accounts::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<tally_core::ledger::EntryStatus> for EntryStatus {
    fn from(value: tally_core::ledger::EntryStatus) -> Self {
        use tally_core::ledger::EntryStatus as Domain;
        match value {
            Domain::Draft => Self::Draft,
            Domain::Posted => Self::Posted,
            Domain::Voided => Self::Voided,
        }
    }
}

impl From<EntryStatus> for tally_core::ledger::EntryStatus {
    fn from(value: EntryStatus) -> Self {
        match value {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Voided => Self::Voided,
        }
    }
}
