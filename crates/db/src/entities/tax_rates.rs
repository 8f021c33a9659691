//! `SeaORM` Entity for tax_rates table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tax_rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub jurisdiction: String,
    pub category: String,
    #[sea_orm(column_type = "Decimal(Some((28, 12)))")]
    pub rate: Decimal,
    pub valid_from: Date,
    pub valid_to: Option<Date>,
    pub account_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
