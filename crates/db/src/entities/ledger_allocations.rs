//! `SeaORM` Entity for ledger_allocations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub allocated_amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledger_entries::Entity",
        from = "Column::PaymentId",
        to = "super::ledger_entries::Column::Id"
    )]
    Payment,
    #[sea_orm(
        belongs_to = "super::ledger_entries::Entity",
        from = "Column::InvoiceId",
        to = "super::ledger_entries::Column::Id"
    )]
    Invoice,
}

impl ActiveModelBehavior for ActiveModel {}
