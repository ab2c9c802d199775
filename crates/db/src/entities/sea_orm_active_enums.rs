//! `SeaORM` active enums stored as constrained `VARCHAR` columns.

use hostel_core::ledger::{BalanceType as CoreBalanceType, EntryType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored form of [`EntryType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LedgerEntryType {
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "payment")]
    Payment,
    #[sea_orm(string_value = "discount")]
    Discount,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "refund")]
    Refund,
    #[sea_orm(string_value = "penalty")]
    Penalty,
}

/// Stored form of the cached balance classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum BalanceType {
    #[sea_orm(string_value = "Dr")]
    Dr,
    #[sea_orm(string_value = "Cr")]
    Cr,
    #[sea_orm(string_value = "Nil")]
    Nil,
}

impl From<EntryType> for LedgerEntryType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::Invoice => Self::Invoice,
            EntryType::Payment => Self::Payment,
            EntryType::Discount => Self::Discount,
            EntryType::Adjustment => Self::Adjustment,
            EntryType::Refund => Self::Refund,
            EntryType::Penalty => Self::Penalty,
        }
    }
}

impl From<LedgerEntryType> for EntryType {
    fn from(value: LedgerEntryType) -> Self {
        match value {
            LedgerEntryType::Invoice => Self::Invoice,
            LedgerEntryType::Payment => Self::Payment,
            LedgerEntryType::Discount => Self::Discount,
            LedgerEntryType::Adjustment => Self::Adjustment,
            LedgerEntryType::Refund => Self::Refund,
            LedgerEntryType::Penalty => Self::Penalty,
        }
    }
}

impl From<CoreBalanceType> for BalanceType {
    fn from(value: CoreBalanceType) -> Self {
        match value {
            CoreBalanceType::Dr => Self::Dr,
            CoreBalanceType::Cr => Self::Cr,
            CoreBalanceType::Nil => Self::Nil,
        }
    }
}

impl From<BalanceType> for CoreBalanceType {
    fn from(value: BalanceType) -> Self {
        match value {
            BalanceType::Dr => Self::Dr,
            BalanceType::Cr => Self::Cr,
            BalanceType::Nil => Self::Nil,
        }
    }
}
