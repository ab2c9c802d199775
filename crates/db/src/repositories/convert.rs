//! Conversions between stored rows and ledger domain types.

use chrono::Utc;
use hostel_core::ledger::{Allocation, LedgerEntry, LedgerError};
use hostel_shared::types::{AllocationId, LedgerEntryId, StudentId};
use sea_orm::{DbErr, Set};

use crate::entities::{ledger_allocations, ledger_entries};

/// Maps a database error onto the ledger's storage failure.
pub fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}

impl From<ledger_entries::Model> for LedgerEntry {
    fn from(model: ledger_entries::Model) -> Self {
        Self {
            id: LedgerEntryId::from_uuid(model.id),
            student_id: StudentId::from_uuid(model.student_id),
            entry_number: model.entry_number,
            date: model.date,
            entry_type: model.entry_type.into(),
            description: model.description,
            debit: model.debit,
            credit: model.credit,
            balance: model.balance,
            balance_type: model.balance_type.into(),
            reference_id: model.reference_id,
            is_reversed: model.is_reversed,
            reversal_of: model.reversal_of.map(LedgerEntryId::from_uuid),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<ledger_allocations::Model> for Allocation {
    fn from(model: ledger_allocations::Model) -> Self {
        Self {
            id: AllocationId::from_uuid(model.id),
            payment_id: LedgerEntryId::from_uuid(model.payment_id),
            invoice_id: LedgerEntryId::from_uuid(model.invoice_id),
            allocated_amount: model.allocated_amount,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Builds an insertable row from a numbered entry.
pub fn entry_active_model(entry: &LedgerEntry) -> ledger_entries::ActiveModel {
    ledger_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        student_id: Set(entry.student_id.into_inner()),
        entry_number: Set(entry.entry_number),
        date: Set(entry.date),
        entry_type: Set(entry.entry_type.into()),
        description: Set(entry.description.clone()),
        debit: Set(entry.debit),
        credit: Set(entry.credit),
        balance: Set(entry.balance),
        balance_type: Set(entry.balance_type.into()),
        reference_id: Set(entry.reference_id),
        is_reversed: Set(entry.is_reversed),
        reversal_of: Set(entry.reversal_of.map(LedgerEntryId::into_inner)),
        created_at: Set(entry.created_at.into()),
    }
}
