//! Request and response bodies.
//!
//! Field names are camelCase on the wire; amounts travel as decimal strings.

use chrono::{DateTime, NaiveDate, Utc};
use hostel_core::ledger::{
    Allocation, BalanceType, EntryAllocations, EntryType, LedgerEntry, LedgerStats,
    ReversalOutcome, StudentBalance, TypeStats,
};
use hostel_shared::types::{AllocationId, LedgerEntryId, StudentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Query parameters for listing entries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    /// Filter by student.
    pub student_id: Option<StudentId>,
    /// Filter by entry type.
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    /// Inclusive start date (YYYY-MM-DD).
    pub date_from: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD).
    pub date_to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub limit: Option<u32>,
}

/// Body for `POST /ledgers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntryRequest {
    /// Student to post to.
    pub student_id: StudentId,
    /// Entry type name.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Statement text.
    pub description: String,
    /// Business date; today if omitted.
    pub date: Option<NaiveDate>,
    /// Originating record.
    pub reference_id: Option<Uuid>,
    /// `debit` or `credit`; required for adjustments.
    pub direction: Option<String>,
}

/// Body for `POST /ledgers/adjustment`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    /// Student to adjust.
    pub student_id: StudentId,
    /// Positive amount.
    pub amount: Decimal,
    /// Statement text.
    pub description: String,
    /// `debit` or `credit`.
    #[serde(rename = "type")]
    pub direction: String,
}

/// Body for `POST /ledgers/{entryId}/reverse`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    /// Actor performing the reversal; the system actor if omitted.
    pub reversed_by: Option<String>,
    /// Why the entry is being reversed. Missing and blank are both
    /// rejected by reversal validation.
    #[serde(default)]
    pub reason: String,
}

/// Body for `POST /ledgers/allocations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    /// Payment entry being applied.
    pub payment_id: LedgerEntryId,
    /// Invoice entry being settled.
    pub invoice_id: LedgerEntryId,
    /// Amount to apply.
    pub amount: Decimal,
}

/// A ledger entry as returned by the API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    /// Entry ID.
    pub id: LedgerEntryId,
    /// Owning student.
    pub student_id: StudentId,
    /// Global sequence number.
    pub entry_number: i64,
    /// Business date.
    pub date: NaiveDate,
    /// Entry type.
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Statement text.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Absolute running balance after this entry.
    pub balance: Decimal,
    /// `Dr`, `Cr` or `Nil`.
    pub balance_type: BalanceType,
    /// Originating record, or the reversed entry.
    pub reference_id: Option<Uuid>,
    /// Whether a reversal has been posted against this entry.
    pub is_reversed: bool,
    /// The entry this one reverses.
    pub reversal_of: Option<LedgerEntryId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for EntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            student_id: entry.student_id,
            entry_number: entry.entry_number,
            date: entry.date,
            entry_type: entry.entry_type,
            description: entry.description,
            debit: entry.debit,
            credit: entry.credit,
            balance: entry.balance,
            balance_type: entry.balance_type,
            reference_id: entry.reference_id,
            is_reversed: entry.is_reversed,
            reversal_of: entry.reversal_of,
            created_at: entry.created_at,
        }
    }
}

/// Result of a reversal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalResponse {
    /// The original entry, now flagged reversed.
    pub original_entry: EntryResponse,
    /// The compensating entry.
    pub reversal_entry: EntryResponse,
}

impl From<ReversalOutcome> for ReversalResponse {
    fn from(outcome: ReversalOutcome) -> Self {
        Self {
            original_entry: outcome.original_entry.into(),
            reversal_entry: outcome.reversal_entry.into(),
        }
    }
}

/// A student's balance summary.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    /// The student.
    pub student_id: StudentId,
    /// Absolute balance after the last entry.
    pub current_balance: Decimal,
    /// Sum of all debits.
    pub debit_balance: Decimal,
    /// Sum of all credits.
    pub credit_balance: Decimal,
    /// `Dr`, `Cr` or `Nil`.
    pub balance_type: BalanceType,
    /// Number of entries, reversals included.
    pub total_entries: u64,
    /// Net amount per entry type over live entries.
    pub breakdown: BTreeMap<EntryType, Decimal>,
}

impl From<StudentBalance> for BalanceResponse {
    fn from(balance: StudentBalance) -> Self {
        Self {
            student_id: balance.student_id,
            current_balance: balance.current_balance,
            debit_balance: balance.debit_total,
            credit_balance: balance.credit_total,
            balance_type: balance.balance_type,
            total_entries: balance.total_entries,
            breakdown: balance.breakdown,
        }
    }
}

/// A student's full history.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLedgerResponse {
    /// The student.
    pub student_id: StudentId,
    /// Entries in fold order with running balances.
    pub entries: Vec<EntryResponse>,
}

/// One allocation row.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    /// Allocation ID.
    pub id: AllocationId,
    /// Payment entry.
    pub payment_id: LedgerEntryId,
    /// Invoice entry.
    pub invoice_id: LedgerEntryId,
    /// Amount applied.
    pub allocated_amount: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Allocation> for AllocationResponse {
    fn from(allocation: Allocation) -> Self {
        Self {
            id: allocation.id,
            payment_id: allocation.payment_id,
            invoice_id: allocation.invoice_id,
            allocated_amount: allocation.allocated_amount,
            created_at: allocation.created_at,
        }
    }
}

/// Allocations touching one entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryAllocationsResponse {
    /// The entry.
    pub entry_id: LedgerEntryId,
    /// The entry's own amount.
    pub amount: Decimal,
    /// Sum of allocations touching the entry.
    pub allocated: Decimal,
    /// What is left to allocate.
    pub outstanding: Decimal,
    /// Allocations touching the entry.
    pub allocations: Vec<AllocationResponse>,
}

impl From<EntryAllocations> for EntryAllocationsResponse {
    fn from(view: EntryAllocations) -> Self {
        Self {
            entry_id: view.entry_id,
            amount: view.outstanding.amount,
            allocated: view.outstanding.allocated,
            outstanding: view.outstanding.outstanding,
            allocations: view.allocations.into_iter().map(Into::into).collect(),
        }
    }
}

/// Totals for one entry type.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStatsResponse {
    /// Entry type.
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Number of entries.
    pub count: u64,
    /// Sum of debits.
    pub debit_total: Decimal,
    /// Sum of credits.
    pub credit_total: Decimal,
}

impl From<TypeStats> for TypeStatsResponse {
    fn from(stats: TypeStats) -> Self {
        Self {
            entry_type: stats.entry_type,
            count: stats.count,
            debit_total: stats.debit_total,
            credit_total: stats.credit_total,
        }
    }
}

/// Ledger-wide aggregates.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// One row per entry type.
    pub by_type: Vec<TypeStatsResponse>,
    /// Number of entries.
    pub total_entries: u64,
    /// Sum of all debits.
    pub total_debit: Decimal,
    /// Sum of all credits.
    pub total_credit: Decimal,
    /// Entries flagged reversed.
    pub reversed_entries: u64,
}

impl From<LedgerStats> for StatsResponse {
    fn from(stats: LedgerStats) -> Self {
        Self {
            by_type: stats.by_type.into_iter().map(Into::into).collect(),
            total_entries: stats.total_entries,
            total_debit: stats.total_debit,
            total_credit: stats.total_credit,
            reversed_entries: stats.reversed_entries,
        }
    }
}
