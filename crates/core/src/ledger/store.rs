//! The entry store seam.
//!
//! Persistence layers implement [`LedgerStore`]. Each write method is one
//! atomic unit: either everything it describes is committed or nothing is.

use async_trait::async_trait;
use chrono::NaiveDate;
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, StudentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::BalanceUpdate;
use super::entry::{Allocation, LedgerEntry, NewAllocation, NewLedgerEntry};
use super::error::LedgerError;
use super::types::EntryType;

/// Filter for listing entries across students.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Only this student's entries.
    pub student_id: Option<StudentId>,
    /// Only entries of this type.
    pub entry_type: Option<EntryType>,
    /// Inclusive lower bound on the business date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the business date.
    pub date_to: Option<NaiveDate>,
}

impl EntryFilter {
    /// Returns true if the entry passes every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.student_id.is_none_or(|s| entry.student_id == s)
            && self.entry_type.is_none_or(|t| entry.entry_type == t)
            && self.date_from.is_none_or(|d| entry.date >= d)
            && self.date_to.is_none_or(|d| entry.date <= d)
    }
}

/// Totals for one entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    /// The entry type.
    pub entry_type: EntryType,
    /// Number of entries.
    pub count: u64,
    /// Sum of debits.
    pub debit_total: Decimal,
    /// Sum of credits.
    pub credit_total: Decimal,
}

/// Ledger-wide aggregates across all students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// One row per entry type, in [`EntryType::ALL`] order.
    pub by_type: Vec<TypeStats>,
    /// Number of entries.
    pub total_entries: u64,
    /// Sum of all debits.
    pub total_debit: Decimal,
    /// Sum of all credits.
    pub total_credit: Decimal,
    /// Entries flagged reversed.
    pub reversed_entries: u64,
}

impl LedgerStats {
    /// Builds stats from per-type rows; types without rows are reported as zero.
    #[must_use]
    pub fn from_type_rows(rows: impl IntoIterator<Item = TypeStats>, reversed_entries: u64) -> Self {
        let mut by_type: Vec<TypeStats> = EntryType::ALL
            .into_iter()
            .map(|entry_type| TypeStats {
                entry_type,
                count: 0,
                debit_total: Decimal::ZERO,
                credit_total: Decimal::ZERO,
            })
            .collect();

        for row in rows {
            if let Some(slot) = by_type.iter_mut().find(|s| s.entry_type == row.entry_type) {
                slot.count += row.count;
                slot.debit_total = slot.debit_total.saturating_add(row.debit_total);
                slot.credit_total = slot.credit_total.saturating_add(row.credit_total);
            }
        }

        Self {
            total_entries: by_type.iter().map(|s| s.count).sum(),
            total_debit: by_type
                .iter()
                .map(|s| s.debit_total)
                .fold(Decimal::ZERO, Decimal::saturating_add),
            total_credit: by_type
                .iter()
                .map(|s| s.credit_total)
                .fold(Decimal::ZERO, Decimal::saturating_add),
            by_type,
            reversed_entries,
        }
    }

    /// Aggregates a set of entries.
    #[must_use]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut reversed = 0;
        let rows: Vec<TypeStats> = entries
            .into_iter()
            .inspect(|e| {
                if e.is_reversed {
                    reversed += 1;
                }
            })
            .map(|e| TypeStats {
                entry_type: e.entry_type,
                count: 1,
                debit_total: e.debit,
                credit_total: e.credit,
            })
            .collect();
        Self::from_type_rows(rows, reversed)
    }
}

/// Append-only store of ledger entries and their allocations.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns true if the student is known to the identity service.
    async fn student_exists(&self, student_id: StudentId) -> Result<bool, LedgerError>;

    /// Consumes an entry number and appends the entry in one transaction.
    ///
    /// Fails with `StudentNotFound` for unknown students and
    /// `SequencerUnavailable`/`Database` if nothing could be committed.
    async fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// Flags the original reversed (compare-and-set) and appends the reversal
    /// in one transaction. Returns `(original, reversal)`.
    ///
    /// Fails with `AlreadyReversed` and writes nothing if the flag was
    /// already set, `EntryNotFound` if the original is missing.
    async fn append_reversal(
        &self,
        original_id: LedgerEntryId,
        reversal: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError>;

    /// Looks up one entry.
    async fn find_entry(&self, entry_id: LedgerEntryId) -> Result<Option<LedgerEntry>, LedgerError>;

    /// All of a student's entries, in any order.
    async fn entries_for_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// One page of entries matching `filter`, newest first by
    /// `(date, entry_number)`, plus the total number of matches.
    async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError>;

    /// Rewrites cached balances. Never touches any other column.
    async fn update_balances(&self, updates: &[BalanceUpdate]) -> Result<(), LedgerError>;

    /// Locks both entries, checks outstanding amounts and inserts the
    /// allocation in one transaction.
    async fn create_allocation(&self, allocation: NewAllocation) -> Result<Allocation, LedgerError>;

    /// Deletes an allocation, returning the removed row.
    async fn delete_allocation(&self, allocation_id: AllocationId) -> Result<Allocation, LedgerError>;

    /// Allocations where the entry is the payment or the invoice side.
    async fn allocations_for_entry(&self, entry_id: LedgerEntryId) -> Result<Vec<Allocation>, LedgerError>;

    /// Aggregates across all students.
    async fn stats(&self) -> Result<LedgerStats, LedgerError>;
}
