//! Ledger facade tying the pure services to a store.
//!
//! Every command validates first, then performs exactly one atomic store call,
//! then refreshes the student's cached balances from a fresh fold. A cache
//! refresh that fails is logged and left for the next recompute; it never
//! turns a committed post into an error.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use hostel_shared::LedgerConfig;
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, PageResponse, StudentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::allocation::{AllocationService, Outstanding};
use super::balance::{BalanceCalculator, CurrentBalance, StudentBalance};
use super::entry::{Allocation, LedgerEntry, NewAllocation, check_amount};
use super::error::LedgerError;
use super::posting::PostingService;
use super::reversal::{ReversalOutcome, ReversalService};
use super::store::{EntryFilter, LedgerStats, LedgerStore};
use super::types::{Direction, EntryType, PostingInput};

/// An entry together with the allocations that touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAllocations {
    /// The entry.
    pub entry_id: LedgerEntryId,
    /// Allocations where the entry is either side.
    pub allocations: Vec<Allocation>,
    /// What is left to allocate.
    pub outstanding: Outstanding,
}

/// Student ledger facade.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl Ledger {
    /// Creates a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Ledger settings in effect.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn require_student(&self, student_id: StudentId) -> Result<(), LedgerError> {
        if self.store.student_exists(student_id).await? {
            Ok(())
        } else {
            Err(LedgerError::StudentNotFound(student_id))
        }
    }

    async fn require_entry(&self, entry_id: LedgerEntryId) -> Result<LedgerEntry, LedgerError> {
        self.store
            .find_entry(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    /// Posts a new entry and returns it with a freshly computed balance.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `Validation`, `StudentNotFound`, or `PostingFailed`
    /// if the store could not commit.
    #[instrument(skip(self, input), fields(student_id = %input.student_id, entry_type = %input.entry_type))]
    pub async fn post(&self, input: PostingInput) -> Result<LedgerEntry, LedgerError> {
        let new_entry = PostingService::prepare(&input, Self::today()).inspect_err(|e| {
            warn!(error = %e, "posting rejected");
        })?;
        self.require_student(input.student_id).await?;

        let entry = self
            .store
            .append(new_entry)
            .await
            .map_err(LedgerError::into_posting_failure)
            .inspect_err(|e| warn!(error = %e, "posting failed"))?;

        info!(
            entry_id = %entry.id,
            entry_number = entry.entry_number,
            debit = %entry.debit,
            credit = %entry.credit,
            "ledger entry posted"
        );

        Ok(self.with_fresh_balance(entry).await)
    }

    /// Posts an adjustment in an explicit direction.
    pub async fn post_adjustment(
        &self,
        student_id: StudentId,
        amount: Decimal,
        description: impl Into<String>,
        direction: Direction,
    ) -> Result<LedgerEntry, LedgerError> {
        self.post(
            PostingInput::new(student_id, EntryType::Adjustment, amount, description).direction(direction),
        )
        .await
    }

    /// Reverses a posted entry.
    ///
    /// `reversed_by` defaults to the configured system actor.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, `EntryNotFound`, `AlreadyReversed`,
    /// `CannotReverseReversal`, or `ReversalFailed` if the store could not
    /// commit.
    #[instrument(skip(self, reason))]
    pub async fn reverse(
        &self,
        entry_id: LedgerEntryId,
        reversed_by: Option<&str>,
        reason: &str,
    ) -> Result<ReversalOutcome, LedgerError> {
        let reason = ReversalService::validate_reason(reason)?;
        let actor = reversed_by
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.config.system_actor.as_str());

        let original = self.require_entry(entry_id).await?;
        ReversalService::check_reversible(&original).inspect_err(|e| {
            warn!(error = %e, "reversal rejected");
        })?;

        let reversal = ReversalService::create_reversing_entry(&original, actor, reason, Self::today());
        let (original, reversal) = self
            .store
            .append_reversal(entry_id, reversal)
            .await
            .map_err(LedgerError::into_reversal_failure)
            .inspect_err(|e| warn!(error = %e, "reversal failed"))?;

        info!(
            student_id = %original.student_id,
            reversal_id = %reversal.id,
            entry_number = reversal.entry_number,
            reversed_by = actor,
            "ledger entry reversed"
        );

        let (original_entry, reversal_entry) = match self.refresh_balances(original.student_id).await {
            Ok(ordered) => {
                let pick = |stale: LedgerEntry| {
                    ordered
                        .iter()
                        .find(|e| e.id == stale.id)
                        .cloned()
                        .unwrap_or(stale)
                };
                (pick(original), pick(reversal))
            }
            Err(e) => {
                warn!(reversal_id = %reversal.id, error = %e, "could not recompute balance after reversal");
                (original, reversal)
            }
        };

        Ok(ReversalOutcome {
            original_entry,
            reversal_entry,
        })
    }

    /// Allocates part of a payment to an invoice.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `EntryNotFound`, `Validation`, `AlreadyReversed`,
    /// `StudentMismatch` or `OverAllocation`.
    #[instrument(skip(self))]
    pub async fn allocate(
        &self,
        payment_id: LedgerEntryId,
        invoice_id: LedgerEntryId,
        amount: Decimal,
    ) -> Result<Allocation, LedgerError> {
        check_amount(amount)?;

        let allocation = self
            .store
            .create_allocation(NewAllocation {
                id: AllocationId::new(),
                payment_id,
                invoice_id,
                amount,
            })
            .await
            .inspect_err(|e| warn!(error = %e, "allocation rejected"))?;

        info!(allocation_id = %allocation.id, "payment allocated");
        Ok(allocation)
    }

    /// Removes an allocation. Always permitted, including after either side
    /// has been reversed.
    #[instrument(skip(self))]
    pub async fn deallocate(&self, allocation_id: AllocationId) -> Result<Allocation, LedgerError> {
        let removed = self.store.delete_allocation(allocation_id).await?;
        info!(
            payment_id = %removed.payment_id,
            invoice_id = %removed.invoice_id,
            amount = %removed.allocated_amount,
            "allocation removed"
        );
        Ok(removed)
    }

    /// Allocations touching an entry, with its outstanding amount.
    pub async fn allocations_for_entry(&self, entry_id: LedgerEntryId) -> Result<EntryAllocations, LedgerError> {
        let entry = self.require_entry(entry_id).await?;
        let allocations = self.store.allocations_for_entry(entry_id).await?;
        let outstanding = AllocationService::outstanding(&entry, &allocations);
        Ok(EntryAllocations {
            entry_id,
            allocations,
            outstanding,
        })
    }

    /// A student's full history in fold order with balances filled in.
    ///
    /// Stale cached balances are rewritten as a side effect.
    pub async fn compute_running_balances(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.require_student(student_id).await?;
        self.refresh_balances(student_id).await
    }

    /// Balance after the student's last entry, `{0, Nil}` if none.
    pub async fn current_balance(&self, student_id: StudentId) -> Result<CurrentBalance, LedgerError> {
        let ordered = self.compute_running_balances(student_id).await?;
        Ok(BalanceCalculator::current_balance(&ordered))
    }

    /// Read-only aggregate for UI and reports.
    pub async fn student_balance(&self, student_id: StudentId) -> Result<StudentBalance, LedgerError> {
        let ordered = self.compute_running_balances(student_id).await?;
        Ok(StudentBalance::from_ordered(student_id, &ordered))
    }

    /// One entry by id.
    pub async fn get_entry(&self, entry_id: LedgerEntryId) -> Result<LedgerEntry, LedgerError> {
        self.require_entry(entry_id).await
    }

    /// A page of entries, newest first. `per_page` is capped at the configured maximum.
    pub async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerEntry>, LedgerError> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to)
            && from > to
        {
            return Err(LedgerError::Validation(format!(
                "dateFrom {from} is after dateTo {to}"
            )));
        }

        let page = page.clamped(self.config.max_page_size);
        let (rows, total) = self.store.list_entries(filter, page).await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Aggregates by type across all students.
    pub async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        self.store.stats().await
    }

    async fn refresh_balances(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.store.entries_for_student(student_id).await?;
        let (ordered, updates) = BalanceCalculator::recompute(entries);
        if !updates.is_empty()
            && let Err(e) = self.store.update_balances(&updates).await
        {
            warn!(%student_id, error = %e, stale = updates.len(), "balance cache refresh failed");
        }
        Ok(ordered)
    }

    async fn with_fresh_balance(&self, entry: LedgerEntry) -> LedgerEntry {
        match self.refresh_balances(entry.student_id).await {
            Ok(ordered) => ordered.into_iter().find(|e| e.id == entry.id).unwrap_or(entry),
            Err(e) => {
                warn!(entry_id = %entry.id, error = %e, "could not recompute balance after posting");
                entry
            }
        }
    }
}
