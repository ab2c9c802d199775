//! In-memory ledger store.
//!
//! All state sits behind one async mutex, so every write method is trivially
//! atomic and serialized. Used by tests and local runs without PostgreSQL.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, StudentId};
use tokio::sync::Mutex;

use super::allocation::AllocationService;
use super::balance::BalanceUpdate;
use super::entry::{Allocation, LedgerEntry, NewAllocation, NewLedgerEntry};
use super::error::LedgerError;
use super::sequencer::{AtomicSequencer, Sequencer};
use super::store::{EntryFilter, LedgerStats, LedgerStore};

#[derive(Debug, Default)]
struct State {
    students: HashSet<StudentId>,
    entries: Vec<LedgerEntry>,
    index: HashMap<LedgerEntryId, usize>,
    allocations: BTreeMap<AllocationId, Allocation>,
}

impl State {
    fn entry(&self, id: LedgerEntryId) -> Option<&LedgerEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    fn push(&mut self, entry: LedgerEntry) {
        self.index.insert(entry.id, self.entries.len());
        self.entries.push(entry);
    }

    fn allocations_for(&self, entry_id: LedgerEntryId) -> Vec<Allocation> {
        self.allocations
            .values()
            .filter(|a| a.payment_id == entry_id || a.invoice_id == entry_id)
            .cloned()
            .collect()
    }
}

/// Ledger store held entirely in process memory.
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
    sequencer: Arc<dyn Sequencer>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    /// Creates an empty store numbering entries from 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sequencer(Arc::new(AtomicSequencer::new()))
    }

    /// Creates an empty store drawing entry numbers from `sequencer`.
    #[must_use]
    pub fn with_sequencer(sequencer: Arc<dyn Sequencer>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            sequencer,
        }
    }

    /// Makes a student known to the store.
    pub async fn register_student(&self, student_id: StudentId) {
        self.state.lock().await.students.insert(student_id);
    }

    /// Number of entries held, across all students.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn student_exists(&self, student_id: StudentId) -> Result<bool, LedgerError> {
        Ok(self.state.lock().await.students.contains(&student_id))
    }

    async fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        let mut state = self.state.lock().await;
        if !state.students.contains(&entry.student_id) {
            return Err(LedgerError::StudentNotFound(entry.student_id));
        }

        let entry_number = self.sequencer.next()?;
        let entry = entry.into_entry(entry_number, Utc::now());
        state.push(entry.clone());
        Ok(entry)
    }

    async fn append_reversal(
        &self,
        original_id: LedgerEntryId,
        reversal: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError> {
        let mut state = self.state.lock().await;
        let position = *state
            .index
            .get(&original_id)
            .ok_or(LedgerError::EntryNotFound(original_id))?;
        if state.entries[position].is_reversed {
            return Err(LedgerError::AlreadyReversed(original_id));
        }

        // Number first: if the sequencer fails nothing has been touched.
        let entry_number = self.sequencer.next()?;
        let reversal = reversal.into_entry(entry_number, Utc::now());

        state.entries[position].is_reversed = true;
        let original = state.entries[position].clone();
        state.push(reversal.clone());
        Ok((original, reversal))
    }

    async fn find_entry(&self, entry_id: LedgerEntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.state.lock().await.entry(entry_id).cloned())
    }

    async fn entries_for_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&LedgerEntry> =
            state.entries.iter().filter(|e| filter.matches(e)).collect();
        matching.sort_by(|a, b| (b.date, b.entry_number).cmp(&(a.date, a.entry_number)));

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let rows = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((rows, total))
    }

    async fn update_balances(&self, updates: &[BalanceUpdate]) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        for update in updates {
            if let Some(&i) = state.index.get(&update.entry_id) {
                state.entries[i].balance = update.balance;
                state.entries[i].balance_type = update.balance_type;
            }
        }
        Ok(())
    }

    async fn create_allocation(&self, allocation: NewAllocation) -> Result<Allocation, LedgerError> {
        let mut state = self.state.lock().await;
        let payment = state
            .entry(allocation.payment_id)
            .ok_or(LedgerError::EntryNotFound(allocation.payment_id))?;
        let invoice = state
            .entry(allocation.invoice_id)
            .ok_or(LedgerError::EntryNotFound(allocation.invoice_id))?;

        AllocationService::validate(
            payment,
            invoice,
            &state.allocations_for(payment.id),
            &state.allocations_for(invoice.id),
            allocation.amount,
        )?;

        let row = allocation.into_allocation(Utc::now());
        state.allocations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_allocation(&self, allocation_id: AllocationId) -> Result<Allocation, LedgerError> {
        self.state
            .lock()
            .await
            .allocations
            .remove(&allocation_id)
            .ok_or(LedgerError::AllocationNotFound(allocation_id))
    }

    async fn allocations_for_entry(&self, entry_id: LedgerEntryId) -> Result<Vec<Allocation>, LedgerError> {
        Ok(self.state.lock().await.allocations_for(entry_id))
    }

    async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        Ok(LedgerStats::from_entries(&self.state.lock().await.entries))
    }
}
