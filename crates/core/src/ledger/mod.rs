//! Double-entry bookkeeping for student accounts.
//!
//! This module implements the student ledger:
//! - Entry and allocation records
//! - Entry number sequencing
//! - Running and current balance calculation
//! - Posting, reversal and allocation rules
//! - The store seam and an in-memory store
//! - The [`Ledger`] facade used by the API layer

pub mod allocation;
pub mod balance;
pub mod entry;
pub mod error;
pub mod memory;
pub mod posting;
pub mod reversal;
pub mod sequencer;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod service_props;

pub use allocation::{AllocationService, Outstanding};
pub use balance::{BalanceCalculator, BalanceUpdate, CurrentBalance, RunningBalance, StudentBalance};
pub use entry::{
    AMOUNT_LIMIT, Allocation, LedgerEntry, MAX_AMOUNT_SCALE, NewAllocation, NewLedgerEntry, check_amount,
    check_debit_credit,
};
pub use error::LedgerError;
pub use memory::InMemoryLedgerStore;
pub use posting::PostingService;
pub use reversal::{ReversalOutcome, ReversalService};
pub use sequencer::{AtomicSequencer, Sequencer};
pub use service::{EntryAllocations, Ledger};
pub use store::{EntryFilter, LedgerStats, LedgerStore, TypeStats};
pub use types::{AllocationSide, BalanceType, Direction, EntryType, PostingInput};
