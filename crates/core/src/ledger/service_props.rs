//! Property-based and scenario tests for the `Ledger` facade.
//!
//! Feature: student-ledger
//! - Property 6: Balance equals the signed sum of entries
//! - Property 7: Post + reverse round trip
//! - Property 8: Concurrent posts get distinct entry numbers
//! - Scenarios A-D: invoice, payment, bounced cheque, allocation after reversal

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use hostel_shared::LedgerConfig;
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, StudentId};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::balance::{BalanceUpdate, CurrentBalance};
use super::entry::{Allocation, LedgerEntry, NewAllocation, NewLedgerEntry};
use super::error::LedgerError;
use super::memory::InMemoryLedgerStore;
use super::sequencer::AtomicSequencer;
use super::service::Ledger;
use super::store::{EntryFilter, LedgerStats, LedgerStore};
use super::types::{AllocationSide, BalanceType, Direction, EntryType, PostingInput};

/// Helper to create a ledger over a fresh in-memory store with one student.
async fn ledger_with_student() -> (Ledger, StudentId) {
    let store = Arc::new(InMemoryLedgerStore::new());
    let student = StudentId::new();
    store.register_student(student).await;
    (Ledger::new(store, LedgerConfig::default()), student)
}

/// In-memory store that counts full history reads.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryLedgerStore,
    history_reads: AtomicUsize,
}

#[async_trait]
impl LedgerStore for CountingStore {
    async fn student_exists(&self, student_id: StudentId) -> Result<bool, LedgerError> {
        self.inner.student_exists(student_id).await
    }

    async fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        self.inner.append(entry).await
    }

    async fn append_reversal(
        &self,
        original_id: LedgerEntryId,
        reversal: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError> {
        self.inner.append_reversal(original_id, reversal).await
    }

    async fn find_entry(&self, entry_id: LedgerEntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        self.inner.find_entry(entry_id).await
    }

    async fn entries_for_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.history_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.entries_for_student(student_id).await
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError> {
        self.inner.list_entries(filter, page).await
    }

    async fn update_balances(&self, updates: &[BalanceUpdate]) -> Result<(), LedgerError> {
        self.inner.update_balances(updates).await
    }

    async fn create_allocation(&self, allocation: NewAllocation) -> Result<Allocation, LedgerError> {
        self.inner.create_allocation(allocation).await
    }

    async fn delete_allocation(&self, allocation_id: AllocationId) -> Result<Allocation, LedgerError> {
        self.inner.delete_allocation(allocation_id).await
    }

    async fn allocations_for_entry(&self, entry_id: LedgerEntryId) -> Result<Vec<Allocation>, LedgerError> {
        self.inner.allocations_for_entry(entry_id).await
    }

    async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        self.inner.stats().await
    }
}

fn balance(amount: Decimal, balance_type: BalanceType) -> CurrentBalance {
    CurrentBalance { amount, balance_type }
}

// =========================================================================
// Scenarios A-D
// =========================================================================

#[tokio::test]
async fn scenario_invoice_payment_bounce_and_allocation() {
    let (ledger, s1) = ledger_with_student().await;

    // A: invoice 15000 -> 15000 Dr
    let invoice = ledger
        .post(PostingInput::new(s1, EntryType::Invoice, dec!(15000), "Semester rent"))
        .await
        .unwrap();
    assert_eq!(invoice.balance, dec!(15000));
    assert_eq!(invoice.balance_type, BalanceType::Dr);
    assert_eq!(
        ledger.current_balance(s1).await.unwrap(),
        balance(dec!(15000), BalanceType::Dr)
    );

    // B: payment 15000 -> settled
    let payment = ledger
        .post(PostingInput::new(s1, EntryType::Payment, dec!(15000), "Cheque 00451"))
        .await
        .unwrap();
    assert_eq!(
        ledger.current_balance(s1).await.unwrap(),
        balance(Decimal::ZERO, BalanceType::Nil)
    );

    // D (before reversal): allocate the whole payment against the invoice.
    let allocation = ledger.allocate(payment.id, invoice.id, dec!(15000)).await.unwrap();

    // C: bounced cheque -> owed again, payment flagged.
    let outcome = ledger
        .reverse(payment.id, None, "bounced cheque")
        .await
        .unwrap();
    assert!(outcome.original_entry.is_reversed);
    assert_eq!(outcome.reversal_entry.reversal_of, Some(payment.id));
    assert_eq!(outcome.reversal_entry.debit, dec!(15000));
    assert!(outcome.reversal_entry.description.ends_with("bounced cheque by system"));
    assert_eq!(
        ledger.current_balance(s1).await.unwrap(),
        balance(dec!(15000), BalanceType::Dr)
    );
    assert!(ledger.get_entry(payment.id).await.unwrap().is_reversed);

    // D: reversal does not cascade, new allocations against the reversed
    // payment are refused, deallocation is still allowed.
    let allocations = ledger.allocations_for_entry(payment.id).await.unwrap();
    assert_eq!(allocations.allocations.len(), 1);
    assert!(matches!(
        ledger.allocate(payment.id, invoice.id, dec!(1)).await,
        Err(LedgerError::AlreadyReversed(id)) if id == payment.id
    ));
    let removed = ledger.deallocate(allocation.id).await.unwrap();
    assert_eq!(removed.allocated_amount, dec!(15000));
    assert!(
        ledger
            .allocations_for_entry(invoice.id)
            .await
            .unwrap()
            .allocations
            .is_empty()
    );
}

// =========================================================================
// Reversal
// =========================================================================

#[tokio::test]
async fn test_double_reversal_fails_and_original_is_untouched() {
    let (ledger, student) = ledger_with_student().await;
    let backdated = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
    let original = ledger
        .post(PostingInput::new(student, EntryType::Penalty, dec!(250), "Late fee").on(backdated))
        .await
        .unwrap();

    let first = ledger.reverse(original.id, Some("warden"), "waived").await.unwrap();
    let second = ledger.reverse(original.id, Some("warden"), "waived again").await;

    assert!(matches!(second, Err(LedgerError::AlreadyReversed(id)) if id == original.id));

    let after = ledger.get_entry(original.id).await.unwrap();
    assert_eq!(after.debit, original.debit);
    assert_eq!(after.credit, original.credit);
    assert_eq!(after.entry_number, original.entry_number);
    assert_eq!(after.date, original.date);
    assert!(after.is_reversed);

    // Reversal is dated today, not the original's date.
    assert_eq!(first.reversal_entry.date, Utc::now().date_naive());
    assert!(first.reversal_entry.entry_number > original.entry_number);
    assert_eq!(ledger.student_balance(student).await.unwrap().total_entries, 2);
}

#[tokio::test]
async fn test_reversal_requires_reason_and_existing_entry() {
    let (ledger, student) = ledger_with_student().await;
    let entry = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(10), "Laundry"))
        .await
        .unwrap();

    assert!(matches!(
        ledger.reverse(entry.id, None, "   ").await,
        Err(LedgerError::Validation(_))
    ));
    assert!(!ledger.get_entry(entry.id).await.unwrap().is_reversed);

    let missing = LedgerEntryId::new();
    assert!(matches!(
        ledger.reverse(missing, None, "typo").await,
        Err(LedgerError::EntryNotFound(id)) if id == missing
    ));
}

#[tokio::test]
async fn test_reversal_entry_cannot_be_reversed() {
    let (ledger, student) = ledger_with_student().await;
    let entry = ledger
        .post(PostingInput::new(student, EntryType::Discount, dec!(300), "Early bird"))
        .await
        .unwrap();
    let outcome = ledger.reverse(entry.id, None, "not eligible").await.unwrap();

    assert!(matches!(
        ledger.reverse(outcome.reversal_entry.id, None, "undo").await,
        Err(LedgerError::CannotReverseReversal(_))
    ));
}

#[tokio::test]
async fn test_blank_actor_falls_back_to_configured_system_actor() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let student = StudentId::new();
    store.register_student(student).await;
    let config = LedgerConfig {
        system_actor: "bursar-bot".to_string(),
        ..LedgerConfig::default()
    };
    let ledger = Ledger::new(store, config);

    let entry = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(10), "Key deposit"))
        .await
        .unwrap();
    let outcome = ledger.reverse(entry.id, Some("  "), "returned").await.unwrap();

    assert!(outcome.reversal_entry.description.ends_with("by bursar-bot"));
}

// =========================================================================
// Posting
// =========================================================================

#[tokio::test]
async fn test_post_rejects_before_writing() {
    let (ledger, student) = ledger_with_student().await;

    assert!(matches!(
        ledger
            .post(PostingInput::new(student, EntryType::Invoice, dec!(0), "Rent"))
            .await,
        Err(LedgerError::InvalidAmount(_))
    ));
    assert!(matches!(
        ledger
            .post(PostingInput::new(student, EntryType::Adjustment, dec!(5), "Fix"))
            .await,
        Err(LedgerError::Validation(_))
    ));
    let stranger = StudentId::new();
    assert!(matches!(
        ledger
            .post(PostingInput::new(stranger, EntryType::Invoice, dec!(5), "Rent"))
            .await,
        Err(LedgerError::StudentNotFound(id)) if id == stranger
    ));

    assert_eq!(ledger.stats().await.unwrap().total_entries, 0);
}

#[tokio::test]
async fn test_reverse_reads_history_once() {
    let store = Arc::new(CountingStore::default());
    let student = StudentId::new();
    store.inner.register_student(student).await;
    let ledger = Ledger::new(store.clone(), LedgerConfig::default());

    ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(900), "Rent"))
        .await
        .unwrap();
    let payment = ledger
        .post(PostingInput::new(student, EntryType::Payment, dec!(900), "Cheque"))
        .await
        .unwrap();

    store.history_reads.store(0, Ordering::SeqCst);
    let outcome = ledger.reverse(payment.id, None, "Cheque bounced").await.unwrap();

    assert_eq!(store.history_reads.load(Ordering::SeqCst), 1);
    assert!(outcome.original_entry.is_reversed);
    assert_eq!(outcome.original_entry.balance_type, BalanceType::Nil);
    assert_eq!(outcome.reversal_entry.balance, dec!(900));
    assert_eq!(outcome.reversal_entry.balance_type, BalanceType::Dr);
}

#[tokio::test]
async fn test_unstorable_amounts_leave_the_account_usable() {
    let (ledger, student) = ledger_with_student().await;

    for amount in [Decimal::MAX, dec!(1000000000000000), dec!(10.00005)] {
        assert!(matches!(
            ledger
                .post(PostingInput::new(student, EntryType::Invoice, amount, "Rent"))
                .await,
            Err(LedgerError::InvalidAmount(a)) if a == amount
        ));
    }
    assert_eq!(ledger.stats().await.unwrap().total_entries, 0);

    let invoice = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(999999999999999.9999), "Rent"))
        .await
        .unwrap();
    let payment = ledger
        .post(PostingInput::new(student, EntryType::Payment, dec!(100), "Cash"))
        .await
        .unwrap();
    assert!(matches!(
        ledger.allocate(payment.id, invoice.id, Decimal::MAX).await,
        Err(LedgerError::InvalidAmount(_))
    ));

    let balance = ledger.current_balance(student).await.unwrap();
    assert_eq!(balance.amount, dec!(999999999999899.9999));
    assert_eq!(balance.balance_type, BalanceType::Dr);
}

#[tokio::test]
async fn test_sequencer_failure_surfaces_as_posting_failed() {
    let sequencer = Arc::new(AtomicSequencer::new());
    let store = Arc::new(InMemoryLedgerStore::with_sequencer(sequencer.clone()));
    let student = StudentId::new();
    store.register_student(student).await;
    let ledger = Ledger::new(store.clone(), LedgerConfig::default());
    sequencer.close();

    let result = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(100), "Rent"))
        .await;

    assert!(matches!(result, Err(LedgerError::PostingFailed(_))));
    assert_eq!(store.entry_count().await, 0);
}

#[tokio::test]
async fn test_adjustment_direction_is_explicit() {
    let (ledger, student) = ledger_with_student().await;

    let credit = ledger
        .post_adjustment(student, dec!(40), "Overcharge correction", Direction::Credit)
        .await
        .unwrap();
    assert_eq!(credit.entry_type, EntryType::Adjustment);
    assert_eq!(credit.credit, dec!(40));
    assert_eq!(credit.balance_type, BalanceType::Cr);
}

#[tokio::test]
async fn test_backdated_post_refreshes_cached_balances() {
    let (ledger, student) = ledger_with_student().await;
    let day = |d: u32| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();

    let rent = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(1000), "Rent").on(day(1)))
        .await
        .unwrap();
    let payment = ledger
        .post(PostingInput::new(student, EntryType::Payment, dec!(1000), "Cash").on(day(20)))
        .await
        .unwrap();
    assert_eq!(payment.balance_type, BalanceType::Nil);

    // Backdated fine between the two.
    let fine = ledger
        .post(PostingInput::new(student, EntryType::Penalty, dec!(50), "Noise").on(day(10)))
        .await
        .unwrap();
    assert_eq!(fine.balance, dec!(1050));

    // The later payment's cache was rewritten.
    let cached = ledger.get_entry(payment.id).await.unwrap();
    assert_eq!(cached.balance, dec!(50));
    assert_eq!(cached.balance_type, BalanceType::Dr);
    assert_eq!(ledger.get_entry(rent.id).await.unwrap().balance, dec!(1000));

    let history = ledger.compute_running_balances(student).await.unwrap();
    let order: Vec<LedgerEntryId> = history.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![rent.id, fine.id, payment.id]);
}

// =========================================================================
// Allocation
// =========================================================================

#[tokio::test]
async fn test_allocation_bounds_on_both_sides() {
    let (ledger, student) = ledger_with_student().await;
    let invoice = ledger
        .post(PostingInput::new(student, EntryType::Invoice, dec!(500), "Rent"))
        .await
        .unwrap();
    let payment = ledger
        .post(PostingInput::new(student, EntryType::Payment, dec!(300), "Transfer"))
        .await
        .unwrap();

    ledger.allocate(payment.id, invoice.id, dec!(200)).await.unwrap();

    let err = ledger.allocate(payment.id, invoice.id, dec!(150)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::OverAllocation { side: AllocationSide::Payment, available, .. }
            if available == dec!(100)
    ));

    let summary = ledger.allocations_for_entry(invoice.id).await.unwrap();
    assert_eq!(summary.outstanding.outstanding, dec!(300));
    assert!(matches!(
        ledger.allocate(payment.id, invoice.id, dec!(-1)).await,
        Err(LedgerError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn test_allocation_across_students_is_rejected() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let (a, b) = (StudentId::new(), StudentId::new());
    store.register_student(a).await;
    store.register_student(b).await;
    let ledger = Ledger::new(store, LedgerConfig::default());

    let invoice = ledger
        .post(PostingInput::new(a, EntryType::Invoice, dec!(100), "Rent"))
        .await
        .unwrap();
    let payment = ledger
        .post(PostingInput::new(b, EntryType::Payment, dec!(100), "Cash"))
        .await
        .unwrap();

    assert!(matches!(
        ledger.allocate(payment.id, invoice.id, dec!(10)).await,
        Err(LedgerError::StudentMismatch { .. })
    ));
}

// =========================================================================
// Queries
// =========================================================================

#[tokio::test]
async fn test_list_entries_filters_and_caps_page_size() {
    let (ledger, student) = ledger_with_student().await;
    let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    for i in 0..5u64 {
        let date = start.checked_add_days(Days::new(i)).unwrap();
        ledger
            .post(PostingInput::new(student, EntryType::Invoice, dec!(10), "Meal").on(date))
            .await
            .unwrap();
    }
    ledger
        .post(PostingInput::new(student, EntryType::Payment, dec!(10), "Cash").on(start))
        .await
        .unwrap();

    let filter = EntryFilter {
        student_id: Some(student),
        entry_type: Some(EntryType::Invoice),
        date_from: start.checked_add_days(Days::new(1)),
        date_to: None,
    };
    let page = ledger
        .list_entries(&filter, PageRequest::new(1, 1000))
        .await
        .unwrap();

    assert_eq!(page.meta.total, 4);
    assert_eq!(page.meta.per_page, 100);
    assert_eq!(page.data.len(), 4);
    assert!(page.data.windows(2).all(|w| w[0].date > w[1].date));

    let inverted = EntryFilter {
        date_from: NaiveDate::from_ymd_opt(2025, 3, 1),
        date_to: NaiveDate::from_ymd_opt(2025, 2, 1),
        ..EntryFilter::default()
    };
    assert!(matches!(
        ledger.list_entries(&inverted, PageRequest::default()).await,
        Err(LedgerError::Validation(_))
    ));
}

#[tokio::test]
async fn test_unknown_student_balance_is_not_found() {
    let (ledger, _) = ledger_with_student().await;
    assert!(matches!(
        ledger.student_balance(StudentId::new()).await,
        Err(LedgerError::StudentNotFound(_))
    ));
}

#[tokio::test]
async fn test_student_without_entries_is_nil() {
    let (ledger, student) = ledger_with_student().await;
    let view = ledger.student_balance(student).await.unwrap();
    assert_eq!(view.current_balance, Decimal::ZERO);
    assert_eq!(view.balance_type, BalanceType::Nil);
    assert_eq!(view.total_entries, 0);
}

// =========================================================================
// Property 8: Concurrent posts get distinct entry numbers
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_get_distinct_entry_numbers() {
    let store = Arc::new(InMemoryLedgerStore::new());
    let students: Vec<StudentId> = (0..4).map(|_| StudentId::new()).collect();
    for s in &students {
        store.register_student(*s).await;
    }
    let ledger = Arc::new(Ledger::new(store, LedgerConfig::default()));

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let student = students[i % students.len()];
            tokio::spawn(async move {
                ledger
                    .post(PostingInput::new(student, EntryType::Invoice, dec!(1), "Snack"))
                    .await
                    .map(|e| e.entry_number)
            })
        })
        .collect();

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        assert!(numbers.insert(number), "entry number {number} issued twice");
    }
    assert_eq!(numbers.len(), 64);
    assert_eq!(numbers.iter().copied().max(), Some(64));
}

// =========================================================================
// Properties 6 and 7
// =========================================================================

/// Strategy for one posting: type, amount (0.01 to 100,000.00), day offset.
fn posting_strategy() -> impl Strategy<Value = (EntryType, Decimal, u64)> {
    (
        prop::sample::select(vec![
            EntryType::Invoice,
            EntryType::Payment,
            EntryType::Discount,
            EntryType::Refund,
            EntryType::Penalty,
        ]),
        (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        0u64..60,
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// **Property 6: Balance equals the signed sum of entries**
    ///
    /// *For any* sequence of postings (dates in any order), the current
    /// balance SHALL equal |Σ debit - Σ credit| with the sign-derived type,
    /// and every stored entry SHALL be debit XOR credit.
    #[test]
    fn prop_balance_equals_signed_sum(postings in prop::collection::vec(posting_strategy(), 1..25)) {
        let (current, entries) = runtime().block_on(async {
            let (ledger, student) = ledger_with_student().await;
            for (entry_type, amount, offset) in &postings {
                let date = base_date().checked_add_days(Days::new(*offset)).unwrap();
                ledger
                    .post(PostingInput::new(student, *entry_type, *amount, "generated").on(date))
                    .await
                    .unwrap();
            }
            (
                ledger.current_balance(student).await.unwrap(),
                ledger.compute_running_balances(student).await.unwrap(),
            )
        });

        let signed: Decimal = entries.iter().map(|e| e.debit - e.credit).sum();
        prop_assert_eq!(current.amount, signed.abs());
        prop_assert_eq!(current.balance_type, BalanceType::from_signed(signed));
        for e in &entries {
            prop_assert!((e.debit > Decimal::ZERO) ^ (e.credit > Decimal::ZERO));
        }
    }

    /// **Property 7: Post + reverse round trip**
    ///
    /// *For any* history and any new entry E, reversing E SHALL restore the
    /// balance the student had immediately before E was posted.
    #[test]
    fn prop_post_then_reverse_restores_balance(
        history in prop::collection::vec(posting_strategy(), 0..10),
        extra in posting_strategy(),
    ) {
        let (before, after) = runtime().block_on(async {
            let (ledger, student) = ledger_with_student().await;
            for (entry_type, amount, offset) in &history {
                let date = base_date().checked_add_days(Days::new(*offset)).unwrap();
                ledger
                    .post(PostingInput::new(student, *entry_type, *amount, "history").on(date))
                    .await
                    .unwrap();
            }
            let before = ledger.current_balance(student).await.unwrap();

            let (entry_type, amount, _) = extra;
            let posted = ledger
                .post(PostingInput::new(student, entry_type, amount, "to be reversed"))
                .await
                .unwrap();
            ledger.reverse(posted.id, None, "round trip").await.unwrap();

            (before, ledger.current_balance(student).await.unwrap())
        });

        prop_assert_eq!(before, after);
    }
}
