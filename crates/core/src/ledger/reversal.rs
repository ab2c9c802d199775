//! Reversal service for cancelling posted entries.
//!
//! A reversal never edits or deletes the original. It posts a compensating
//! entry on the opposite side and flips the original's `is_reversed` flag,
//! so every historical balance before the reversal date stays correct.

use chrono::NaiveDate;
use hostel_shared::types::LedgerEntryId;
use serde::{Deserialize, Serialize};

use super::entry::{LedgerEntry, NewLedgerEntry};
use super::error::LedgerError;

/// The two entries touched by a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalOutcome {
    /// The original entry, now flagged reversed.
    pub original_entry: LedgerEntry,
    /// The compensating entry.
    pub reversal_entry: LedgerEntry,
}

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Trims the reason and rejects it if nothing is left.
    pub fn validate_reason(reason: &str) -> Result<&str, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::Validation(
                "A reason is required to reverse an entry".to_string(),
            ));
        }
        Ok(reason)
    }

    /// Checks that the entry is still in the `Posted` state and is not itself
    /// a reversal.
    pub fn check_reversible(entry: &LedgerEntry) -> Result<(), LedgerError> {
        if entry.is_reversed {
            return Err(LedgerError::AlreadyReversed(entry.id));
        }
        if entry.is_reversal() {
            return Err(LedgerError::CannotReverseReversal(entry.id));
        }
        Ok(())
    }

    /// Builds the compensating entry.
    ///
    /// - Debits become credits and credits become debits, same amount
    /// - Type and student are inherited
    /// - Dated `today`, never backdated to the original's date
    /// - `reference_id` and `reversal_of` both point at the original
    #[must_use]
    pub fn create_reversing_entry(
        original: &LedgerEntry,
        reversed_by: &str,
        reason: &str,
        today: NaiveDate,
    ) -> NewLedgerEntry {
        NewLedgerEntry {
            id: LedgerEntryId::new(),
            student_id: original.student_id,
            date: today,
            entry_type: original.entry_type,
            description: Self::describe(original, reversed_by, reason),
            debit: original.credit,
            credit: original.debit,
            reference_id: Some(original.id.into_inner()),
            reversal_of: Some(original.id),
        }
    }

    /// Statement text for a reversal entry.
    #[must_use]
    pub fn describe(original: &LedgerEntry, reversed_by: &str, reason: &str) -> String {
        format!(
            "Reversal of entry #{} ({}): {} by {}",
            original.entry_number, original.id, reason, reversed_by
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{BalanceType, EntryType};
    use chrono::Utc;
    use hostel_shared::types::StudentId;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn posted(debit: Decimal, credit: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            student_id: StudentId::new(),
            entry_number: 12,
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            entry_type: EntryType::Payment,
            description: "Cheque 00451".to_string(),
            debit,
            credit,
            balance: Decimal::ZERO,
            balance_type: BalanceType::Nil,
            reference_id: None,
            is_reversed: false,
            reversal_of: None,
            created_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(ReversalService::validate_reason("  bounced cheque ").unwrap(), "bounced cheque");
        assert!(matches!(
            ReversalService::validate_reason(" \t "),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_reversed_entry_is_not_reversible() {
        let mut entry = posted(Decimal::ZERO, dec!(15000));
        entry.is_reversed = true;
        assert!(matches!(
            ReversalService::check_reversible(&entry),
            Err(LedgerError::AlreadyReversed(id)) if id == entry.id
        ));
    }

    #[test]
    fn test_reversal_entry_is_not_reversible() {
        let mut entry = posted(dec!(15000), Decimal::ZERO);
        entry.reversal_of = Some(LedgerEntryId::new());
        assert!(matches!(
            ReversalService::check_reversible(&entry),
            Err(LedgerError::CannotReverseReversal(_))
        ));
    }

    #[test]
    fn test_create_reversing_entry() {
        let original = posted(Decimal::ZERO, dec!(15000));

        let reversal =
            ReversalService::create_reversing_entry(&original, "warden", "bounced cheque", today());

        assert_eq!(reversal.student_id, original.student_id);
        assert_eq!(reversal.entry_type, EntryType::Payment);
        assert_eq!(reversal.debit, dec!(15000));
        assert_eq!(reversal.credit, Decimal::ZERO);
        assert_eq!(reversal.date, today());
        assert_eq!(reversal.reversal_of, Some(original.id));
        assert_eq!(reversal.reference_id, Some(original.id.into_inner()));
        assert_eq!(
            reversal.description,
            format!("Reversal of entry #12 ({}): bounced cheque by warden", original.id)
        );
        assert_ne!(reversal.id, original.id);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property 3.1: Reversal cancels the original exactly**
        ///
        /// *For any* posted entry, original + reversal SHALL net to zero and the
        /// reversal SHALL sit on the opposite side.
        #[test]
        fn prop_reversal_nets_to_zero(cents in 1i64..1_000_000_000i64, is_debit in any::<bool>()) {
            let amount = Decimal::new(cents, 2);
            let original = if is_debit {
                posted(amount, Decimal::ZERO)
            } else {
                posted(Decimal::ZERO, amount)
            };

            let reversal = ReversalService::create_reversing_entry(&original, "system", "test", today());

            prop_assert_eq!(original.debit - original.credit + reversal.debit - reversal.credit, Decimal::ZERO);
            prop_assert_eq!(reversal.debit > Decimal::ZERO, original.credit > Decimal::ZERO);
        }
    }
}
