//! Ledger error types for validation, state and storage errors.
//!
//! Every error is detected before any write where possible. Storage-class
//! failures during a post or reversal are folded into
//! [`LedgerError::PostingFailed`] / [`LedgerError::ReversalFailed`] so callers
//! can tell "nothing was written" apart from a domain rejection.

use hostel_shared::types::{AllocationId, LedgerEntryId, StudentId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::AllocationSide;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount must be strictly positive, below 10^15 and carry at most
    /// four decimal places.
    #[error("Amount must be greater than zero, below 10^15 and have at most 4 decimal places, got {0}")]
    InvalidAmount(Decimal),

    /// A required field is missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== Lookup Errors ==========
    /// Student not found.
    #[error("Student not found: {0}")]
    StudentNotFound(StudentId),

    /// Ledger entry not found.
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(LedgerEntryId),

    /// Allocation not found.
    #[error("Allocation not found: {0}")]
    AllocationNotFound(AllocationId),

    // ========== State Errors ==========
    /// Entry has already been reversed.
    #[error("Ledger entry {0} has already been reversed")]
    AlreadyReversed(LedgerEntryId),

    /// Reversal entries cannot themselves be reversed.
    #[error("Ledger entry {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(LedgerEntryId),

    /// Payment and invoice belong to different students.
    #[error("Payment belongs to student {payment_student}, invoice belongs to student {invoice_student}")]
    StudentMismatch {
        /// Owner of the payment entry.
        payment_student: StudentId,
        /// Owner of the invoice entry.
        invoice_student: StudentId,
    },

    /// Allocation would exceed the outstanding amount on one side.
    #[error("Cannot allocate {requested}: only {available} remains on the {side}")]
    OverAllocation {
        /// The side that ran out of room.
        side: AllocationSide,
        /// The requested allocation amount.
        requested: Decimal,
        /// What was still available on that side.
        available: Decimal,
    },

    // ========== Storage Errors ==========
    /// Entry number counter is unavailable.
    #[error("Entry number sequencer is unavailable")]
    SequencerUnavailable,

    /// Posting did not commit; no entry was written.
    #[error("Posting failed: {0}")]
    PostingFailed(String),

    /// Reversal did not commit; neither entry was changed.
    #[error("Reversal failed: {0}")]
    ReversalFailed(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StudentNotFound(_) => "STUDENT_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AllocationNotFound(_) => "ALLOCATION_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::StudentMismatch { .. } => "STUDENT_MISMATCH",
            Self::OverAllocation { .. } => "OVER_ALLOCATION",
            Self::SequencerUnavailable => "SEQUENCER_UNAVAILABLE",
            Self::PostingFailed(_) => "POSTING_FAILED",
            Self::ReversalFailed(_) => "REVERSAL_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::Validation(_) => 400,

            // 404 Not Found
            Self::StudentNotFound(_) | Self::EntryNotFound(_) | Self::AllocationNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::AlreadyReversed(_) | Self::CannotReverseReversal(_) => 409,

            // 422 Unprocessable - well-formed but violates an allocation invariant
            Self::StudentMismatch { .. } | Self::OverAllocation { .. } => 422,

            // 503 Service Unavailable
            Self::SequencerUnavailable => 503,

            // 500 Internal Server Error
            Self::PostingFailed(_) | Self::ReversalFailed(_) | Self::Database(_) => 500,
        }
    }

    /// Returns true for failures of the underlying store rather than of the request.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::SequencerUnavailable | Self::Database(_))
    }

    /// Folds storage failures into [`LedgerError::PostingFailed`].
    #[must_use]
    pub fn into_posting_failure(self) -> Self {
        if self.is_storage_failure() {
            Self::PostingFailed(self.to_string())
        } else {
            self
        }
    }

    /// Folds storage failures into [`LedgerError::ReversalFailed`].
    #[must_use]
    pub fn into_reversal_failure(self) -> Self {
        if self.is_storage_failure() {
            Self::ReversalFailed(self.to_string())
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::InvalidAmount(dec!(0)).error_code(), "INVALID_AMOUNT");
        assert_eq!(
            LedgerError::AlreadyReversed(LedgerEntryId::new()).error_code(),
            "ALREADY_REVERSED"
        );
        assert_eq!(
            LedgerError::OverAllocation {
                side: AllocationSide::Invoice,
                requested: dec!(10),
                available: dec!(5),
            }
            .error_code(),
            "OVER_ALLOCATION"
        );
        assert_eq!(LedgerError::SequencerUnavailable.error_code(), "SEQUENCER_UNAVAILABLE");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::Validation("reason".into()).http_status_code(), 400);
        assert_eq!(LedgerError::StudentNotFound(StudentId::new()).http_status_code(), 404);
        assert_eq!(
            LedgerError::CannotReverseReversal(LedgerEntryId::new()).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::StudentMismatch {
                payment_student: StudentId::new(),
                invoice_student: StudentId::new(),
            }
            .http_status_code(),
            422
        );
        assert_eq!(LedgerError::SequencerUnavailable.http_status_code(), 503);
        assert_eq!(LedgerError::Database("down".into()).http_status_code(), 500);
    }

    #[test]
    fn test_storage_failures_fold_into_posting_failed() {
        let err = LedgerError::SequencerUnavailable.into_posting_failure();
        assert!(matches!(err, LedgerError::PostingFailed(msg) if msg.contains("sequencer")));

        let err = LedgerError::Database("connection reset".into()).into_reversal_failure();
        assert!(matches!(err, LedgerError::ReversalFailed(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_domain_errors_pass_through_unchanged() {
        let id = LedgerEntryId::new();
        let err = LedgerError::AlreadyReversed(id).into_reversal_failure();
        assert!(matches!(err, LedgerError::AlreadyReversed(e) if e == id));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::OverAllocation {
            side: AllocationSide::Payment,
            requested: dec!(200.00),
            available: dec!(150.00),
        };
        assert_eq!(
            err.to_string(),
            "Cannot allocate 200.00: only 150.00 remains on the payment"
        );
    }
}
