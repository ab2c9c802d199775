//! Entry number sequencing.
//!
//! Entry numbers are globally unique and strictly increasing across all
//! students. Gaps are tolerated; duplicates and regressions are not.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use super::error::LedgerError;

/// Issues entry numbers.
pub trait Sequencer: Send + Sync {
    /// Returns the next entry number.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SequencerUnavailable`] if no number can be issued.
    fn next(&self) -> Result<i64, LedgerError>;
}

/// In-process sequencer backed by an atomic counter.
///
/// Used by the in-memory store. The PostgreSQL store uses a database sequence
/// instead so numbering holds across service instances.
#[derive(Debug, Default)]
pub struct AtomicSequencer {
    last: AtomicI64,
    closed: AtomicBool,
}

impl AtomicSequencer {
    /// Creates a sequencer whose first number is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequencer that continues after an existing highest number.
    #[must_use]
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the most recently issued number (0 if none).
    #[must_use]
    pub fn last_issued(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }

    /// Makes every later `next()` fail, simulating an unavailable counter.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Sequencer for AtomicSequencer {
    fn next(&self) -> Result<i64, LedgerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LedgerError::SequencerUnavailable);
        }
        self.last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| LedgerError::SequencerUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_numbers_start_at_one_and_increase() {
        let sequencer = AtomicSequencer::new();
        assert_eq!(sequencer.next().unwrap(), 1);
        assert_eq!(sequencer.next().unwrap(), 2);
        assert_eq!(sequencer.last_issued(), 2);
    }

    #[test]
    fn test_starting_after_existing_number() {
        let sequencer = AtomicSequencer::starting_after(41);
        assert_eq!(sequencer.next().unwrap(), 42);
    }

    #[test]
    fn test_closed_sequencer_is_unavailable() {
        let sequencer = AtomicSequencer::new();
        sequencer.close();
        assert!(matches!(sequencer.next(), Err(LedgerError::SequencerUnavailable)));
    }

    #[test]
    fn test_exhausted_sequencer_is_unavailable() {
        let sequencer = AtomicSequencer::starting_after(i64::MAX);
        assert!(matches!(sequencer.next(), Err(LedgerError::SequencerUnavailable)));
        assert_eq!(sequencer.last_issued(), i64::MAX);
    }

    #[test]
    fn test_concurrent_callers_never_share_a_number() {
        let sequencer = AtomicSequencer::new();
        let per_thread = 500;

        let issued: Vec<Vec<i64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let numbers: Vec<i64> =
                            (0..per_thread).map(|_| sequencer.next().unwrap()).collect();
                        // Each caller sees its own numbers strictly increase.
                        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
                        numbers
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let all: Vec<i64> = issued.into_iter().flatten().collect();
        let unique: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), 8 * per_thread);
        assert_eq!(unique.len(), all.len());
        assert_eq!(sequencer.last_issued(), 4000);
    }
}
