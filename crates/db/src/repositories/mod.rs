//! Repository implementations for data access.

pub mod convert;
pub mod ledger;
pub mod student;

pub use ledger::LedgerRepository;
pub use student::StudentRepository;
