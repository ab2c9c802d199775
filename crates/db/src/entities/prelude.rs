//! `SeaORM` entity prelude.

pub use super::ledger_allocations::Entity as LedgerAllocations;
pub use super::ledger_entries::Entity as LedgerEntries;
pub use super::students::Entity as Students;
