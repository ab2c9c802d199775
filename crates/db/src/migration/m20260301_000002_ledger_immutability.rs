//! Ledger immutability triggers.
//!
//! Once written, an entry's amounts, number, date, owner, type and lineage
//! never change, the reversed flag only moves from false to true, and rows
//! are never deleted. Only the cached balance columns may be rewritten.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(IMMUTABILITY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
            DROP TRIGGER IF EXISTS trg_ledger_entries_no_delete ON ledger_entries;
            DROP TRIGGER IF EXISTS trg_ledger_entries_immutable ON ledger_entries;
            DROP FUNCTION IF EXISTS prevent_ledger_entry_delete();
            DROP FUNCTION IF EXISTS prevent_ledger_entry_modification();
            ",
        )
        .await?;
        Ok(())
    }
}

const IMMUTABILITY_SQL: &str = r"
CREATE OR REPLACE FUNCTION prevent_ledger_entry_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.debit IS DISTINCT FROM OLD.debit
        OR NEW.credit IS DISTINCT FROM OLD.credit
        OR NEW.entry_number IS DISTINCT FROM OLD.entry_number
        OR NEW.date IS DISTINCT FROM OLD.date
        OR NEW.student_id IS DISTINCT FROM OLD.student_id
        OR NEW.entry_type IS DISTINCT FROM OLD.entry_type
        OR NEW.description IS DISTINCT FROM OLD.description
        OR NEW.reference_id IS DISTINCT FROM OLD.reference_id
        OR NEW.reversal_of IS DISTINCT FROM OLD.reversal_of
    THEN
        RAISE EXCEPTION 'Ledger entry % is immutable', OLD.id;
    END IF;

    IF OLD.is_reversed AND NOT NEW.is_reversed THEN
        RAISE EXCEPTION 'Ledger entry % cannot be un-reversed', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_entries_immutable
    BEFORE UPDATE ON ledger_entries
    FOR EACH ROW EXECUTE FUNCTION prevent_ledger_entry_modification();

CREATE OR REPLACE FUNCTION prevent_ledger_entry_delete()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger entry % cannot be deleted', OLD.id;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledger_entries_no_delete
    BEFORE DELETE ON ledger_entries
    FOR EACH ROW EXECUTE FUNCTION prevent_ledger_entry_delete();
";
