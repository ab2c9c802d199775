//! Student ledger schema.
//!
//! Creates students, the global entry number sequence, ledger entries and
//! payment-to-invoice allocations.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(STUDENTS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(LEDGER_ALLOCATIONS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
            DROP TABLE IF EXISTS ledger_allocations CASCADE;
            DROP TABLE IF EXISTS ledger_entries CASCADE;
            DROP SEQUENCE IF EXISTS ledger_entry_number_seq;
            DROP TABLE IF EXISTS students CASCADE;
            ",
        )
        .await?;
        Ok(())
    }
}

const STUDENTS_SQL: &str = r"
CREATE TABLE students (
    id UUID PRIMARY KEY,
    full_name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const LEDGER_ENTRIES_SQL: &str = r"
-- Entry numbers are global and strictly increasing. Gaps are allowed.
CREATE SEQUENCE ledger_entry_number_seq AS BIGINT START WITH 1 INCREMENT BY 1 NO CYCLE;

CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    student_id UUID NOT NULL REFERENCES students(id),
    entry_number BIGINT NOT NULL,
    date DATE NOT NULL,
    entry_type VARCHAR(16) NOT NULL,
    description TEXT NOT NULL,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    balance_type VARCHAR(3) NOT NULL DEFAULT 'Nil',
    reference_id UUID,
    is_reversed BOOLEAN NOT NULL DEFAULT false,
    reversal_of UUID REFERENCES ledger_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_ledger_entries_entry_number UNIQUE (entry_number),
    CONSTRAINT chk_entry_type CHECK (
        entry_type IN ('invoice', 'payment', 'discount', 'adjustment', 'refund', 'penalty')
    ),
    CONSTRAINT chk_balance_type CHECK (balance_type IN ('Dr', 'Cr', 'Nil')),
    CONSTRAINT chk_one_sided CHECK (
        debit >= 0 AND credit >= 0
        AND NOT (debit > 0 AND credit > 0)
        AND (debit > 0 OR credit > 0)
    ),
    CONSTRAINT chk_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_description_not_blank CHECK (length(trim(description)) > 0)
);

-- At most one reversal per original entry.
CREATE UNIQUE INDEX uq_ledger_entries_reversal_of
    ON ledger_entries(reversal_of) WHERE reversal_of IS NOT NULL;

-- Fold order for running balances.
CREATE INDEX idx_ledger_entries_student_order
    ON ledger_entries(student_id, date, entry_number);

CREATE INDEX idx_ledger_entries_type ON ledger_entries(entry_type);
CREATE INDEX idx_ledger_entries_date ON ledger_entries(date DESC, entry_number DESC);
";

const LEDGER_ALLOCATIONS_SQL: &str = r"
CREATE TABLE ledger_allocations (
    id UUID PRIMARY KEY,
    payment_id UUID NOT NULL REFERENCES ledger_entries(id),
    invoice_id UUID NOT NULL REFERENCES ledger_entries(id),
    allocated_amount NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_allocated_amount_positive CHECK (allocated_amount > 0),
    CONSTRAINT chk_allocation_distinct_sides CHECK (payment_id <> invoice_id)
);

CREATE INDEX idx_ledger_allocations_payment ON ledger_allocations(payment_id);
CREATE INDEX idx_ledger_allocations_invoice ON ledger_allocations(invoice_id);
";
