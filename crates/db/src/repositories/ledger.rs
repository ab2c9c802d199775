//! PostgreSQL ledger store.
//!
//! Entry numbers come from the `ledger_entry_number_seq` sequence, drawn
//! inside the same transaction as the insert. Reversal flags the original
//! with a compare-and-set update, so two concurrent reversals of the same
//! entry cannot both commit.

use async_trait::async_trait;
use chrono::Utc;
use hostel_core::ledger::{
    Allocation, AllocationService, BalanceUpdate, EntryFilter, LedgerEntry, LedgerError,
    LedgerStats, LedgerStore, NewAllocation, NewLedgerEntry, TypeStats,
};
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, StudentId};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, Statement,
    TransactionTrait,
};
use tracing::{debug, warn};

use super::convert::{db_err, entry_active_model};
use crate::entities::sea_orm_active_enums::LedgerEntryType;
use crate::entities::{ledger_allocations, ledger_entries, students};

const NEXT_ENTRY_NUMBER_SQL: &str = "SELECT nextval('ledger_entry_number_seq') AS entry_number";

/// Per-type totals as returned by the stats query.
#[derive(Debug, FromQueryResult)]
struct TypeTotalsRow {
    entry_type: LedgerEntryType,
    count: i64,
    debit_total: Option<Decimal>,
    credit_total: Option<Decimal>,
}

/// Ledger store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Draws the next entry number within `txn`.
    async fn next_entry_number(txn: &DatabaseTransaction) -> Result<i64, LedgerError> {
        let row = txn
            .query_one(Statement::from_string(
                DbBackend::Postgres,
                NEXT_ENTRY_NUMBER_SQL,
            ))
            .await
            .map_err(|e| {
                warn!(error = %e, "entry number sequence unavailable");
                LedgerError::SequencerUnavailable
            })?
            .ok_or(LedgerError::SequencerUnavailable)?;

        row.try_get::<i64>("", "entry_number").map_err(|e| {
            warn!(error = %e, "entry number sequence returned no value");
            LedgerError::SequencerUnavailable
        })
    }

    async fn insert_entry(
        txn: &DatabaseTransaction,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry_number = Self::next_entry_number(txn).await?;
        let entry = entry.into_entry(entry_number, Utc::now());
        let model = entry_active_model(&entry).insert(txn).await.map_err(db_err)?;
        debug!(entry_id = %model.id, entry_number, "ledger entry inserted");
        Ok(model.into())
    }

    async fn allocations_touching<C: ConnectionTrait>(
        conn: &C,
        entry_id: LedgerEntryId,
    ) -> Result<Vec<Allocation>, LedgerError> {
        let id = entry_id.into_inner();
        let rows = ledger_allocations::Entity::find()
            .filter(
                Condition::any()
                    .add(ledger_allocations::Column::PaymentId.eq(id))
                    .add(ledger_allocations::Column::InvoiceId.eq(id)),
            )
            .order_by_asc(ledger_allocations::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Allocation::from).collect())
    }

    fn filtered(filter: &EntryFilter) -> Select<ledger_entries::Entity> {
        let mut query = ledger_entries::Entity::find();
        if let Some(student_id) = filter.student_id {
            query = query.filter(ledger_entries::Column::StudentId.eq(student_id.into_inner()));
        }
        if let Some(entry_type) = filter.entry_type {
            query = query.filter(ledger_entries::Column::EntryType.eq(LedgerEntryType::from(entry_type)));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(ledger_entries::Column::Date.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(ledger_entries::Column::Date.lte(to));
        }
        query
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn student_exists(&self, student_id: StudentId) -> Result<bool, LedgerError> {
        let count = students::Entity::find_by_id(student_id.into_inner())
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn append(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let student_id = entry.student_id;
        let known = students::Entity::find_by_id(student_id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?;
        if known.is_none() {
            return Err(LedgerError::StudentNotFound(student_id));
        }

        let entry = Self::insert_entry(&txn, entry).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(entry)
    }

    async fn append_reversal(
        &self,
        original_id: LedgerEntryId,
        reversal: NewLedgerEntry,
    ) -> Result<(LedgerEntry, LedgerEntry), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let id = original_id.into_inner();

        // Compare-and-set: only one caller can move the flag to true.
        let flagged = ledger_entries::Entity::update_many()
            .col_expr(ledger_entries::Column::IsReversed, Expr::value(true))
            .filter(ledger_entries::Column::Id.eq(id))
            .filter(ledger_entries::Column::IsReversed.eq(false))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if flagged.rows_affected == 0 {
            let exists = ledger_entries::Entity::find_by_id(id)
                .one(&txn)
                .await
                .map_err(db_err)?;
            return Err(match exists {
                Some(_) => LedgerError::AlreadyReversed(original_id),
                None => LedgerError::EntryNotFound(original_id),
            });
        }

        let reversal = Self::insert_entry(&txn, reversal).await?;
        let original = ledger_entries::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(original_id))?;

        txn.commit().await.map_err(db_err)?;
        Ok((original.into(), reversal))
    }

    async fn find_entry(&self, entry_id: LedgerEntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        let model = ledger_entries::Entity::find_by_id(entry_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(LedgerEntry::from))
    }

    async fn entries_for_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::StudentId.eq(student_id.into_inner()))
            .order_by_asc(ledger_entries::Column::Date)
            .order_by_asc(ledger_entries::Column::EntryNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), LedgerError> {
        let total = Self::filtered(filter).count(&self.db).await.map_err(db_err)?;

        let rows = Self::filtered(filter)
            .order_by_desc(ledger_entries::Column::Date)
            .order_by_desc(ledger_entries::Column::EntryNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok((rows.into_iter().map(LedgerEntry::from).collect(), total))
    }

    async fn update_balances(&self, updates: &[BalanceUpdate]) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        for update in updates {
            ledger_entries::ActiveModel {
                id: Unchanged(update.entry_id.into_inner()),
                balance: Set(update.balance),
                balance_type: Set(update.balance_type.into()),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;

        debug!(rows = updates.len(), "cached balances rewritten");
        Ok(())
    }

    async fn create_allocation(&self, allocation: NewAllocation) -> Result<Allocation, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Lock both sides in id order so concurrent allocations serialize
        // without deadlocking.
        let locked = ledger_entries::Entity::find()
            .filter(
                ledger_entries::Column::Id
                    .is_in([allocation.payment_id.into_inner(), allocation.invoice_id.into_inner()]),
            )
            .order_by_asc(ledger_entries::Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;

        let find = |id: LedgerEntryId| -> Result<LedgerEntry, LedgerError> {
            locked
                .iter()
                .find(|m| m.id == id.into_inner())
                .cloned()
                .map(LedgerEntry::from)
                .ok_or(LedgerError::EntryNotFound(id))
        };
        let payment = find(allocation.payment_id)?;
        let invoice = find(allocation.invoice_id)?;

        let payment_allocations = Self::allocations_touching(&txn, payment.id).await?;
        let invoice_allocations = Self::allocations_touching(&txn, invoice.id).await?;
        AllocationService::validate(
            &payment,
            &invoice,
            &payment_allocations,
            &invoice_allocations,
            allocation.amount,
        )?;

        let row = allocation.into_allocation(Utc::now());
        let model = ledger_allocations::ActiveModel {
            id: Set(row.id.into_inner()),
            payment_id: Set(row.payment_id.into_inner()),
            invoice_id: Set(row.invoice_id.into_inner()),
            allocated_amount: Set(row.allocated_amount),
            created_at: Set(row.created_at.into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(model.into())
    }

    async fn delete_allocation(&self, allocation_id: AllocationId) -> Result<Allocation, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let id = allocation_id.into_inner();

        let existing = ledger_allocations::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AllocationNotFound(allocation_id))?;

        ledger_allocations::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(existing.into())
    }

    async fn allocations_for_entry(&self, entry_id: LedgerEntryId) -> Result<Vec<Allocation>, LedgerError> {
        Self::allocations_touching(&self.db, entry_id).await
    }

    async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let rows: Vec<TypeTotalsRow> = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::EntryType)
            .column_as(Expr::col(ledger_entries::Column::Id).count(), "count")
            .column_as(Expr::col(ledger_entries::Column::Debit).sum(), "debit_total")
            .column_as(Expr::col(ledger_entries::Column::Credit).sum(), "credit_total")
            .group_by(ledger_entries::Column::EntryType)
            .into_model::<TypeTotalsRow>()
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let reversed = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::IsReversed.eq(true))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        let by_type = rows.into_iter().map(|row| TypeStats {
            entry_type: row.entry_type.into(),
            count: u64::try_from(row.count).unwrap_or_default(),
            debit_total: row.debit_total.unwrap_or_default(),
            credit_total: row.credit_total.unwrap_or_default(),
        });
        Ok(LedgerStats::from_type_rows(by_type, reversed))
    }
}

