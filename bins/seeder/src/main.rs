//! Demo data seeder for local development.
//!
//! Registers a handful of students with fixed ids and posts a realistic
//! term of hostel activity for each: fees, payments, a discount, a late
//! penalty, a refund and one bounced cheque. Missing students are
//! registered first; a term is only posted for students with no entries yet,
//! so the seeder can be re-run safely.
//!
//! Usage: cargo run --bin seeder

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use hostel_core::ledger::{EntryType, Ledger, LedgerStore, PostingInput};
use hostel_db::{LedgerRepository, StudentRepository};
use hostel_shared::LedgerConfig;
use hostel_shared::types::StudentId;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Demo students (consistent ids across runs).
const STUDENTS: [(&str, &str); 3] = [
    ("00000000-0000-0000-0000-000000000101", "Asha Verma"),
    ("00000000-0000-0000-0000-000000000102", "Rahul Menon"),
    ("00000000-0000-0000-0000-000000000103", "Fatima Khan"),
];

/// Hostel fee for the term, in whole currency units.
const TERM_FEE: i64 = 15_000;
/// Monthly mess charge, in whole currency units.
const MESS_FEE: i64 = 3_200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = hostel_db::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let students = StudentRepository::new(db.clone());
    let ledger = Ledger::new(Arc::new(LedgerRepository::new(db)), LedgerConfig::default());

    for (index, (id, name)) in STUDENTS.iter().enumerate() {
        let student_id = StudentId::from_uuid(Uuid::from_str(id)?);
        if students.find_by_id(student_id).await?.is_none() {
            println!("Registering {name}...");
            students.register(student_id, name).await?;
        }

        if has_entries(&ledger, student_id).await? {
            println!("  {name} already has ledger entries, skipping...");
            continue;
        }

        println!("Seeding {name}...");
        seed_term(&ledger, student_id, index).await?;

        let balance = ledger.current_balance(student_id).await?;
        println!("  balance: {} {}", balance.amount, balance.balance_type.as_str());
    }

    println!("Seeding complete!");
    Ok(())
}

async fn has_entries(ledger: &Ledger, student: StudentId) -> anyhow::Result<bool> {
    Ok(!ledger.store().entries_for_student(student).await?.is_empty())
}

fn day(month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, month, day).context("invalid seed date")
}

/// Posts one term of activity. `variant` staggers the story per student.
async fn seed_term(ledger: &Ledger, student: StudentId, variant: usize) -> anyhow::Result<()> {
    let fee = Decimal::from(TERM_FEE);
    let mess = Decimal::from(MESS_FEE);

    let invoice = ledger
        .post(PostingInput::new(student, EntryType::Invoice, fee, "Hostel fee, monsoon term").on(day(7, 1)?))
        .await?;
    ledger
        .post(PostingInput::new(student, EntryType::Invoice, mess, "Mess charges, July").on(day(7, 1)?))
        .await?;

    match variant {
        0 => {
            let payment = ledger
                .post(PostingInput::new(student, EntryType::Payment, fee, "Bank transfer").on(day(7, 5)?))
                .await?;
            ledger.allocate(payment.id, invoice.id, fee).await?;
        }
        1 => {
            ledger
                .post(
                    PostingInput::new(student, EntryType::Discount, Decimal::from(1_500), "Merit scholarship")
                        .on(day(7, 3)?),
                )
                .await?;
            let cheque = ledger
                .post(PostingInput::new(student, EntryType::Payment, fee, "Cheque #204511").on(day(7, 8)?))
                .await?;
            ledger.reverse(cheque.id, Some("accounts"), "Cheque bounced").await?;
            ledger
                .post(
                    PostingInput::new(student, EntryType::Penalty, Decimal::from(250), "Bounced cheque fee")
                        .on(day(7, 12)?),
                )
                .await?;
        }
        _ => {
            let payment = ledger
                .post(PostingInput::new(student, EntryType::Payment, fee + mess, "UPI").on(day(7, 2)?))
                .await?;
            ledger.allocate(payment.id, invoice.id, fee).await?;
            ledger
                .post(
                    PostingInput::new(student, EntryType::Refund, Decimal::from(800), "Caution deposit refund credited")
                        .on(day(7, 20)?),
                )
                .await?;
        }
    }

    Ok(())
}
