//! Student ledger routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use hostel_core::ledger::{Direction, EntryFilter, EntryType, PostingInput};
use hostel_shared::types::{AllocationId, LedgerEntryId, PageRequest, PageResponse, StudentId};
use tracing::info;

use super::dto::{
    AdjustmentRequest, AllocateRequest, AllocationResponse, BalanceResponse, EntryAllocationsResponse,
    EntryResponse, ListEntriesQuery, PostEntryRequest, ReversalResponse, ReverseRequest,
    StatsResponse, StudentLedgerResponse,
};
use crate::AppState;
use crate::error::ApiError;

/// Creates the ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ledgers", get(list_entries).post(post_entry))
        .route("/ledgers/stats", get(ledger_stats))
        .route("/ledgers/adjustment", post(post_adjustment))
        .route("/ledgers/allocations", post(allocate))
        .route("/ledgers/allocations/{allocation_id}", delete(deallocate))
        .route("/ledgers/student/{student_id}", get(student_ledger))
        .route("/ledgers/student/{student_id}/balance", get(student_balance))
        .route("/ledgers/{entry_id}", get(get_entry))
        .route("/ledgers/{entry_id}/reverse", post(reverse_entry))
        .route("/ledgers/{entry_id}/allocations", get(entry_allocations))
}

/// GET `/ledgers` - Page through entries, newest first.
async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<ListEntriesQuery>,
) -> Result<Json<PageResponse<EntryResponse>>, ApiError> {
    let entry_type = query
        .entry_type
        .as_deref()
        .map(str::parse::<EntryType>)
        .transpose()?;
    let filter = EntryFilter {
        student_id: query.student_id,
        entry_type,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query
            .limit
            .unwrap_or(state.ledger.config().default_page_size),
    );

    let page = state.ledger.list_entries(&filter, page).await?;
    Ok(Json(page.map(EntryResponse::from)))
}

/// GET `/ledgers/stats` - Totals by entry type across all students.
async fn ledger_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(state.ledger.stats().await?.into()))
}

/// GET `/ledgers/student/{student_id}` - Full history with running balances.
async fn student_ledger(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Json<StudentLedgerResponse>, ApiError> {
    let entries = state.ledger.compute_running_balances(student_id).await?;
    Ok(Json(StudentLedgerResponse {
        student_id,
        entries: entries.into_iter().map(Into::into).collect(),
    }))
}

/// GET `/ledgers/student/{student_id}/balance` - Balance summary.
async fn student_balance(
    State(state): State<AppState>,
    Path(student_id): Path<StudentId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    Ok(Json(state.ledger.student_balance(student_id).await?.into()))
}

/// GET `/ledgers/{entry_id}` - One entry.
async fn get_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<LedgerEntryId>,
) -> Result<Json<EntryResponse>, ApiError> {
    Ok(Json(state.ledger.get_entry(entry_id).await?.into()))
}

/// POST `/ledgers` - Post an entry of any type.
async fn post_entry(
    State(state): State<AppState>,
    Json(req): Json<PostEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let entry_type: EntryType = req.entry_type.parse()?;
    let mut input = PostingInput::new(req.student_id, entry_type, req.amount, req.description);
    if let Some(date) = req.date {
        input = input.on(date);
    }
    if let Some(reference_id) = req.reference_id {
        input = input.reference(reference_id);
    }
    if let Some(direction) = req.direction.as_deref() {
        input = input.direction(direction.parse()?);
    }

    let entry = state.ledger.post(input).await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST `/ledgers/adjustment` - Post an adjustment in an explicit direction.
async fn post_adjustment(
    State(state): State<AppState>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let direction: Direction = req.direction.parse()?;
    let entry = state
        .ledger
        .post_adjustment(req.student_id, req.amount, req.description, direction)
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// POST `/ledgers/{entry_id}/reverse` - Reverse an entry.
async fn reverse_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<LedgerEntryId>,
    Json(req): Json<ReverseRequest>,
) -> Result<(StatusCode, Json<ReversalResponse>), ApiError> {
    let outcome = state
        .ledger
        .reverse(entry_id, req.reversed_by.as_deref(), &req.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// POST `/ledgers/allocations` - Apply part of a payment to an invoice.
async fn allocate(
    State(state): State<AppState>,
    Json(req): Json<AllocateRequest>,
) -> Result<(StatusCode, Json<AllocationResponse>), ApiError> {
    let allocation = state
        .ledger
        .allocate(req.payment_id, req.invoice_id, req.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(allocation.into())))
}

/// DELETE `/ledgers/allocations/{allocation_id}` - Remove an allocation.
async fn deallocate(
    State(state): State<AppState>,
    Path(allocation_id): Path<AllocationId>,
) -> Result<Json<AllocationResponse>, ApiError> {
    let removed = state.ledger.deallocate(allocation_id).await?;
    info!(%allocation_id, "allocation deleted via api");
    Ok(Json(removed.into()))
}

/// GET `/ledgers/{entry_id}/allocations` - Allocations and outstanding amount.
async fn entry_allocations(
    State(state): State<AppState>,
    Path(entry_id): Path<LedgerEntryId>,
) -> Result<Json<EntryAllocationsResponse>, ApiError> {
    Ok(Json(state.ledger.allocations_for_entry(entry_id).await?.into()))
}
