// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    BookingListQuery, CreateBookingRequest, RescheduleRequest, SchedulingError, SlotQuery,
    StoreError,
};
use crate::services::booking::BookingService;
use crate::services::reminder::ReminderService;

/// Shared handler state. `config` also feeds the admin middleware.
#[derive(Clone)]
pub struct SchedulingState {
    pub bookings: Arc<BookingService>,
    pub reminders: Arc<ReminderService>,
    pub config: Arc<AppConfig>,
}

impl From<SchedulingError> for AppError {
    fn from(e: SchedulingError) -> Self {
        match e {
            SchedulingError::Validation(msg) => AppError::BadRequest(msg),
            SchedulingError::Rejected(reason) => AppError::Rejected {
                code: reason.code().to_string(),
                message: reason.message().to_string(),
            },
            SchedulingError::NotFound(msg) => AppError::NotFound(msg),
            SchedulingError::RetryableConflict(msg) => AppError::Conflict(msg),
            SchedulingError::Storage(StoreError::WriteConflict(msg)) => AppError::Conflict(msg),
            SchedulingError::Storage(StoreError::NotFound(msg)) => AppError::NotFound(msg),
            SchedulingError::Storage(other) => AppError::StorageUnavailable(other.to_string()),
        }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AssignPreviewQuery {
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_catalog(State(state): State<SchedulingState>) -> Result<Json<Value>, AppError> {
    let catalog = state.bookings.catalog().await?;

    Ok(Json(json!({
        "menus": catalog.menus,
        "staff": catalog.staff,
        "business_hours": catalog.business_hours
    })))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<SchedulingState>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let response = state.bookings.list_slots(query).await?;

    Ok(Json(json!({
        "date": response.date,
        "duration_minutes": response.duration_minutes,
        "total_slots": response.slots.len(),
        "slots": response.slots
    })))
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<SchedulingState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let created = state.bookings.create_booking(request).await?;

    Ok(Json(json!({
        "success": true,
        "booking_id": created.booking_id,
        "assigned_staff_id": created.assigned_staff_id,
        "start": created.start,
        "end": created.end,
        "reassigned": created.reassigned,
        "message": "Booking confirmed"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<SchedulingState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.bookings.reschedule_booking(booking_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "booking": outcome.booking,
        "changed_staff": outcome.changed_staff,
        "message": "Booking rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<SchedulingState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let booking = state.bookings.cancel_booking(booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking canceled"
    })))
}

#[axum::debug_handler]
pub async fn preview_assignment(
    State(state): State<SchedulingState>,
    Query(query): Query<AssignPreviewQuery>,
) -> Result<Json<Value>, AppError> {
    let choice = state
        .bookings
        .preview_assignment(query.start, query.duration_minutes)
        .await?;

    Ok(Json(json!({
        "available": choice.is_some(),
        "staff": choice
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_bookings(
    State(state): State<SchedulingState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state.bookings.list_bookings(query).await?;

    Ok(Json(json!({
        "bookings": page.bookings,
        "count": page.bookings.len(),
        "limit": page.limit,
        "offset": page.offset
    })))
}

#[axum::debug_handler]
pub async fn run_reminders(State(state): State<SchedulingState>) -> Result<Json<Value>, AppError> {
    let summary = state.reminders.send_reminders(Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "summary": summary
    })))
}
