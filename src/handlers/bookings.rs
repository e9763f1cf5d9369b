use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::access::{self, BookingScope, Identity};
use crate::services::bookings::allocate_booking_id;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub booking_id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub amount: f64,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderSummary>,
}

#[derive(Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub location: String,
    pub rating: f64,
}

impl BookingResponse {
    fn from_booking(booking: &Booking) -> Self {
        Self {
            id: booking.id.clone(),
            booking_id: booking.booking_id.clone(),
            customer_id: booking.customer_id.clone(),
            provider_id: booking.provider_id.clone(),
            service: booking.service.clone(),
            date: booking.date.clone(),
            time: booking.time.clone(),
            location: booking.location.clone(),
            amount: booking.amount,
            status: booking.status.as_str().to_string(),
            created_at: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            provider: None,
        }
    }

    fn from_record(record: &queries::BookingRecord) -> Self {
        let mut response = Self::from_booking(&record.booking);
        response.provider = Some(ProviderSummary {
            name: record.provider_name.clone(),
            location: record.provider_location.clone(),
            rating: record.provider_rating,
        });
        response
    }
}

#[derive(Serialize)]
pub struct BookingListResponse {
    pub message: String,
    pub bookings: Vec<BookingResponse>,
}

// POST /api/bookings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub provider_id: Option<String>,
    pub service: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub amount: Option<f64>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let provider_id = required(req.provider_id.as_deref(), "providerId")?;
    let service = required(req.service.as_deref(), "service")?;
    let date = required(req.date.as_deref(), "date")?;
    let time = required(req.time.as_deref(), "time")?;
    let location = required(req.location.as_deref(), "location")?;
    let amount = req
        .amount
        .ok_or_else(|| AppError::Validation("amount is required".to_string()))?;

    let booking = {
        let db = state.db.lock().unwrap();

        if queries::get_provider_by_id(&db, provider_id)?.is_none() {
            return Err(AppError::NotFound(format!("provider {provider_id}")));
        }

        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            booking_id: allocate_booking_id(&db)?,
            customer_id: identity.user_id.clone(),
            provider_id: provider_id.to_string(),
            service: service.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            location: location.to_string(),
            amount,
            status: BookingStatus::Pending,
            created_at: Utc::now().naive_utc(),
        };
        queries::create_booking(&db, &booking)?;
        booking
    };

    tracing::info!("booking {} created for provider {provider_id}", booking.booking_id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "booking created",
            "booking": BookingResponse::from_booking(&booking),
        })),
    ))
}

// GET /api/bookings/my-bookings
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<BookingListResponse>, AppError> {
    let records = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_customer(&db, &identity.user_id)?
    };

    Ok(Json(BookingListResponse {
        message: "ok".to_string(),
        bookings: records.iter().map(BookingResponse::from_record).collect(),
    }))
}

// GET /api/bookings
pub async fn list_all(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<BookingListResponse>, AppError> {
    let records = {
        let db = state.db.lock().unwrap();
        match access::booking_list_scope(&db, &identity)? {
            BookingScope::Mine(provider_id) => {
                queries::get_bookings_for_provider(&db, &provider_id)?
            }
            BookingScope::All => queries::get_all_bookings(&db)?,
        }
    };

    Ok(Json(BookingListResponse {
        message: "ok".to_string(),
        bookings: records.iter().map(BookingResponse::from_record).collect(),
    }))
}

// PATCH /api/bookings/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(booking_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status_raw = required(req.status.as_deref(), "status")?;
    let next = BookingStatus::parse(status_raw).ok_or_else(|| {
        AppError::Validation(format!("unknown booking status: {status_raw}"))
    })?;

    let booking = {
        let db = state.db.lock().unwrap();

        let mut booking = queries::get_booking_by_public_id(&db, &booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        let provider = queries::get_provider_by_id(&db, &booking.provider_id)?
            .ok_or_else(|| AppError::NotFound(format!("provider {}", booking.provider_id)))?;

        if !access::may_update_booking(&identity, &booking, &provider.user_id) {
            return Err(AppError::Forbidden(
                "only the booking's customer or provider may update it".to_string(),
            ));
        }

        if !booking.status.can_transition_to(next) {
            return Err(AppError::Validation(format!(
                "cannot move booking from {} to {}",
                booking.status.as_str(),
                next.as_str()
            )));
        }

        queries::update_booking_status(&db, &booking_id, next)?;
        booking.status = next;
        booking
    };

    Ok(Json(serde_json::json!({
        "message": "booking updated",
        "booking": BookingResponse::from_booking(&booking),
    })))
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}
