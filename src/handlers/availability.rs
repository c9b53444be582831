use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Slot;
use crate::services::availability::{compute_available_slots, AvailabilityInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub service_id: Option<i64>,
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub slots: Vec<Slot>,
}

// GET /api/businesses/:id/availability?service_id=&date=
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(business_id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    super::actor_from_headers(&headers)?;

    let (Some(service_id), Some(date_str)) = (query.service_id, query.date.as_deref()) else {
        return Err(AppError::Validation(
            "service_id and date are required".to_string(),
        ));
    };
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("malformed date: {date_str:?}")))?;

    let db = state.db.lock().unwrap();

    let business = queries::get_business(&db, business_id)?
        .ok_or_else(|| AppError::NotFound("business not found".to_string()))?;
    let settings = queries::get_settings(&db, business_id)?;
    let service = queries::get_service(&db, service_id, business_id)?
        .ok_or_else(|| AppError::Validation("service not found for business".to_string()))?;
    let staff_ids = queries::capable_staff_ids(&db, business_id, service_id)?;
    let bookings = queries::day_bookings(&db, business_id, date)?;

    let slots = compute_available_slots(&AvailabilityInput {
        opening_time: &business.opening_time,
        closing_time: &business.closing_time,
        settings: &settings,
        service_duration: service.duration_minutes,
        staff_ids: &staff_ids,
        bookings: &bookings,
        date,
        now: Utc::now(),
        business_offset: state.config.business_offset(),
    })?;

    Ok(Json(AvailabilityResponse {
        date: date_str.to_string(),
        slots,
    }))
}
