use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries::{self, AppointmentView};
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::assigner::CreatedAppointment;
use crate::services::booking::{self, CreateRequest, Role};
use crate::state::AppState;

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateRequest>,
) -> Result<(StatusCode, Json<CreatedAppointment>), AppError> {
    let actor = super::actor_from_headers(&headers)?;

    let mut db = state.db.lock().unwrap();
    let created = booking::create_appointment(
        &mut db,
        state.config.business_offset(),
        &request,
        &actor,
        Utc::now(),
    )?;

    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/appointments/my
pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let actor = super::actor_from_headers(&headers)?;

    let db = state.db.lock().unwrap();
    let appointments = match actor.role {
        Role::Customer => queries::appointments_for_customer(&db, actor.user_id)?,
        Role::BusinessOwner => queries::appointments_for_owner(&db, actor.user_id)?,
    };

    Ok(Json(appointments))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

// PUT /api/appointments/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    let actor = super::actor_from_headers(&headers)?;

    let new_status = body
        .status
        .as_deref()
        .and_then(AppointmentStatus::parse)
        .ok_or_else(|| AppError::Validation("invalid status".to_string()))?;

    let db = state.db.lock().unwrap();
    let updated = booking::update_status(&db, appointment_id, new_status, &actor)?;

    Ok(Json(updated))
}
