use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentSource, AppointmentStatus};
use crate::services::assigner::{self, CreatedAppointment, PlacedBooking};
use crate::services::timegrid::{is_aligned, to_minutes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    BusinessOwner,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "business_owner" => Some(Role::BusinessOwner),
            _ => None,
        }
    }
}

/// The authenticated caller, as established by the upstream auth layer.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub business_id: Option<i64>,
    pub service_id: Option<i64>,
    pub appointment_date: Option<String>,
    pub start_time: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

/// Validates a booking request and hands it to the staff assigner.
///
/// Checks run in a fixed order and fail fast: field presence, role gating,
/// business/settings/service resolution, grid alignment, business-hours
/// containment, booking window, minimum notice, capable staff. Customer
/// bookings are created `pending`; owner-manual ones `confirmed`.
pub fn create_appointment(
    conn: &mut Connection,
    business_offset: FixedOffset,
    request: &CreateRequest,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<CreatedAppointment, AppError> {
    let (Some(business_id), Some(service_id), Some(date_str), Some(start_str)) = (
        request.business_id,
        request.service_id,
        request.appointment_date.as_deref(),
        request.start_time.as_deref(),
    ) else {
        return Err(AppError::Validation("missing required fields".to_string()));
    };

    let manual_fields = request.customer_name.is_some() || request.customer_phone.is_some();
    match actor.role {
        Role::Customer if manual_fields => {
            return Err(AppError::Forbidden(
                "manual booking fields are reserved for business owners".to_string(),
            ));
        }
        Role::BusinessOwner
            if request.customer_name.is_none() || request.customer_phone.is_none() =>
        {
            return Err(AppError::Forbidden(
                "business owners must book manually with customer name and phone".to_string(),
            ));
        }
        _ => {}
    }

    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("malformed date: {date_str:?}")))?;

    let business = queries::get_business(conn, business_id)?
        .ok_or_else(|| AppError::NotFound("business not found".to_string()))?;
    if actor.role == Role::BusinessOwner && business.owner_id != actor.user_id {
        return Err(AppError::Forbidden("access denied".to_string()));
    }

    let settings = queries::get_settings(conn, business_id)?;
    let service = queries::get_service(conn, service_id, business_id)?
        .ok_or_else(|| AppError::Validation("service not found for business".to_string()))?;

    let open_min = to_minutes(&business.opening_time)?;
    let close_min = to_minutes(&business.closing_time)?;
    if open_min >= close_min {
        return Err(AppError::Validation("invalid business hours".to_string()));
    }

    let start_min = to_minutes(start_str)?;
    let end_min = start_min + service.duration_minutes;

    if !is_aligned(start_min, settings.slot_interval_minutes) {
        return Err(AppError::Validation(
            "start time not aligned to slot grid".to_string(),
        ));
    }
    if start_min < open_min || end_min > close_min {
        return Err(AppError::Validation(
            "service exceeds business hours".to_string(),
        ));
    }

    let local_now = now.with_timezone(&business_offset);
    let today = local_now.date_naive();

    let day_offset = (date - today).num_days();
    if day_offset < 0 || day_offset > i64::from(settings.booking_window_days) {
        return Err(AppError::Validation(
            "date outside booking window".to_string(),
        ));
    }

    if date == today {
        let now_minutes = local_now.hour() as i32 * 60 + local_now.minute() as i32;
        if start_min < now_minutes + settings.min_notice_minutes {
            return Err(AppError::Validation(
                "minimum notice not satisfied".to_string(),
            ));
        }
    }

    let candidates = queries::capable_staff_ids(conn, business_id, service_id)?;
    if candidates.is_empty() {
        return Err(AppError::NoCapableStaff);
    }

    let (status, source, customer_id) = match actor.role {
        Role::Customer => (
            AppointmentStatus::Pending,
            AppointmentSource::Customer,
            Some(actor.user_id),
        ),
        Role::BusinessOwner => (
            AppointmentStatus::Confirmed,
            AppointmentSource::OwnerManual,
            None,
        ),
    };

    assigner::assign_and_insert(
        conn,
        &PlacedBooking {
            business_id,
            service_id,
            customer_id,
            customer_name: request.customer_name.as_deref(),
            customer_phone: request.customer_phone.as_deref(),
            date,
            start_min,
            end_min,
            status,
            source,
            notes: request.notes.as_deref(),
            candidates: &candidates,
        },
    )
}

/// Applies a status change, enforcing the appointment lifecycle and the
/// caller's authority: customers may only cancel their own appointments;
/// owners may apply any legal transition within their businesses.
pub fn update_status(
    conn: &Connection,
    appointment_id: i64,
    new_status: AppointmentStatus,
    actor: &Actor,
) -> Result<Appointment, AppError> {
    let appointment = match actor.role {
        Role::Customer => queries::get_appointment_for_customer(conn, appointment_id, actor.user_id)?,
        Role::BusinessOwner => queries::get_appointment_for_owner(conn, appointment_id, actor.user_id)?,
    }
    .ok_or_else(|| AppError::NotFound("appointment not found or access denied".to_string()))?;

    if actor.role == Role::Customer && new_status != AppointmentStatus::Cancelled {
        return Err(AppError::Forbidden(
            "customers may only cancel their appointments".to_string(),
        ));
    }

    if !appointment.status.can_transition(new_status) {
        return Err(AppError::Validation(format!(
            "cannot change status from {} to {}",
            appointment.status.as_str(),
            new_status.as_str()
        )));
    }

    queries::update_appointment_status(conn, appointment_id, new_status)?;

    queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::NotFound("appointment not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::TimeZone;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    /// 2025-06-16 at the given business-local clock time.
    fn now_at(hhmm: &str) -> DateTime<Utc> {
        let minutes = to_minutes(hhmm).unwrap();
        offset()
            .with_ymd_and_hms(2025, 6, 16, (minutes / 60) as u32, (minutes % 60) as u32, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Fixture {
        conn: Connection,
        business_id: i64,
        service_id: i64,
    }

    fn setup() -> Fixture {
        let conn = db::init_db(":memory:").unwrap();
        let business_id = queries::create_business(&conn, 1, "Shear Genius", "09:00", "18:00").unwrap();
        let service_id = queries::create_service(&conn, business_id, "Haircut", 30, 20.0).unwrap();
        let staff_id = queries::create_staff(&conn, business_id, "Ada", true).unwrap();
        queries::link_staff_service(&conn, staff_id, service_id).unwrap();
        Fixture { conn, business_id, service_id }
    }

    fn customer() -> Actor {
        Actor { user_id: 42, role: Role::Customer }
    }

    fn owner() -> Actor {
        Actor { user_id: 1, role: Role::BusinessOwner }
    }

    fn request(fx: &Fixture, date: &str, start: &str) -> CreateRequest {
        CreateRequest {
            business_id: Some(fx.business_id),
            service_id: Some(fx.service_id),
            appointment_date: Some(date.to_string()),
            start_time: Some(start.to_string()),
            customer_name: None,
            customer_phone: None,
            notes: None,
        }
    }

    fn create(fx: &mut Fixture, req: &CreateRequest, actor: &Actor, now_hhmm: &str) -> Result<CreatedAppointment, AppError> {
        create_appointment(&mut fx.conn, offset(), req, actor, now_at(now_hhmm))
    }

    #[test]
    fn test_customer_booking_created_pending() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:00");
        let created = create(&mut fx, &req, &customer(), "12:00").unwrap();
        assert_eq!(created.status, AppointmentStatus::Pending);
        assert_eq!(created.source, AppointmentSource::Customer);
        assert_eq!(created.end_time, "10:30");
    }

    #[test]
    fn test_owner_manual_booking_created_confirmed() {
        let mut fx = setup();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.customer_name = Some("Walk-in".to_string());
        req.customer_phone = Some("+905551112233".to_string());
        let created = create(&mut fx, &req, &owner(), "12:00").unwrap();
        assert_eq!(created.status, AppointmentStatus::Confirmed);
        assert_eq!(created.source, AppointmentSource::OwnerManual);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut fx = setup();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.service_id = None;
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_customer_sending_manual_fields_forbidden() {
        let mut fx = setup();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.customer_name = Some("Someone".to_string());
        req.customer_phone = Some("+905551112233".to_string());
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_owner_without_manual_fields_forbidden() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:00");
        let err = create(&mut fx, &req, &owner(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_owner_of_other_business_denied() {
        let mut fx = setup();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.customer_name = Some("Walk-in".to_string());
        req.customer_phone = Some("+905551112233".to_string());
        let other_owner = Actor { user_id: 99, role: Role::BusinessOwner };
        let err = create(&mut fx, &req, &other_owner, "12:00").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_misaligned_start_rejected() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:05");
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_booking_exceeding_closing_rejected() {
        let mut fx = setup();
        // 17:45 + 30min would end at 18:15
        let req = request(&fx, "2025-06-17", "17:45");
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // 17:30 ends exactly at closing
        let req = request(&fx, "2025-06-17", "17:30");
        assert!(create(&mut fx, &req, &customer(), "12:00").is_ok());
    }

    #[test]
    fn test_min_notice_enforced_today() {
        let mut fx = setup();
        // at 13:10 with 60 minutes notice, 13:30 is too soon but 14:15 is fine
        let req = request(&fx, "2025-06-16", "13:30");
        let err = create(&mut fx, &req, &customer(), "13:10").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let req = request(&fx, "2025-06-16", "14:15");
        assert!(create(&mut fx, &req, &customer(), "13:10").is_ok());
    }

    #[test]
    fn test_date_outside_window_rejected() {
        let mut fx = setup();
        for date in ["2025-06-15", "2025-08-01"] {
            let req = request(&fx, date, "10:00");
            let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "date {date}");
        }
    }

    #[test]
    fn test_unknown_service_rejected() {
        let mut fx = setup();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.service_id = Some(9999);
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_no_capable_staff_conflict() {
        let mut fx = setup();
        // a second service nobody is linked to
        let lonely =
            queries::create_service(&fx.conn, fx.business_id, "Coloring", 60, 50.0).unwrap();
        let mut req = request(&fx, "2025-06-17", "10:00");
        req.service_id = Some(lonely);
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::NoCapableStaff));
    }

    #[test]
    fn test_inactive_staff_not_assigned() {
        let mut fx = setup();
        let retired = queries::create_staff(&fx.conn, fx.business_id, "Retired", false).unwrap();
        queries::link_staff_service(&fx.conn, retired, fx.service_id).unwrap();

        // single active staff: second booking of the same slot is exhausted
        let req = request(&fx, "2025-06-17", "10:00");
        create(&mut fx, &req, &customer(), "12:00").unwrap();
        let err = create(&mut fx, &req, &customer(), "12:00").unwrap_err();
        assert!(matches!(err, AppError::SlotTaken));
    }

    #[test]
    fn test_status_lifecycle_owner() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:00");
        let created = create(&mut fx, &req, &customer(), "12:00").unwrap();
        let id = created.appointment_id;

        let updated = update_status(&fx.conn, id, AppointmentStatus::Confirmed, &owner()).unwrap();
        assert_eq!(updated.status, AppointmentStatus::Confirmed);

        let updated = update_status(&fx.conn, id, AppointmentStatus::Completed, &owner()).unwrap();
        assert_eq!(updated.status, AppointmentStatus::Completed);

        // completed is terminal
        let err = update_status(&fx.conn, id, AppointmentStatus::Cancelled, &owner()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_customer_can_only_cancel_own() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:00");
        let created = create(&mut fx, &req, &customer(), "12:00").unwrap();
        let id = created.appointment_id;

        let err = update_status(&fx.conn, id, AppointmentStatus::Confirmed, &customer()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stranger = Actor { user_id: 777, role: Role::Customer };
        let err = update_status(&fx.conn, id, AppointmentStatus::Cancelled, &stranger).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let updated = update_status(&fx.conn, id, AppointmentStatus::Cancelled, &customer()).unwrap();
        assert_eq!(updated.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_pending_cannot_jump_to_completed() {
        let mut fx = setup();
        let req = request(&fx, "2025-06-17", "10:00");
        let created = create(&mut fx, &req, &customer(), "12:00").unwrap();
        let err = update_status(&fx.conn, created.appointment_id, AppointmentStatus::Completed, &owner())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
