use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::models::{
    Appointment, AppointmentSource, AppointmentStatus, Business, BusinessSettings, Service,
};

// ── Businesses ──

pub fn get_business(conn: &Connection, id: i64) -> anyhow::Result<Option<Business>> {
    let result = conn.query_row(
        "SELECT id, owner_id, name, opening_time, closing_time FROM businesses WHERE id = ?1",
        params![id],
        |row| {
            Ok(Business {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                name: row.get(2)?,
                opening_time: row.get(3)?,
                closing_time: row.get(4)?,
            })
        },
    );

    match result {
        Ok(business) => Ok(Some(business)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_business(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    opening_time: &str,
    closing_time: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO businesses (owner_id, name, opening_time, closing_time) VALUES (?1, ?2, ?3, ?4)",
        params![owner_id, name, opening_time, closing_time],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Settings ──

/// Missing settings rows fall back to the defaults.
pub fn get_settings(conn: &Connection, business_id: i64) -> anyhow::Result<BusinessSettings> {
    let result = conn.query_row(
        "SELECT slot_interval_minutes, min_notice_minutes, booking_window_days
         FROM business_settings WHERE business_id = ?1",
        params![business_id],
        |row| {
            Ok(BusinessSettings {
                slot_interval_minutes: row.get(0)?,
                min_notice_minutes: row.get(1)?,
                booking_window_days: row.get(2)?,
            })
        },
    );

    match result {
        Ok(settings) => Ok(settings),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(BusinessSettings::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn upsert_settings(
    conn: &Connection,
    business_id: i64,
    settings: &BusinessSettings,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO business_settings (business_id, slot_interval_minutes, min_notice_minutes, booking_window_days)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(business_id) DO UPDATE SET
           slot_interval_minutes = excluded.slot_interval_minutes,
           min_notice_minutes = excluded.min_notice_minutes,
           booking_window_days = excluded.booking_window_days",
        params![
            business_id,
            settings.slot_interval_minutes,
            settings.min_notice_minutes,
            settings.booking_window_days,
        ],
    )?;
    Ok(())
}

// ── Services ──

pub fn get_service(
    conn: &Connection,
    id: i64,
    business_id: i64,
) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, business_id, name, duration_minutes, price
         FROM services WHERE id = ?1 AND business_id = ?2",
        params![id, business_id],
        |row| {
            Ok(Service {
                id: row.get(0)?,
                business_id: row.get(1)?,
                name: row.get(2)?,
                duration_minutes: row.get(3)?,
                price: row.get(4)?,
            })
        },
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_service(
    conn: &Connection,
    business_id: i64,
    name: &str,
    duration_minutes: i32,
    price: f64,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO services (business_id, name, duration_minutes, price) VALUES (?1, ?2, ?3, ?4)",
        params![business_id, name, duration_minutes, price],
    )?;
    Ok(conn.last_insert_rowid())
}

// ── Staff ──

pub fn create_staff(
    conn: &Connection,
    business_id: i64,
    name: &str,
    active: bool,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO staff (business_id, name, active) VALUES (?1, ?2, ?3)",
        params![business_id, name, active as i32],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn link_staff_service(conn: &Connection, staff_id: i64, service_id: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO staff_services (staff_id, service_id) VALUES (?1, ?2)",
        params![staff_id, service_id],
    )?;
    Ok(())
}

/// Active staff able to perform the service, in stable id order. This order
/// is the assigner's candidate order.
pub fn capable_staff_ids(
    conn: &Connection,
    business_id: i64,
    service_id: i64,
) -> anyhow::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT st.id FROM staff st
         JOIN staff_services ss ON ss.staff_id = st.id
         WHERE st.business_id = ?1 AND st.active = 1 AND ss.service_id = ?2
         ORDER BY st.id",
    )?;

    let rows = stmt.query_map(params![business_id, service_id], |row| row.get(0))?;

    let mut ids = vec![];
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

// ── Appointments ──

/// A booked interval on a given day, as the availability calculator consumes
/// it. `service_duration` is the fallback for legacy rows missing an
/// explicit start or end time.
#[derive(Debug, Clone)]
pub struct DayBooking {
    pub staff_id: i64,
    pub appointment_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub service_duration: i32,
}

pub fn day_bookings(
    conn: &Connection,
    business_id: i64,
    date: NaiveDate,
) -> anyhow::Result<Vec<DayBooking>> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT a.staff_id, a.appointment_time, a.start_time, a.end_time, s.duration_minutes
         FROM appointments a
         JOIN services s ON s.id = a.service_id
         WHERE a.business_id = ?1 AND a.appointment_date = ?2
           AND a.status != 'cancelled' AND a.staff_id IS NOT NULL",
    )?;

    let rows = stmt.query_map(params![business_id, date_str], |row| {
        Ok(DayBooking {
            staff_id: row.get(0)?,
            appointment_time: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            service_duration: row.get(4)?,
        })
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// Half-open overlap probe for one staff member's day. Used both for the
/// optimistic check and for the re-check inside the insert transaction, so
/// the two phases share a single predicate.
pub fn find_overlap(
    conn: &Connection,
    business_id: i64,
    date: &str,
    staff_id: i64,
    start_time: &str,
    end_time: &str,
) -> anyhow::Result<bool> {
    let result = conn.query_row(
        "SELECT 1 FROM appointments
         WHERE business_id = ?1 AND appointment_date = ?2 AND staff_id = ?3
           AND status != 'cancelled'
           AND start_time < ?4 AND ?5 < end_time
         LIMIT 1",
        params![business_id, date, staff_id, end_time, start_time],
        |_| Ok(()),
    );

    match result {
        Ok(()) => Ok(true),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub struct NewAppointment<'a> {
    pub business_id: i64,
    pub service_id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub date: &'a str,
    pub start_time: &'a str,
    pub end_time: &'a str,
    pub staff_id: i64,
    pub status: AppointmentStatus,
    pub source: AppointmentSource,
    pub notes: Option<&'a str>,
}

pub fn insert_appointment(conn: &Connection, appt: &NewAppointment) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO appointments
         (business_id, service_id, customer_id, customer_name, customer_phone,
          appointment_date, appointment_time, start_time, end_time, staff_id, status, source, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.business_id,
            appt.service_id,
            appt.customer_id,
            appt.customer_name,
            appt.customer_phone,
            appt.date,
            appt.start_time,
            appt.end_time,
            appt.staff_id,
            appt.status.as_str(),
            appt.source.as_str(),
            appt.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const APPOINTMENT_COLUMNS: &str = "id, business_id, service_id, customer_id, customer_name, \
     customer_phone, appointment_date, start_time, end_time, staff_id, status, source, notes, created_at";

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(6)?;
    let status_str: String = row.get(10)?;
    let source_str: String = row.get(11)?;

    let appointment_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")?;

    Ok(Appointment {
        id: row.get(0)?,
        business_id: row.get(1)?,
        service_id: row.get(2)?,
        customer_id: row.get(3)?,
        customer_name: row.get(4)?,
        customer_phone: row.get(5)?,
        appointment_date,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        staff_id: row.get(9)?,
        status: AppointmentStatus::parse(&status_str).unwrap_or(AppointmentStatus::Pending),
        source: AppointmentSource::parse(&source_str),
        notes: row.get(12)?,
        created_at: row.get(13)?,
    })
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)));

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// An appointment as visible to the customer who booked it.
pub fn get_appointment_for_customer(
    conn: &Connection,
    id: i64,
    customer_id: i64,
) -> anyhow::Result<Option<Appointment>> {
    let sql =
        format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1 AND customer_id = ?2");
    let result = conn.query_row(&sql, params![id, customer_id], |row| {
        Ok(parse_appointment_row(row))
    });

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// An appointment as visible to the owner of the business it belongs to.
pub fn get_appointment_for_owner(
    conn: &Connection,
    id: i64,
    owner_id: i64,
) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        "SELECT a.id, a.business_id, a.service_id, a.customer_id, a.customer_name,
                a.customer_phone, a.appointment_date, a.start_time, a.end_time,
                a.staff_id, a.status, a.source, a.notes, a.created_at
         FROM appointments a
         JOIN businesses b ON a.business_id = b.id
         WHERE a.id = ?1 AND b.owner_id = ?2",
        params![id, owner_id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

// ── Appointment listings ──

/// Appointment row joined with business and service details for listings.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentView {
    pub id: i64,
    pub business_id: i64,
    pub business_name: String,
    pub service_id: i64,
    pub service_name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub appointment_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub staff_id: Option<i64>,
    pub status: String,
    pub source: String,
    pub notes: Option<String>,
}

fn parse_view_row(row: &rusqlite::Row) -> rusqlite::Result<AppointmentView> {
    Ok(AppointmentView {
        id: row.get(0)?,
        business_id: row.get(1)?,
        business_name: row.get(2)?,
        service_id: row.get(3)?,
        service_name: row.get(4)?,
        duration_minutes: row.get(5)?,
        price: row.get(6)?,
        customer_id: row.get(7)?,
        customer_name: row.get(8)?,
        customer_phone: row.get(9)?,
        appointment_date: row.get(10)?,
        start_time: row.get(11)?,
        end_time: row.get(12)?,
        staff_id: row.get(13)?,
        status: row.get(14)?,
        source: row.get(15)?,
        notes: row.get(16)?,
    })
}

const VIEW_COLUMNS: &str = "a.id, a.business_id, b.name, a.service_id, s.name, \
     s.duration_minutes, s.price, a.customer_id, a.customer_name, a.customer_phone, \
     a.appointment_date, a.start_time, a.end_time, a.staff_id, a.status, a.source, a.notes";

pub fn appointments_for_customer(
    conn: &Connection,
    customer_id: i64,
) -> anyhow::Result<Vec<AppointmentView>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS} FROM appointments a
         JOIN businesses b ON a.business_id = b.id
         JOIN services s ON a.service_id = s.id
         WHERE a.customer_id = ?1
         ORDER BY a.appointment_date DESC, a.start_time DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![customer_id], parse_view_row)?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row?);
    }
    Ok(appointments)
}

pub fn appointments_for_owner(
    conn: &Connection,
    owner_id: i64,
) -> anyhow::Result<Vec<AppointmentView>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS} FROM appointments a
         JOIN businesses b ON a.business_id = b.id
         JOIN services s ON a.service_id = s.id
         WHERE b.owner_id = ?1
         ORDER BY a.appointment_date DESC, a.start_time DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], parse_view_row)?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row?);
    }
    Ok(appointments)
}
