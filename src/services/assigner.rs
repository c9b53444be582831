use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries::{self, NewAppointment};
use crate::errors::AppError;
use crate::models::{AppointmentSource, AppointmentStatus};
use crate::services::timegrid::to_clock_time;

/// A fully validated booking waiting for a staff member.
pub struct PlacedBooking<'a> {
    pub business_id: i64,
    pub service_id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<&'a str>,
    pub customer_phone: Option<&'a str>,
    pub date: NaiveDate,
    pub start_min: i32,
    pub end_min: i32,
    pub status: AppointmentStatus,
    pub source: AppointmentSource,
    pub notes: Option<&'a str>,
    /// Capable staff in assignment order.
    pub candidates: &'a [i64],
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedAppointment {
    pub appointment_id: i64,
    pub staff_id: i64,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub source: AppointmentSource,
}

/// Walks the candidate list in order and books the first staff member whose
/// day has room for the interval.
///
/// Each candidate gets a cheap overlap probe outside any transaction, then
/// an exclusive (`BEGIN IMMEDIATE`) transaction wrapping an identical
/// re-check and the insert. The re-check is the actual double-booking
/// guarantee; the probe only keeps the exclusive section off staff that are
/// visibly busy. A transaction that doesn't reach commit is rolled back on
/// every path, including error propagation, because dropping it rolls back.
pub fn assign_and_insert(
    conn: &mut Connection,
    booking: &PlacedBooking,
) -> Result<CreatedAppointment, AppError> {
    let date = booking.date.format("%Y-%m-%d").to_string();
    let start_time = to_clock_time(booking.start_min);
    let end_time = to_clock_time(booking.end_min);

    for &staff_id in booking.candidates {
        let busy = queries::find_overlap(
            conn,
            booking.business_id,
            &date,
            staff_id,
            &start_time,
            &end_time,
        )?;
        if busy {
            continue;
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let busy_again = queries::find_overlap(
            &tx,
            booking.business_id,
            &date,
            staff_id,
            &start_time,
            &end_time,
        )?;
        if busy_again {
            // lost the race between probe and re-check
            tx.rollback()?;
            tracing::debug!(staff_id, %date, %start_time, "staff became busy, trying next candidate");
            continue;
        }

        let appointment_id = queries::insert_appointment(
            &tx,
            &NewAppointment {
                business_id: booking.business_id,
                service_id: booking.service_id,
                customer_id: booking.customer_id,
                customer_name: booking.customer_name,
                customer_phone: booking.customer_phone,
                date: &date,
                start_time: &start_time,
                end_time: &end_time,
                staff_id,
                status: booking.status,
                source: booking.source,
                notes: booking.notes,
            },
        )?;
        tx.commit()?;

        tracing::info!(
            appointment_id,
            staff_id,
            %date,
            %start_time,
            %end_time,
            "appointment booked"
        );

        return Ok(CreatedAppointment {
            appointment_id,
            staff_id,
            start_time,
            end_time,
            status: booking.status,
            source: booking.source,
        });
    }

    Err(AppError::SlotTaken)
}
