use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

use crate::db::queries::DayBooking;
use crate::errors::AppError;
use crate::models::{BusinessSettings, Slot};
use crate::services::timegrid::{to_clock_time, to_minutes};

/// Everything the slot computation needs, resolved by the caller. The
/// calculator itself touches no storage and takes the clock as a parameter.
pub struct AvailabilityInput<'a> {
    pub opening_time: &'a str,
    pub closing_time: &'a str,
    pub settings: &'a BusinessSettings,
    pub service_duration: i32,
    /// Capable active staff, in candidate order.
    pub staff_ids: &'a [i64],
    /// Non-cancelled, staff-assigned appointments of the target date.
    pub bookings: &'a [DayBooking],
    pub date: NaiveDate,
    pub now: DateTime<Utc>,
    pub business_offset: FixedOffset,
}

/// Computes the bookable start times for one service on one date, with the
/// count of free staff per slot. Ascending by time.
pub fn compute_available_slots(input: &AvailabilityInput) -> Result<Vec<Slot>, AppError> {
    let settings = input.settings;
    if settings.slot_interval_minutes <= 0 {
        return Err(AppError::Validation(
            "slot interval must be positive".to_string(),
        ));
    }

    let local_now = input.now.with_timezone(&input.business_offset);
    let today = local_now.date_naive();

    let day_offset = (input.date - today).num_days();
    if day_offset < 0 || day_offset > i64::from(settings.booking_window_days) {
        return Err(AppError::Validation(
            "date outside booking window".to_string(),
        ));
    }

    if input.staff_ids.is_empty() {
        return Ok(vec![]);
    }

    let open_min = to_minutes(input.opening_time)?;
    let close_min = to_minutes(input.closing_time)?;
    let need = input.service_duration;

    // Earliest allowed start for same-day bookings.
    let cutoff = if input.date == today {
        let now_minutes = local_now.hour() as i32 * 60 + local_now.minute() as i32;
        Some(now_minutes + settings.min_notice_minutes)
    } else {
        None
    };

    let busy = busy_intervals(input.bookings, need);

    let mut slots = vec![];
    let mut t = open_min;
    while t + need <= close_min {
        if cutoff.map_or(true, |c| t >= c) {
            let slot_end = t + need;
            let available = input
                .staff_ids
                .iter()
                .filter(|staff_id| {
                    busy.get(*staff_id).map_or(true, |intervals| {
                        !intervals.iter().any(|&(start, end)| start < slot_end && t < end)
                    })
                })
                .count() as i64;

            if available > 0 {
                slots.push(Slot {
                    time: to_clock_time(t),
                    available_count: available,
                });
            }
        }
        t += settings.slot_interval_minutes;
    }

    Ok(slots)
}

/// Per-staff busy intervals in minutes, half-open. Legacy rows missing an
/// explicit start or end get the missing bound derived from the booked
/// service's duration; rows with unparseable times are skipped, matching
/// how the store treats them (NULL comparisons never match).
fn busy_intervals(bookings: &[DayBooking], default_duration: i32) -> HashMap<i64, Vec<(i32, i32)>> {
    let mut busy: HashMap<i64, Vec<(i32, i32)>> = HashMap::new();

    for booking in bookings {
        let fallback = if booking.service_duration > 0 {
            booking.service_duration
        } else {
            default_duration
        };

        let start_str = booking.start_time.as_deref().or(booking.appointment_time.as_deref());
        let start = start_str.and_then(|s| to_minutes(s).ok());
        let end = booking.end_time.as_deref().and_then(|s| to_minutes(s).ok());

        let interval = match (start, end) {
            (Some(s), Some(e)) => (s, e),
            (Some(s), None) => (s, s + fallback),
            (None, Some(e)) => (e - fallback, e),
            (None, None) => continue,
        };

        busy.entry(booking.staff_id).or_default().push(interval);
    }

    busy
}
