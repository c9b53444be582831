use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored appointment row. `start_time`/`end_time`/`staff_id` are optional
/// because rows created before staff assignment existed may lack them; the
/// availability calculator reconstructs their interval from
/// `appointment_time` plus the booked service's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub business_id: i64,
    pub service_id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub appointment_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub staff_id: Option<i64>,
    pub status: AppointmentStatus,
    pub source: AppointmentSource,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    /// Legal lifecycle moves. Cancelled and completed are terminal.
    pub fn can_transition(&self, to: AppointmentStatus) -> bool {
        matches!(
            (self, to),
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
                | (AppointmentStatus::Confirmed, AppointmentStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentSource {
    Customer,
    OwnerManual,
}

impl AppointmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentSource::Customer => "customer",
            AppointmentSource::OwnerManual => "owner_manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "owner_manual" => AppointmentSource::OwnerManual,
            _ => AppointmentSource::Customer,
        }
    }
}
