use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub opening_time: String,
    pub closing_time: String,
}

/// Per-business scheduling configuration. A business without a settings row
/// gets these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessSettings {
    pub slot_interval_minutes: i32,
    pub min_notice_minutes: i32,
    pub booking_window_days: i32,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            slot_interval_minutes: 15,
            min_notice_minutes: 60,
            booking_window_days: 30,
        }
    }
}
