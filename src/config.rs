use std::env;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// Fixed UTC offset of the business timezone, in whole hours.
    pub business_utc_offset_hours: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "slotbook.db".to_string()),
            business_utc_offset_hours: env::var("BUSINESS_UTC_OFFSET_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h| (-23..=23).contains(h))
                .unwrap_or(3),
        }
    }

    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}
