use serde::{Deserialize, Serialize};

/// One bookable start time with the number of capable staff still free.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub time: String,
    pub available_count: i64,
}
