use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub business_id: i64,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
}
