pub mod assigner;
pub mod availability;
pub mod booking;
pub mod timegrid;
