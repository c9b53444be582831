pub mod appointment;
pub mod business;
pub mod service;
pub mod slot;
pub mod staff;

pub use appointment::{Appointment, AppointmentSource, AppointmentStatus};
pub use business::{Business, BusinessSettings};
pub use service::Service;
pub use slot::Slot;
pub use staff::Staff;
