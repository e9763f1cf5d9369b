pub mod booking;
pub mod contact;
pub mod provider;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use contact::{Contact, ContactStatus};
pub use provider::Provider;
pub use user::{Gender, Role, User};
