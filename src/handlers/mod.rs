pub mod auth;
pub mod bookings;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod providers;
