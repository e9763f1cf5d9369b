pub mod access;
pub mod bookings;
pub mod passwords;
pub mod tokens;
