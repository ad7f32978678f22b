pub mod accommodations;
pub mod admin;
pub mod auth;
pub mod bookings;
pub mod health;
