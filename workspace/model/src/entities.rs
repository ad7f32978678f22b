//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the accommodation marketplace here:
//! users (students, owners, admins), the accommodations owners list,
//! the images hosted for them, and the booking requests students raise.

pub mod accommodation;
pub mod accommodation_image;
pub mod booking;
pub mod user;
