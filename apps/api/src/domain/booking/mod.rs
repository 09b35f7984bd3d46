// Booking domain module

#![allow(clippy::module_inception)]

pub mod booking;

pub use booking::{Booking, BookingDraft, BookingPatch};
