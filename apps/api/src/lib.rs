//! Natours API Library
//!
//! Tour catalogue, accounts, reviews and bookings served as a JSON API and
//! server-rendered pages. The binary in `main.rs` only wires configuration,
//! logging and storage around [`api::build_router`].

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod seed;
pub mod state;
pub mod views;
