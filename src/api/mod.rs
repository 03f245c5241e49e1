// src/api/mod.rs
//! Read-only status surface: health, current counters and metrics.

pub mod handlers;
pub mod server;

pub use server::{BoundStatusServer, StatusServer, StatusState};
