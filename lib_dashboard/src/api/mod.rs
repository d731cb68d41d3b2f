//! REST client for the dashboard backend.
//!
//! The realtime channel only ever says "something changed"; these endpoints
//! are where consumers refetch the actual data.

pub mod client;
pub mod models;

pub use client::{ApiError, DashboardApi};
