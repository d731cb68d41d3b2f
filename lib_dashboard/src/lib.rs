//! # `lib_dashboard`
//!
//! Client-side building blocks for the Source Analyzer web dashboard backend.
//!
//! - [`realtime`]: the notification channel, a WebSocket connection manager
//!   with automatic reconnection and per-kind handler dispatch.
//! - [`api`]: typed async REST client for projects, analysis summaries,
//!   confidence reports and ground-truth records.
//! - [`cache`]: the page-level query cache that handlers invalidate when a
//!   notification arrives, so views refetch instead of receiving pushed state.

pub mod api;
pub mod cache;
pub mod realtime;

// Re-export the pieces a composition root wires together.
pub use api::client::DashboardApi;
pub use cache::QueryCache;
pub use realtime::manager::{ConnectionManager, LinkState, RealtimeConfig};
