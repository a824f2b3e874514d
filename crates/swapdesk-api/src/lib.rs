//! swapdesk-api: HTTP API layer for Swapdesk
//!
//! Exposes pool listing, the three operation forms (preview, approve,
//! execute), the natural-language intent endpoint, the wallet account and
//! the notification feed.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::AppState;
