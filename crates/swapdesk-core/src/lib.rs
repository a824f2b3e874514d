//! swapdesk-core: Shared types, units, errors, and configuration
//!
//! This crate provides the foundational types used across the Swapdesk workspace.

pub mod config;
pub mod errors;
pub mod handoff;
pub mod types;
pub mod units;

pub use config::*;
pub use errors::*;
pub use handoff::Handoff;
pub use types::*;
