//! # Rollcall Common Library
//!
//! Shared code for the Rollcall reconciliation service including:
//! - Error types
//! - Layered configuration loading (TOML → ENV → defaults)
//! - Event types (ReconcileEvent enum) and the broadcast EventBus
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
