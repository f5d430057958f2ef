//! Shared Utilities
//!
//! Common utilities used across all layers.

pub mod error;
pub mod pagination;
pub mod serde_id;
pub mod snowflake;
pub mod validation;
