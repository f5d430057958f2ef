//! Infrastructure Layer
//!
//! Implementations for external services:
//! - Database pool, migrations and repositories (PostgreSQL)
//! - Recent-activity cache (Redis)
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod metrics;
pub mod repositories;
