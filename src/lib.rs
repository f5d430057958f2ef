//! # CRM Server Library
//!
//! Backend for a small CRM dashboard:
//! - REST API for leads, employees, attendance and the activity feed
//! - WebSocket channel relaying activity events to every dashboard
//! - PostgreSQL for persistent storage
//! - Redis for the recent-activity list
//! - A reconnecting client for the realtime channel
//!
//! ## Module Structure
//!
//! ```text
//! crm_server/
//! +-- config/         Configuration management
//! +-- domain/         Entities, repository traits, lead assignment
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Postgres, Redis and metrics
//! +-- presentation/   HTTP routes, middleware and the realtime socket
//! +-- client/         Realtime channel client
//! +-- shared/         Errors, pagination, snowflake IDs
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Realtime channel client
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
