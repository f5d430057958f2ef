//! # Domain Layer
//!
//! Core business rules of the CRM, independent of HTTP, sockets and storage.
//!
//! ## Structure
//!
//! - **entities**: Users, leads, activities, attendance records and sessions,
//!   each with its repository trait
//! - **services**: Pure business logic spanning several entities
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Entities encapsulate their own state rules (lead status transitions,
//!   attendance sequencing)

pub mod entities;
pub mod services;

pub use entities::*;
pub use services::LeadAssigner;
