//! # Domain Services
//!
//! Business logic that doesn't belong to a single entity.
//!
//! - **LeadAssigner**: distributes leads across active employees by language,
//!   location and current load

mod assignment;

pub use assignment::LeadAssigner;
