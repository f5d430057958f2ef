//! Realtime Channel Tests
//!
//! Real sockets against the `/socket` endpoint on an ephemeral port.

mod client_tests;
mod socket_tests;
