//! Presentation Layer
//!
//! HTTP routes, middleware and the realtime activity socket.

pub mod http;
pub mod middleware;
pub mod realtime;
