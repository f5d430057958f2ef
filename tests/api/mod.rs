//! HTTP API Tests

mod health_tests;
