//! Architectural Enforcement Integration Tests
//!
//! The tests in this package scan the builder sources and fail on:
//! - sleep() calls in production code
//! - blocking I/O inside async functions
//!
//! The library itself is empty; see `tests/`.
