//! Integration tests for Quince Commerce.
//!
//! # Running Tests
//!
//! ```bash
//! # Start PostgreSQL, the catalog and identity services, then the cart
//! cargo run -p quince-cart
//!
//! # Run integration tests against it
//! CART_BASE_URL=http://localhost:3000 \
//!     cargo test -p quince-integration-tests -- --ignored
//! ```
//!
//! Tests talk to a live service over HTTP and are `#[ignore]`d so that plain
//! `cargo test` stays hermetic; in-process coverage lives in the cart crate's
//! own test suites.

#![cfg_attr(not(test), forbid(unsafe_code))]

/// Base URL for the cart service (configurable via environment).
#[must_use]
pub fn cart_base_url() -> String {
    std::env::var("CART_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Bearer token accepted by the identity service under test (configurable
/// via environment).
#[must_use]
pub fn test_token() -> String {
    std::env::var("CART_TEST_TOKEN").unwrap_or_else(|_| "integration-test-token".to_string())
}
