//! Cart persistence.
//!
//! Carts are stored as one document per user, keyed by `userId`. The store
//! owns no business rules: it finds, creates, and atomically saves whole
//! aggregates. Saves are guarded by an optimistic version token so that two
//! concurrent writers for the same user cannot silently overwrite each other;
//! the loser gets [`StoreError::Conflict`] and may reload and retry.
//!
//! Two implementations:
//!
//! - [`PgCartStore`] - PostgreSQL, one JSONB document per user
//! - [`MemoryCartStore`] - in-process fake with identical semantics, used by
//!   tests

mod memory;
mod postgres;

pub use memory::MemoryCartStore;
pub use postgres::PgCartStore;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quince_core::UserId;

use crate::models::Cart;

/// Errors from cart persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Document (de)serialization failed.
    #[error("document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    Corruption(String),

    /// The cart was modified concurrently; reload and retry.
    #[error("concurrent modification of cart for user {0}")]
    Conflict(UserId),
}

/// Durable mapping from user identifier to a single cart aggregate.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load the cart for a user, if one exists.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError>;

    /// Build a fresh, empty cart for a user. Not persisted until `save`.
    fn create(&self, user_id: &UserId) -> Cart;

    /// Persist the whole aggregate atomically.
    ///
    /// All-or-nothing for the full document: items and total land together or
    /// not at all. Fails with [`StoreError::Conflict`] when the stored version
    /// no longer matches the one the cart was loaded at.
    async fn save(&self, cart: Cart) -> Result<Cart, StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
