//! PostgreSQL cart store.
//!
//! One row per user in the `carts` table: the aggregate lives in a JSONB
//! `document` column, with `version` and the timestamps owned by the store.
//! The schema is created by the migration in `crates/cart/migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use quince_core::UserId;

use super::{CartStore, StoreError};
use crate::models::Cart;

/// Cart store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query(
            r"
            SELECT document, version, created_at, updated_at
            FROM carts
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: serde_json::Value = row.try_get("document")?;
        let mut cart: Cart = serde_json::from_value(document)
            .map_err(|e| StoreError::Corruption(format!("invalid cart document: {e}")))?;

        if cart.user_id != *user_id {
            return Err(StoreError::Corruption(format!(
                "cart document for user {user_id} carries userId {}",
                cart.user_id
            )));
        }

        // Columns are authoritative for the concurrency token and timestamps.
        cart.version = row.try_get("version")?;
        cart.created_at = row.try_get::<DateTime<Utc>, _>("created_at")?;
        cart.updated_at = row.try_get::<DateTime<Utc>, _>("updated_at")?;
        Ok(Some(cart))
    }

    fn create(&self, user_id: &UserId) -> Cart {
        Cart::new(user_id.clone(), Utc::now())
    }

    async fn save(&self, mut cart: Cart) -> Result<Cart, StoreError> {
        let now = Utc::now();
        let loaded_version = cart.version;
        cart.version = loaded_version + 1;
        cart.updated_at = now;
        let document = serde_json::to_value(&cart)?;

        let affected = if loaded_version == 0 {
            // First save. A concurrent first save for the same user hits the
            // primary key and loses.
            sqlx::query(
                r"
                INSERT INTO carts (user_id, document, version, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                ON CONFLICT (user_id) DO NOTHING
                ",
            )
            .bind(cart.user_id.as_str())
            .bind(&document)
            .bind(cart.version)
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected()
        } else {
            sqlx::query(
                r"
                UPDATE carts
                SET document = $2, version = $3, updated_at = $4
                WHERE user_id = $1 AND version = $5
                ",
            )
            .bind(cart.user_id.as_str())
            .bind(&document)
            .bind(cart.version)
            .bind(now)
            .bind(loaded_version)
            .execute(&self.pool)
            .await?
            .rows_affected()
        };

        if affected == 0 {
            return Err(StoreError::Conflict(cart.user_id));
        }
        Ok(cart)
    }
}
