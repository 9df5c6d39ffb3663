//! In-memory cart store.
//!
//! Process-local fake with the same contract as the PostgreSQL store,
//! including version checking on save. Used by unit and transport tests; all
//! data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use quince_core::UserId;

use super::{CartStore, StoreError};
use crate::models::Cart;

/// In-process cart store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    carts: Mutex<HashMap<UserId, Cart>>,
}

impl MemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Cart>, StoreError> {
        let carts = self.carts.lock().await;
        Ok(carts.get(user_id).cloned())
    }

    fn create(&self, user_id: &UserId) -> Cart {
        Cart::new(user_id.clone(), Utc::now())
    }

    async fn save(&self, mut cart: Cart) -> Result<Cart, StoreError> {
        let mut carts = self.carts.lock().await;
        let stored_version = carts.get(&cart.user_id).map(|stored| stored.version);

        match (cart.version, stored_version) {
            // First save of a new cart; loses to a concurrent first save.
            (0, None) => {}
            // Subsequent save; the loaded version must still be current.
            (loaded, Some(current)) if loaded == current && loaded > 0 => {}
            _ => return Err(StoreError::Conflict(cart.user_id)),
        }

        cart.version += 1;
        cart.updated_at = Utc::now();
        carts.insert(cart.user_id.clone(), cart.clone());
        Ok(cart)
    }
}
