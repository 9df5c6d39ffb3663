//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::identity::IdentityApi;
use crate::service::CartService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// cart service and the identity client. The pool is kept only for the
/// readiness probe; it is `None` when the service runs on the in-memory
/// store (tests).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cart: CartService,
    identity: Arc<dyn IdentityApi>,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(cart: CartService, identity: Arc<dyn IdentityApi>, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cart,
                identity,
                pool,
            }),
        }
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the identity client.
    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityApi> {
        &self.inner.identity
    }

    /// Get the database pool backing the readiness probe, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
