//! HTTP route handlers for the cart service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (database connectivity)
//!
//! # Cart (bearer auth, JSON)
//! GET    /cart                      - Get the caller's cart
//! POST   /cart/items                - Add an item (creates the cart lazily)
//! PUT    /cart/items/{product_id}   - Set an item's quantity
//! DELETE /cart/items/{product_id}   - Remove one unit of an item
//! DELETE /cart                      - Clear the cart
//!
//! # RPC (internal peers, JSON command dispatch)
//! POST   /rpc/{method}              - cart.get / cart.details / cart.add_item /
//!                                     cart.update_item / cart.remove_item /
//!                                     cart.clear
//! ```

pub mod cart;
pub mod health;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::rpc;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::update_item).delete(cart::remove_item),
        )
}

/// Create the full application router (health + cart + RPC).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .nest("/rpc", rpc::routes())
}
