//! Domain types for the cart service.

pub mod cart;

pub use cart::{Cart, CartDetails, DetailLine, LineItem, LineKey};
