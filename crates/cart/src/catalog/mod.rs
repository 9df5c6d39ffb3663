//! Product catalog client.
//!
//! The cart service never owns product data: price, display name, image, and
//! stock are fetched from the catalog service at write time and snapshotted
//! into line items. This module is a pure adapter - it translates the
//! aggregator's "give me product details" need into a remote call with a
//! bounded timeout and normalizes transport errors and malformed payloads
//! into the aggregator's error vocabulary. No caching, no retries.

mod client;
mod variants;

pub use client::HttpCatalogClient;
pub use variants::{Variant, select_default_variant};

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use quince_core::ProductId;

/// Errors from catalog lookups.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog could not be reached (timeout or transport failure).
    /// Retryable by the caller.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog answered but reported no such product.
    #[error("product {0} not found in catalog")]
    ProductNotFound(ProductId),

    /// The catalog answered with a payload missing required fields.
    #[error("invalid product data: {0}")]
    InvalidData(String),
}

/// Product data as the aggregator consumes it.
///
/// `variants` is kept raw: the catalog's variant entries are not trusted to
/// be well-formed and are validated by [`select_default_variant`].
#[derive(Debug, Clone)]
pub struct ProductDetails {
    /// Current unit price. Parsed from the JSON number's literal text, so the
    /// snapshot taken into a line item is exact.
    pub price: Decimal,
    /// Display name.
    pub name: String,
    /// Image URL, if the catalog carries one.
    pub image: Option<String>,
    /// Product-level stock; 0 when the catalog omits it.
    pub stock: u32,
    /// Raw variant entries as the catalog returned them.
    pub variants: Vec<serde_json::Value>,
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch current details for a product.
    async fn product_details(&self, product_id: &ProductId)
    -> Result<ProductDetails, CatalogError>;
}
