//! Cart aggregation engine.
//!
//! [`CartService`] owns every state-transition rule: merge-on-add, quantity
//! update, decrement-or-remove, clear, total recomputation, stock
//! enforcement, and variant disambiguation. Both transports (REST and RPC)
//! delegate here; neither carries any rule of its own.
//!
//! Ordering discipline: validate, then mutate, then persist. A failed
//! operation never leaves a partially mutated cart behind - all mutations
//! happen on an in-memory copy that is only saved once every check has
//! passed, and the save itself is a single atomic document write.

use std::sync::Arc;

use thiserror::Error;
use tracing::{instrument, warn};

use quince_core::{ProductId, UserId};

use crate::catalog::{CatalogApi, CatalogError, ProductDetails, select_default_variant};
use crate::models::{Cart, CartDetails, LineItem, LineKey};
use crate::store::{CartStore, StoreError};

/// Errors from cart operations.
///
/// Only `UpstreamUnavailable`, `Persistence`, and `Conflict` are worth
/// retrying; everything else is deterministic for the same inputs.
#[derive(Debug, Error)]
pub enum CartError {
    /// A required argument was missing or malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// No cart exists for the user.
    #[error("cart not found")]
    NotFound,

    /// The cart has no line matching the requested item.
    #[error("item not found in cart")]
    ItemNotFound,

    /// The catalog has no such product.
    #[error("product not found")]
    ProductNotFound,

    /// The catalog returned a product record missing required fields.
    #[error("invalid product data: {0}")]
    InvalidProductData(String),

    /// A new item cannot be added because nothing is in stock.
    #[error("product is out of stock")]
    OutOfStock,

    /// The requested quantity exceeds what is in stock.
    #[error("insufficient stock: only {available} available")]
    InsufficientStock {
        /// Units currently available.
        available: u32,
    },

    /// The cart was modified concurrently; reload and retry.
    #[error("cart was modified concurrently")]
    Conflict,

    /// The catalog or identity service timed out or failed at the transport
    /// level.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The store failed to persist the cart.
    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::Conflict,
            other => Self::Persistence(other),
        }
    }
}

impl From<CatalogError> for CartError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(msg) => Self::UpstreamUnavailable(msg),
            CatalogError::ProductNotFound(_) => Self::ProductNotFound,
            CatalogError::InvalidData(msg) => Self::InvalidProductData(msg),
        }
    }
}

/// The resolved default variant for a product, as used by stock checks.
struct ResolvedVariant {
    color: String,
    size: String,
    stock: u32,
}

/// Cart aggregator over a store and a catalog client.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogApi>,
}

impl CartService {
    /// Create a new service.
    pub fn new(store: Arc<dyn CartStore>, catalog: Arc<dyn CatalogApi>) -> Self {
        Self { store, catalog }
    }

    /// Get a user's cart. Read-only; a missing cart is `NotFound` and is
    /// never created by this path.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Cart, CartError> {
        require_id(user_id.as_str(), "userId")?;
        self.store
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::NotFound)
    }

    /// Read-only projection of a cart for internal RPC consumers.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cart_details(&self, user_id: &UserId) -> Result<CartDetails, CartError> {
        let cart = self.get_cart(user_id).await?;
        Ok(CartDetails::from(&cart))
    }

    /// Add one unit of a product to the user's cart, creating the cart if
    /// this is the user's first item.
    ///
    /// The product is fetched from the catalog and its price, name, image,
    /// and variant are snapshotted into the line item. An existing line with
    /// the same `(product, color, size)` key is incremented instead of
    /// duplicated, subject to the stock bound.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        color: Option<String>,
        size: Option<String>,
    ) -> Result<Cart, CartError> {
        require_id(user_id.as_str(), "userId")?;
        require_id(product_id.as_str(), "productId")?;

        let product = self.catalog.product_details(product_id).await?;
        let resolved = resolve_variant(product_id, &product);

        let mut cart = match self.store.find_by_user(user_id).await? {
            Some(cart) => cart,
            None => self.store.create(user_id),
        };

        let key = merge_key(product_id, color, size, &resolved);
        let merged = match cart.find_item_mut(&key) {
            Some(item) => {
                let new_quantity = item.quantity + 1;
                if new_quantity > resolved.stock {
                    return Err(CartError::InsufficientStock {
                        available: resolved.stock,
                    });
                }
                item.quantity = new_quantity;
                true
            }
            None => false,
        };

        if !merged {
            if resolved.stock < 1 {
                return Err(CartError::OutOfStock);
            }
            cart.items.push(LineItem {
                product_id: product_id.clone(),
                quantity: 1,
                price: product.price,
                name: product.name,
                image: product.image,
                color: key.color,
                size: key.size,
            });
        }

        cart.recompute_total();
        Ok(self.store.save(cart).await?)
    }

    /// Set the quantity of an existing line.
    ///
    /// Re-validates the product against the catalog and enforces the stock
    /// bound at the new quantity, but keeps the line's original price, name,
    /// and variant snapshot untouched.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        color: Option<String>,
        size: Option<String>,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        require_id(user_id.as_str(), "userId")?;
        require_id(product_id.as_str(), "productId")?;
        let quantity = valid_quantity(quantity)?;

        let product = self.catalog.product_details(product_id).await?;
        let resolved = resolve_variant(product_id, &product);

        let mut cart = self
            .store
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::NotFound)?;

        let key = LineKey::new(
            product_id.clone(),
            color.filter(|c| !c.is_empty()),
            size.filter(|s| !s.is_empty()),
        );
        let item = cart.find_item_mut(&key).ok_or(CartError::ItemNotFound)?;

        if quantity > resolved.stock {
            return Err(CartError::InsufficientStock {
                available: resolved.stock,
            });
        }
        item.quantity = quantity;

        cart.recompute_total();
        Ok(self.store.save(cart).await?)
    }

    /// Remove one unit of an item: decrement when more than one is held,
    /// drop the line entirely at quantity one.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        color: Option<String>,
        size: Option<String>,
    ) -> Result<Cart, CartError> {
        require_id(user_id.as_str(), "userId")?;
        require_id(product_id.as_str(), "productId")?;

        let mut cart = self
            .store
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::NotFound)?;

        let key = LineKey::new(
            product_id.clone(),
            color.filter(|c| !c.is_empty()),
            size.filter(|s| !s.is_empty()),
        );
        let quantity = cart
            .find_item(&key)
            .map(|item| item.quantity)
            .ok_or(CartError::ItemNotFound)?;

        if quantity > 1 {
            if let Some(item) = cart.find_item_mut(&key) {
                item.quantity = quantity - 1;
            }
        } else {
            cart.remove_matching(&key);
        }

        cart.recompute_total();
        Ok(self.store.save(cart).await?)
    }

    /// Empty the user's cart. The aggregate itself persists, so clearing an
    /// already empty cart succeeds again.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &UserId) -> Result<Cart, CartError> {
        require_id(user_id.as_str(), "userId")?;

        let mut cart = self
            .store
            .find_by_user(user_id)
            .await?
            .ok_or(CartError::NotFound)?;

        cart.clear();
        Ok(self.store.save(cart).await?)
    }
}

/// Reject empty identifiers before any side effect.
fn require_id(value: &str, field: &str) -> Result<(), CartError> {
    if value.is_empty() {
        return Err(CartError::InvalidArgument(format!("{field} is required")));
    }
    Ok(())
}

/// Quantities are integers ≥ 1.
fn valid_quantity(quantity: i64) -> Result<u32, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidArgument(
            "quantity must be at least 1".to_owned(),
        ));
    }
    u32::try_from(quantity)
        .map_err(|_| CartError::InvalidArgument(format!("quantity {quantity} is out of range")))
}

/// Resolve the default variant and effective stock for a product.
///
/// A product with a variant list takes the first well-formed entry; a list
/// with no usable entry means variant-less with stock 0. A product without
/// variants uses its own stock count.
fn resolve_variant(product_id: &ProductId, product: &ProductDetails) -> ResolvedVariant {
    let (variant, warnings) = select_default_variant(&product.variants, product.stock);
    for warning in &warnings {
        warn!(product_id = %product_id, "{warning}");
    }

    match variant {
        Some(v) => ResolvedVariant {
            color: v.color,
            size: v.size,
            stock: v.stock,
        },
        None => ResolvedVariant {
            color: String::new(),
            size: String::new(),
            stock: if product.variants.is_empty() {
                product.stock
            } else {
                0
            },
        },
    }
}

/// The merge key for an operation: the caller's explicit variant choice wins,
/// otherwise the catalog's default variant applies.
fn merge_key(
    product_id: &ProductId,
    color: Option<String>,
    size: Option<String>,
    resolved: &ResolvedVariant,
) -> LineKey {
    LineKey {
        product_id: product_id.clone(),
        color: color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| resolved.color.clone()),
        size: size
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| resolved.size.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::store::MemoryCartStore;

    /// Scripted catalog stub.
    #[derive(Default)]
    struct StubCatalog {
        products: Mutex<HashMap<String, StubResponse>>,
    }

    enum StubResponse {
        Product(ProductDetails),
        NotFound,
        InvalidData,
        Unavailable,
    }

    impl StubCatalog {
        async fn insert(&self, id: &str, response: StubResponse) {
            self.products.lock().await.insert(id.to_owned(), response);
        }
    }

    #[async_trait]
    impl CatalogApi for StubCatalog {
        async fn product_details(
            &self,
            product_id: &ProductId,
        ) -> Result<ProductDetails, CatalogError> {
            match self.products.lock().await.get(product_id.as_str()) {
                Some(StubResponse::Product(details)) => Ok(details.clone()),
                Some(StubResponse::InvalidData) => Err(CatalogError::InvalidData(
                    "product record has no numeric price".to_owned(),
                )),
                Some(StubResponse::Unavailable) => {
                    Err(CatalogError::Unavailable("connection refused".to_owned()))
                }
                _ => Err(CatalogError::ProductNotFound(product_id.clone())),
            }
        }
    }

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).expect("literal decimal")
    }

    fn product(price: &str, name: &str, stock: u32) -> ProductDetails {
        ProductDetails {
            price: d(price),
            name: name.to_owned(),
            image: None,
            stock,
            variants: Vec::new(),
        }
    }

    async fn service_with(entries: Vec<(&str, StubResponse)>) -> (CartService, Arc<StubCatalog>) {
        let catalog = Arc::new(StubCatalog::default());
        for (id, response) in entries {
            catalog.insert(id, response).await;
        }
        let service = CartService::new(Arc::new(MemoryCartStore::new()), catalog.clone());
        (service, catalog)
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    #[tokio::test]
    async fn test_add_creates_cart_and_snapshots_product() {
        let (service, _) = service_with(vec![(
            "p1",
            StubResponse::Product(ProductDetails {
                image: Some("https://cdn.example.com/p1.jpg".to_owned()),
                ..product("29.99", "Linen Shirt", 5)
            }),
        )])
        .await;

        let cart = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect("add");

        assert_eq!(cart.items.len(), 1);
        let item = cart.items.first().expect("one item");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.price, d("29.99"));
        assert_eq!(item.name, "Linen Shirt");
        assert_eq!(item.image.as_deref(), Some("https://cdn.example.com/p1.jpg"));
        assert_eq!(cart.total_amount, d("29.99"));
    }

    #[tokio::test]
    async fn test_add_merges_same_key_into_one_line() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("10", "P", 9)))]).await;

        service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect("first add");
        let cart = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect("second add");

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(2));
        assert_eq!(cart.total_amount, d("20"));
    }

    #[tokio::test]
    async fn test_add_distinct_sizes_stay_distinct_lines() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("10", "P", 9)))]).await;

        service
            .add_item(&user("u1"), &pid("p1"), None, Some("M".to_owned()))
            .await
            .expect("add M");
        let cart = service
            .add_item(&user("u1"), &pid("p1"), None, Some("L".to_owned()))
            .await
            .expect("add L");

        assert_eq!(cart.items.len(), 2);
        assert!(cart.items.iter().all(|i| i.quantity == 1));
    }

    #[tokio::test]
    async fn test_stock_enforcement_leaves_cart_untouched() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("5", "P", 2)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("1st");
        service.add_item(&u, &pid("p1"), None, None).await.expect("2nd");
        let err = service
            .add_item(&u, &pid("p1"), None, None)
            .await
            .expect_err("3rd exceeds stock");
        assert!(matches!(err, CartError::InsufficientStock { available: 2 }));

        let cart = service.get_cart(&u).await.expect("cart");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(2));
        assert_eq!(cart.total_amount, d("10"));
    }

    #[tokio::test]
    async fn test_add_out_of_stock_product_never_creates_cart() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("5", "P", 0)))]).await;

        let err = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect_err("out of stock");
        assert!(matches!(err, CartError::OutOfStock));

        let err = service.get_cart(&user("u1")).await.expect_err("no cart");
        assert!(matches!(err, CartError::NotFound));
    }

    #[tokio::test]
    async fn test_default_variant_is_snapshotted() {
        let mut details = product("8", "Tee", 0);
        details.variants = vec![
            json!({"color": 3}),
            json!({"color": "red", "size": "M", "stock": 3}),
        ];
        let (service, _) = service_with(vec![("p1", StubResponse::Product(details))]).await;

        let cart = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect("add");

        let item = cart.items.first().expect("one item");
        assert_eq!(item.color, "red");
        assert_eq!(item.size, "M");

        // Same default variant merges on a repeat add.
        let cart = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect("repeat add");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(2));
    }

    #[tokio::test]
    async fn test_unusable_variant_list_means_out_of_stock() {
        let mut details = product("8", "Tee", 10);
        details.variants = vec![json!("garbage"), json!({"stock": "many"})];
        let (service, _) = service_with(vec![("p1", StubResponse::Product(details))]).await;

        let err = service
            .add_item(&user("u1"), &pid("p1"), None, None)
            .await
            .expect_err("no usable variant");
        assert!(matches!(err, CartError::OutOfStock));
    }

    #[tokio::test]
    async fn test_requested_variant_overrides_default() {
        let mut details = product("8", "Tee", 0);
        details.variants = vec![json!({"color": "red", "stock": 4})];
        let (service, _) = service_with(vec![("p1", StubResponse::Product(details))]).await;

        let cart = service
            .add_item(&user("u1"), &pid("p1"), Some("blue".to_owned()), None)
            .await
            .expect("add");
        assert_eq!(cart.items.first().map(|i| i.color.clone()), Some("blue".to_owned()));
    }

    #[tokio::test]
    async fn test_catalog_failures_map_to_cart_errors() {
        let (service, _) = service_with(vec![
            ("bad-data", StubResponse::InvalidData),
            ("down", StubResponse::Unavailable),
        ])
        .await;
        let u = user("u1");

        let err = service
            .add_item(&u, &pid("missing"), None, None)
            .await
            .expect_err("not found");
        assert!(matches!(err, CartError::ProductNotFound));

        let err = service
            .add_item(&u, &pid("bad-data"), None, None)
            .await
            .expect_err("invalid data");
        assert!(matches!(err, CartError::InvalidProductData(_)));

        let err = service
            .add_item(&u, &pid("down"), None, None)
            .await
            .expect_err("unavailable");
        assert!(matches!(err, CartError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_update_sets_quantity_and_keeps_snapshot() {
        let (service, catalog) =
            service_with(vec![("p1", StubResponse::Product(product("29.99", "P", 5)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");

        // The catalog price moves; the snapshot must not.
        catalog
            .insert("p1", StubResponse::Product(product("99.99", "P", 5)))
            .await;

        let cart = service
            .update_item(&u, &pid("p1"), None, None, 5)
            .await
            .expect("update to stock boundary");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(5));
        assert_eq!(cart.items.first().map(|i| i.price), Some(d("29.99")));
        assert_eq!(cart.total_amount, d("149.95"));
    }

    #[tokio::test]
    async fn test_update_beyond_stock_fails_with_available() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("2", "P", 5)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        let err = service
            .update_item(&u, &pid("p1"), None, None, 6)
            .await
            .expect_err("beyond stock");
        assert!(matches!(err, CartError::InsufficientStock { available: 5 }));

        let cart = service.get_cart(&u).await.expect("cart");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(1));
    }

    #[tokio::test]
    async fn test_update_revalidates_product() {
        let (service, catalog) =
            service_with(vec![("p1", StubResponse::Product(product("3", "P", 5)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        catalog.insert("p1", StubResponse::NotFound).await;

        let err = service
            .update_item(&u, &pid("p1"), None, None, 2)
            .await
            .expect_err("product gone from catalog");
        assert!(matches!(err, CartError::ProductNotFound));

        // The failed update left the cart untouched.
        let cart = service.get_cart(&u).await.expect("cart");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(1));
    }

    #[tokio::test]
    async fn test_update_rejects_non_positive_quantity() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("3", "P", 5)))]).await;

        for quantity in [0, -3] {
            let err = service
                .update_item(&user("u1"), &pid("p1"), None, None, quantity)
                .await
                .expect_err("invalid quantity");
            assert!(matches!(err, CartError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_update_missing_item_is_item_not_found() {
        let (service, _) = service_with(vec![
            ("p1", StubResponse::Product(product("3", "P", 5))),
            ("p2", StubResponse::Product(product("4", "Q", 5))),
        ])
        .await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        let err = service
            .update_item(&u, &pid("p2"), None, None, 2)
            .await
            .expect_err("p2 never added");
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[tokio::test]
    async fn test_remove_decrements_then_deletes() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("10", "P", 9)))]).await;
        let u = user("u1");

        for _ in 0..3 {
            service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        }

        let cart = service
            .remove_item(&u, &pid("p1"), None, None)
            .await
            .expect("remove");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(2));
        assert_eq!(cart.total_amount, d("20"));

        service.remove_item(&u, &pid("p1"), None, None).await.expect("remove");
        let cart = service
            .remove_item(&u, &pid("p1"), None, None)
            .await
            .expect("remove last unit");
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_amount, Decimal::ZERO);

        let err = service
            .remove_item(&u, &pid("p1"), None, None)
            .await
            .expect_err("nothing left to remove");
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("10", "P", 9)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");

        for _ in 0..2 {
            let cart = service.clear_cart(&u).await.expect("clear");
            assert!(cart.items.is_empty());
            assert_eq!(cart.total_amount, Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_operations_on_missing_cart() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("10", "P", 9)))]).await;
        let u = user("nobody");

        assert!(matches!(
            service.get_cart(&u).await.expect_err("get"),
            CartError::NotFound
        ));
        assert!(matches!(
            service.cart_details(&u).await.expect_err("details"),
            CartError::NotFound
        ));
        assert!(matches!(
            service
                .update_item(&u, &pid("p1"), None, None, 1)
                .await
                .expect_err("update"),
            CartError::NotFound
        ));
        assert!(matches!(
            service
                .remove_item(&u, &pid("p1"), None, None)
                .await
                .expect_err("remove"),
            CartError::NotFound
        ));
        assert!(matches!(
            service.clear_cart(&u).await.expect_err("clear"),
            CartError::NotFound
        ));

        // addItem is the one lazy-creation path.
        let cart = service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        assert_eq!(cart.items.len(), 1);
        assert!(service.get_cart(&u).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_identifiers_are_invalid_arguments() {
        let (service, _) = service_with(vec![]).await;

        assert!(matches!(
            service.get_cart(&user("")).await.expect_err("empty user"),
            CartError::InvalidArgument(_)
        ));
        assert!(matches!(
            service
                .add_item(&user("u1"), &pid(""), None, None)
                .await
                .expect_err("empty product"),
            CartError::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn test_merged_line_keeps_first_price_snapshot() {
        let (service, catalog) =
            service_with(vec![("p1", StubResponse::Product(product("10.00", "P", 9)))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        catalog
            .insert("p1", StubResponse::Product(product("12.00", "P", 9)))
            .await;

        let cart = service.add_item(&u, &pid("p1"), None, None).await.expect("re-add");
        assert_eq!(cart.items.first().map(|i| i.price), Some(d("10.00")));
        assert_eq!(cart.total_amount, d("20.00"));
    }

    #[tokio::test]
    async fn test_total_invariant_across_mixed_operations() {
        let (service, _) = service_with(vec![
            ("p1", StubResponse::Product(product("29.99", "P", 5))),
            ("p2", StubResponse::Product(product("0.10", "Q", 50))),
        ])
        .await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add p1");
        service.add_item(&u, &pid("p2"), None, None).await.expect("add p2");
        service.add_item(&u, &pid("p2"), None, None).await.expect("add p2");
        service.update_item(&u, &pid("p1"), None, None, 3).await.expect("update");
        let cart = service.remove_item(&u, &pid("p2"), None, None).await.expect("remove");

        let expected: Decimal = cart.items.iter().map(LineItem::line_total).sum();
        assert_eq!(cart.total_amount, expected);
        assert_eq!(cart.total_amount, d("90.07"));
    }

    #[tokio::test]
    async fn test_end_to_end_reference_scenario() {
        let (service, _) =
            service_with(vec![("p1", StubResponse::Product(product("29.99", "P", 5)))]).await;
        let u = user("u1");

        let cart = service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(1));
        assert_eq!(cart.total_amount, d("29.99"));

        let cart = service.add_item(&u, &pid("p1"), None, None).await.expect("add again");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(2));
        assert_eq!(cart.total_amount, d("59.98"));

        let cart = service
            .update_item(&u, &pid("p1"), None, None, 5)
            .await
            .expect("update to 5");
        assert_eq!(cart.total_amount, d("149.95"));

        for _ in 0..4 {
            service.remove_item(&u, &pid("p1"), None, None).await.expect("remove");
        }
        let cart = service.get_cart(&u).await.expect("cart");
        assert_eq!(cart.items.first().map(|i| i.quantity), Some(1));
        assert_eq!(cart.total_amount, d("29.99"));

        let cart = service.remove_item(&u, &pid("p1"), None, None).await.expect("final remove");
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_details_projection() {
        let mut details = product("29.99", "Linen Shirt", 5);
        details.variants = vec![json!({"color": "red", "size": "M", "stock": 5})];
        details.image = Some("https://cdn.example.com/p1.jpg".to_owned());
        let (service, _) = service_with(vec![("p1", StubResponse::Product(details))]).await;
        let u = user("u1");

        service.add_item(&u, &pid("p1"), None, None).await.expect("add");
        let details = service.cart_details(&u).await.expect("details");

        let line = details.items.first().expect("one line");
        assert_eq!(line.description, "Linen Shirt");
        assert_eq!(line.color, "red");
        assert_eq!(line.size, "M");
        assert_eq!(line.price, d("30"));
    }
}
