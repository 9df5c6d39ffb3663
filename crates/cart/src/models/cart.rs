//! Cart domain types.
//!
//! A `Cart` is one mutable aggregate per user: an ordered list of line items
//! plus a derived total. The serialized shape (camelCase) is both the wire
//! format and the persisted document format.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use quince_core::{ProductId, UserId};

/// Identity of a line item within a cart.
///
/// Two items with the same product but different variant selections are
/// distinct lines. The empty string means "no variant".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
}

impl LineKey {
    /// Build a key from a product and optional variant discriminators.
    pub fn new(product_id: ProductId, color: Option<String>, size: Option<String>) -> Self {
        Self {
            product_id,
            color: color.unwrap_or_default(),
            size: size.unwrap_or_default(),
        }
    }
}

/// A single line in a cart.
///
/// `price` is a snapshot of the unit price at the time the item was added;
/// later catalog price changes do not alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size: String,
}

impl LineItem {
    /// The key this line merges under.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }

    /// Whether this line matches the given merge key.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.color == key.color && self.size == key.size
    }

    /// Exact decimal extension of this line (`price` × `quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A user's cart aggregate.
///
/// `total_amount` is derived; callers never set it directly. `version` is the
/// optimistic concurrency token checked by the store on save (0 until first
/// persisted). Timestamps are owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: i64,
}

impl Cart {
    /// Create an empty, not-yet-persisted cart.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Find the line matching a merge key.
    #[must_use]
    pub fn find_item(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Find the line matching a merge key, mutably.
    pub fn find_item_mut(&mut self, key: &LineKey) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.matches(key))
    }

    /// Drop the line matching a merge key. Returns whether a line was removed.
    pub fn remove_matching(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !item.matches(key));
        self.items.len() != before
    }

    /// Recompute `total_amount` from the current items.
    ///
    /// Must be called after every mutation; the invariant
    /// `total_amount == Σ(price × quantity)` holds exactly, with no float
    /// arithmetic anywhere on the path.
    pub fn recompute_total(&mut self) {
        self.total_amount = self.items.iter().map(LineItem::line_total).sum();
    }

    /// Empty the cart. The aggregate itself persists.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_amount = Decimal::ZERO;
    }
}

/// Read-only cart projection for internal RPC consumers.
///
/// Strips images and rounds unit prices to whole units, matching what the
/// downstream order services expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartDetails {
    pub items: Vec<DetailLine>,
}

/// One line of a [`CartDetails`] projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailLine {
    pub product_id: ProductId,
    pub description: String,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl From<&Cart> for CartDetails {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| DetailLine {
                    product_id: item.product_id.clone(),
                    description: item.name.clone(),
                    color: item.color.clone(),
                    size: item.size.clone(),
                    quantity: item.quantity,
                    // Half-up to the nearest whole unit, not banker's rounding
                    price: item
                        .price
                        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn d(value: &str) -> Decimal {
        Decimal::from_str(value).expect("literal decimal")
    }

    fn line(product: &str, qty: u32, price: Decimal) -> LineItem {
        LineItem {
            product_id: ProductId::new(product),
            quantity: qty,
            price,
            name: format!("{product} name"),
            image: None,
            color: String::new(),
            size: String::new(),
        }
    }

    #[test]
    fn test_total_is_exact_decimal_sum() {
        let mut cart = Cart::new(UserId::new("u1"), Utc::now());
        cart.items.push(line("p1", 3, d("29.99")));
        cart.items.push(line("p2", 1, d("0.10")));
        cart.recompute_total();

        // 3 × 29.99 + 0.10, no float drift
        assert_eq!(cart.total_amount, d("90.07"));
    }

    #[test]
    fn test_merge_key_distinguishes_variants() {
        let mut red = line("p1", 1, d("10"));
        red.color = "red".to_owned();
        let plain = line("p1", 1, d("10"));

        let key = LineKey::new(ProductId::new("p1"), Some("red".to_owned()), None);
        assert!(red.matches(&key));
        assert!(!plain.matches(&key));

        let bare_key = LineKey::new(ProductId::new("p1"), None, None);
        assert!(plain.matches(&bare_key));
        assert!(!red.matches(&bare_key));
    }

    #[test]
    fn test_remove_matching_only_drops_exact_variant() {
        let mut cart = Cart::new(UserId::new("u1"), Utc::now());
        let mut small = line("p1", 2, d("5"));
        small.size = "S".to_owned();
        cart.items.push(small);
        cart.items.push(line("p1", 1, d("5")));

        let removed = cart.remove_matching(&LineKey::new(
            ProductId::new("p1"),
            None,
            Some("S".to_owned()),
        ));
        assert!(removed);
        assert_eq!(cart.items.len(), 1);
        assert!(cart.items.iter().all(|i| i.size.is_empty()));
    }

    #[test]
    fn test_clear_zeroes_total_but_keeps_aggregate() {
        let mut cart = Cart::new(UserId::new("u1"), Utc::now());
        cart.items.push(line("p1", 2, d("4.50")));
        cart.recompute_total();
        assert_eq!(cart.total_amount, d("9.00"));

        cart.clear();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_amount, Decimal::ZERO);
        assert_eq!(cart.user_id, UserId::new("u1"));
    }

    #[test]
    fn test_document_shape_is_camel_case() {
        let mut cart = Cart::new(UserId::new("u1"), Utc::now());
        cart.items.push(line("p1", 2, d("29.99")));
        cart.recompute_total();

        let doc = serde_json::to_value(&cart).expect("serialize");
        assert_eq!(doc["userId"], "u1");
        assert_eq!(doc["totalAmount"], "59.98");
        assert_eq!(doc["items"][0]["productId"], "p1");
        assert_eq!(doc["items"][0]["quantity"], 2);
        // Absent image is omitted entirely, not serialized as null
        assert!(doc["items"][0].get("image").is_none());
    }

    #[test]
    fn test_details_projection_rounds_prices() {
        let mut cart = Cart::new(UserId::new("u1"), Utc::now());
        let mut item = line("p1", 2, d("29.99"));
        item.color = "red".to_owned();
        cart.items.push(item);
        cart.recompute_total();

        let details = CartDetails::from(&cart);
        assert_eq!(details.items.len(), 1);
        let first = details.items.first().expect("one line");
        assert_eq!(first.description, "p1 name");
        assert_eq!(first.color, "red");
        assert_eq!(first.price, d("30"));
    }
}
