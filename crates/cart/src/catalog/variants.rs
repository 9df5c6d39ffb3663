//! Variant normalization.
//!
//! Catalog variant lists come from an upstream we do not control and are
//! frequently sloppy: entries with numeric colors, string stock counts, or
//! entries that are not objects at all. Rather than failing a whole add over
//! one bad entry, the policy is to pick the first well-formed entry as the
//! default variant and report everything skipped as warnings. Keeping this a
//! pure function keeps the policy testable without a network in sight.

use serde_json::Value;

/// A validated variant selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Color discriminator; empty when the entry carries none.
    pub color: String,
    /// Size discriminator; empty when the entry carries none.
    pub size: String,
    /// Units available for this variant.
    pub stock: u32,
}

/// Pick the default variant from a raw catalog variant list.
///
/// Scans in order and returns the first entry whose `color` and `size` are
/// each a string or absent and whose `stock` is a non-negative integer or
/// absent. An entry with absent `stock` inherits `fallback_stock` (the
/// product-level count). Entries failing validation are skipped, each
/// producing one warning.
///
/// Returns `None` when the list is empty or no entry validates; the caller
/// then treats the product as variant-less (with stock 0 when the list was
/// non-empty but unusable).
#[must_use]
pub fn select_default_variant(
    entries: &[Value],
    fallback_stock: u32,
) -> (Option<Variant>, Vec<String>) {
    let mut warnings = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match validate_entry(entry, fallback_stock) {
            Ok(variant) => return (Some(variant), warnings),
            Err(reason) => warnings.push(format!("variant entry {index} skipped: {reason}")),
        }
    }

    (None, warnings)
}

fn validate_entry(entry: &Value, fallback_stock: u32) -> Result<Variant, String> {
    let Value::Object(fields) = entry else {
        return Err("not an object".to_owned());
    };

    let color = optional_string(fields.get("color"), "color")?;
    let size = optional_string(fields.get("size"), "size")?;
    let stock = match fields.get("stock") {
        None | Some(Value::Null) => fallback_stock,
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| format!("stock {n} is not a non-negative integer"))?,
        Some(other) => return Err(format!("stock {other} is not numeric")),
    };

    Ok(Variant { color, size, stock })
}

fn optional_string(value: Option<&Value>, field: &str) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("{field} {other} is not a string")),
    }
}
