//! HTTP catalog client implementation.
//!
//! Talks to the catalog service's `GET /products/{id}` endpoint. Responses
//! use an envelope `{ "code": 200, "data": <product record> }` where the
//! record is either a JSON object or a JSON-encoded string - both occur in
//! the wild and both are accepted here.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use quince_core::ProductId;

use super::{CatalogApi, CatalogError, ProductDetails};

/// Client for the product catalog service.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

/// Response envelope returned by the catalog service.
#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    code: i64,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl HttpCatalogClient {
    /// Create a new catalog client.
    ///
    /// Every request is bounded by `timeout`; a request that exceeds it is
    /// reported as [`CatalogError::Unavailable`], never blocks the caller
    /// indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying client cannot be built.
    pub fn new(base_url: &url::Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn product_details(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductDetails, CatalogError> {
        let url = format!("{}/products/{}", self.base_url, product_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            debug!(%status, "catalog returned non-success status");
            return Err(CatalogError::ProductNotFound(product_id.clone()));
        }

        let envelope: ProductEnvelope = serde_json::from_str(&body).map_err(|e| {
            CatalogError::InvalidData(format!("malformed catalog envelope: {e}"))
        })?;

        if envelope.code != 200 {
            debug!(code = envelope.code, "catalog reported failure code");
            return Err(CatalogError::ProductNotFound(product_id.clone()));
        }

        let data = envelope
            .data
            .ok_or_else(|| CatalogError::InvalidData("envelope has no data".to_owned()))?;

        parse_product(data)
    }
}

/// Parse the product record out of the envelope's `data` field.
///
/// Required: `price` (JSON number), `name` (non-empty string). Optional:
/// `imageUrl`, `stock` (non-negative integer; anything else counts as 0),
/// `variants` (kept raw for [`super::select_default_variant`]).
fn parse_product(data: serde_json::Value) -> Result<ProductDetails, CatalogError> {
    // Some catalog deployments double-encode the record as a JSON string.
    let record = match data {
        serde_json::Value::String(inner) => serde_json::from_str(&inner).map_err(|e| {
            CatalogError::InvalidData(format!("data is not a JSON record: {e}"))
        })?,
        other => other,
    };

    let serde_json::Value::Object(fields) = record else {
        return Err(CatalogError::InvalidData(
            "product record is not an object".to_owned(),
        ));
    };

    let price = match fields.get("price") {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map_err(|e| CatalogError::InvalidData(format!("unparseable price {n}: {e}")))?,
        _ => {
            return Err(CatalogError::InvalidData(
                "product record has no numeric price".to_owned(),
            ));
        }
    };

    let name = match fields.get("name") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            return Err(CatalogError::InvalidData(
                "product record has no name".to_owned(),
            ));
        }
    };

    let image = fields
        .get("imageUrl")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned);

    let stock = fields
        .get("stock")
        .and_then(serde_json::Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    let variants = match fields.get("variants") {
        Some(serde_json::Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    };

    Ok(ProductDetails {
        price,
        name,
        image,
        stock,
        variants,
    })
}
