//! Command-dispatch RPC transport.
//!
//! Internal peers (order and checkout services) talk to the cart over a
//! single dispatch endpoint: `POST /rpc/{method}` with a JSON payload. Unlike
//! the public REST surface, payloads carry the already-resolved `userId` -
//! callers on this surface sit behind the service mesh and have performed
//! identity verification themselves.
//!
//! Every method maps onto the same `CartService` operation the REST handlers
//! use; this module owns no cart rules.
//!
//! # Methods
//!
//! | Method             | Payload                                          | Result                 |
//! |--------------------|--------------------------------------------------|------------------------|
//! | `cart.get`         | `{ userId }`                                     | full cart              |
//! | `cart.details`     | `{ userId }`                                     | trimmed item list      |
//! | `cart.add_item`    | `{ userId, productId, color?, size? }`           | full cart              |
//! | `cart.update_item` | `{ userId, productId, quantity, color?, size? }` | full cart              |
//! | `cart.remove_item` | `{ userId, productId, color?, size? }`           | full cart              |
//! | `cart.clear`       | `{ userId }`                                     | `{ success, cart }`    |

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use quince_core::{ProductId, UserId};

use crate::error::AppError;
use crate::service::CartError;
use crate::state::AppState;

/// Payload accepted by every RPC method; methods read the fields they need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcPayload {
    #[serde(default)]
    user_id: Option<UserId>,
    #[serde(default)]
    product_id: Option<ProductId>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    quantity: Option<i64>,
}

impl RpcPayload {
    fn user_id(&self) -> Result<&UserId, AppError> {
        self.user_id
            .as_ref()
            .ok_or_else(|| missing_field("userId"))
    }

    fn product_id(&self) -> Result<&ProductId, AppError> {
        self.product_id
            .as_ref()
            .ok_or_else(|| missing_field("productId"))
    }

    fn quantity(&self) -> Result<i64, AppError> {
        self.quantity.ok_or_else(|| missing_field("quantity"))
    }
}

fn missing_field(field: &str) -> AppError {
    AppError::Cart(CartError::InvalidArgument(format!("{field} is required")))
}

/// Create the RPC dispatch router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/{method}", post(dispatch))
}

/// Dispatch one RPC method.
#[instrument(skip(state, payload), fields(method = %method))]
async fn dispatch(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(payload): Json<RpcPayload>,
) -> Response {
    match handle(&state, &method, payload).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn handle(
    state: &AppState,
    method: &str,
    payload: RpcPayload,
) -> Result<Response, AppError> {
    let cart = state.cart();
    match method {
        "cart.get" => {
            let result = cart.get_cart(payload.user_id()?).await?;
            Ok(Json(result).into_response())
        }
        "cart.details" => {
            let result = cart.cart_details(payload.user_id()?).await?;
            Ok(Json(result).into_response())
        }
        "cart.add_item" => {
            let result = cart
                .add_item(
                    payload.user_id()?,
                    payload.product_id()?,
                    payload.color.clone(),
                    payload.size.clone(),
                )
                .await?;
            Ok((StatusCode::CREATED, Json(result)).into_response())
        }
        "cart.update_item" => {
            let result = cart
                .update_item(
                    payload.user_id()?,
                    payload.product_id()?,
                    payload.color.clone(),
                    payload.size.clone(),
                    payload.quantity()?,
                )
                .await?;
            Ok(Json(result).into_response())
        }
        "cart.remove_item" => {
            let result = cart
                .remove_item(
                    payload.user_id()?,
                    payload.product_id()?,
                    payload.color.clone(),
                    payload.size.clone(),
                )
                .await?;
            Ok(Json(result).into_response())
        }
        "cart.clear" => {
            let result = cart.clear_cart(payload.user_id()?).await?;
            Ok(Json(json!({ "success": true, "cart": result })).into_response())
        }
        unknown => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "kind": "unknown_method",
                    "message": format!("unknown method {unknown}"),
                }
            })),
        )
            .into_response()),
    }
}
