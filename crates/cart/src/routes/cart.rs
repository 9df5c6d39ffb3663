//! Cart route handlers.
//!
//! Thin adapters only: each handler maps its request shape onto one
//! `CartService` operation and returns the full resulting cart as JSON.
//! Every rule lives in the service; the RPC transport maps onto the same
//! operations.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use quince_core::ProductId;

use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::models::Cart;
use crate::state::AppState;

/// Add item request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Update item request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemBody {
    pub quantity: i64,
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Variant discriminators for removal, as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct VariantQuery {
    pub color: Option<String>,
    pub size: Option<String>,
}

/// Get the caller's cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<Cart>> {
    let cart = state.cart().get_cart(&user_id).await?;
    Ok(Json(cart))
}

/// Add an item to the caller's cart, creating the cart if needed.
#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<AddItemBody>,
) -> Result<impl IntoResponse> {
    let cart = state
        .cart()
        .add_item(&user_id, &body.product_id, body.color, body.size)
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

/// Set the quantity of an item in the caller's cart.
#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart()
        .update_item(&user_id, &product_id, body.color, body.size, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// Remove one unit of an item from the caller's cart.
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(product_id): Path<ProductId>,
    Query(variant): Query<VariantQuery>,
) -> Result<Json<Cart>> {
    let cart = state
        .cart()
        .remove_item(&user_id, &product_id, variant.color, variant.size)
        .await?;
    Ok(Json(cart))
}

/// Clear the caller's cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<Cart>> {
    let cart = state.cart().clear_cart(&user_id).await?;
    Ok(Json(cart))
}
