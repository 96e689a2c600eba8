use crate::handlers::common::{
    created_response, json_body, no_content_response, path_param, success_response,
};
use crate::{
    auth::AuthUser,
    config::DuplicateItemPolicy,
    errors::ServiceError,
    metrics::CartOperation,
    models::{CartItem, NewCartItem},
    AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Json, Path, State,
    },
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Creates the router for cart endpoints
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shoppingcart", post(create_cart))
        .route("/v1/shoppingcart/:id", get(get_cart))
        .route(
            "/v1/shoppingcart/:id/item",
            post(add_product).delete(empty_cart),
        )
        .route("/v1/shoppingcart/:id/item/:product_id", delete(remove_product))
}

/// Body of `POST /v1/shoppingcart/{id}/item`
///
/// Missing fields read as zero and are rejected by cart validation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct AddProductRequest {
    #[serde(default)]
    #[schema(example = 5)]
    pub product_id: i64,
    #[serde(default)]
    #[schema(example = 1)]
    pub quantity: u64,
}

/// Create a shopping cart for the caller
#[utoipa::path(
    post,
    path = "/v1/shoppingcart",
    tag = "Shopping Cart",
    responses(
        (status = 201, description = "Cart created", body = crate::models::Cart),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("basic" = []))
)]
pub async fn create_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, ServiceError> {
    let result = state.carts.create_cart(user.user_id).await;
    state.metrics.record_cart_operation(CartOperation::Create, &result);

    Ok(created_response(result?))
}

/// Get a cart with its items
#[utoipa::path(
    get,
    path = "/v1/shoppingcart/{id}",
    tag = "Shopping Cart",
    params(("id" = i64, Path, description = "Shopping cart id")),
    responses(
        (status = 200, description = "Cart with items", body = crate::models::Cart),
        (status = 400, description = "Malformed cart id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("basic" = []))
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ServiceError> {
    let cart_id = path_param(id)?;

    let result = state.carts.get_cart(cart_id, user.user_id).await;
    state.metrics.record_cart_operation(CartOperation::Get, &result);

    Ok(success_response(result?))
}

/// Remove every item from a cart
#[utoipa::path(
    delete,
    path = "/v1/shoppingcart/{id}/item",
    tag = "Shopping Cart",
    params(("id" = i64, Path, description = "Shopping cart id")),
    responses(
        (status = 204, description = "Cart emptied"),
        (status = 400, description = "Malformed cart id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("basic" = []))
)]
pub async fn empty_cart(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ServiceError> {
    let cart_id = path_param(id)?;

    let result = state.carts.empty_cart(cart_id, user.user_id).await;
    state.metrics.record_cart_operation(CartOperation::Empty, &result);
    result?;

    Ok(no_content_response())
}

/// Add a product to a cart, merging with an existing line for the product
#[utoipa::path(
    post,
    path = "/v1/shoppingcart/{id}/item",
    tag = "Shopping Cart",
    params(("id" = i64, Path, description = "Shopping cart id")),
    request_body = AddProductRequest,
    responses(
        (status = 201, description = "Resulting cart line", body = CartItem),
        (status = 400, description = "Product or quantity missing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product already in cart (reject policy)", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("basic" = []))
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AddProductRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let cart_id = path_param(id)?;
    let payload = json_body(payload)?;
    let item = NewCartItem::new(cart_id, payload.product_id, payload.quantity);

    let result = add_with_policy(&state, item, user.user_id).await;
    state
        .metrics
        .record_cart_operation(CartOperation::AddProduct, &result);

    Ok(created_response(result?))
}

async fn add_with_policy(
    state: &AppState,
    item: NewCartItem,
    owner_id: i64,
) -> Result<CartItem, ServiceError> {
    if state.duplicate_item_policy == DuplicateItemPolicy::Reject {
        item.validate()?;
        let cart = state.carts.get_cart(item.cart_id, owner_id).await?;
        if cart.has_product(item.product_id) {
            debug!(
                cart_id = item.cart_id,
                product_id = item.product_id,
                "Rejecting duplicate product"
            );
            return Err(ServiceError::ItemAlreadyExists);
        }
    }

    state.carts.add_product(item, owner_id).await
}

/// Remove one product from a cart
#[utoipa::path(
    delete,
    path = "/v1/shoppingcart/{id}/item/{product_id}",
    tag = "Shopping Cart",
    params(
        ("id" = i64, Path, description = "Shopping cart id"),
        ("product_id" = i64, Path, description = "Product to remove"),
    ),
    responses(
        (status = 204, description = "Product removed"),
        (status = 400, description = "Malformed path", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Cart or product not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("basic" = []))
)]
pub async fn remove_product(
    State(state): State<AppState>,
    user: AuthUser,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, ServiceError> {
    let (cart_id, product_id) = path_param(ids)?;

    let result = state
        .carts
        .remove_product(cart_id, product_id, user.user_id)
        .await;
    state
        .metrics
        .record_cart_operation(CartOperation::RemoveProduct, &result);
    result?;

    Ok(no_content_response())
}
