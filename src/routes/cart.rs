use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{CartItemRequest, CartList, SetQuantityRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Cart,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carts))
        .route("/me", get(my_cart))
        .route("/me/add-one", post(add_one))
        .route("/me/remove-one", post(remove_one))
        .route("/me/clear-item", post(clear_item))
        .route("/me/quantity", put(set_quantity))
        .route("/{owner_id}", get(cart_of_owner))
}

#[utoipa::path(
    get,
    path = "/api/carts/me",
    responses(
        (status = 200, description = "Current user's cart, created empty on first access", body = ApiResponse<Cart>),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn my_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    Ok(Json(cart_service::my_cart(&state, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/carts/me/add-one",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Cart after adding one unit", body = ApiResponse<Cart>),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "Product unknown, inactive or out of stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_one(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let Json(payload) = payload?;
    Ok(Json(cart_service::add_one(&state, &user, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/carts/me/remove-one",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Cart after removing one unit; unchanged when the product is absent", body = ApiResponse<Cart>),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_one(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let Json(payload) = payload?;
    Ok(Json(cart_service::remove_one(&state, &user, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/carts/me/clear-item",
    request_body = CartItemRequest,
    responses(
        (status = 200, description = "Cart without the product's line", body = ApiResponse<Cart>),
        (status = 401, description = "Missing or invalid bearer token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_item(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CartItemRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let Json(payload) = payload?;
    Ok(Json(cart_service::clear_item(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/carts/me/quantity",
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Cart with the line set to the quantity; 0 clears it", body = ApiResponse<Cart>),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "Product unknown, inactive or out of stock"),
        (status = 422, description = "Negative quantity"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn set_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let Json(payload) = payload?;
    Ok(Json(cart_service::set_quantity(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/carts",
    responses(
        (status = 200, description = "All carts (admin only)", body = ApiResponse<CartList>),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn list_carts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartList>>> {
    Ok(Json(cart_service::list_carts(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/carts/{owner_id}",
    params(
        ("owner_id" = Uuid, Path, description = "Cart owner's user ID")
    ),
    responses(
        (status = 200, description = "The owner's cart (admin only)", body = ApiResponse<Cart>),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Owner has no cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_of_owner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(owner_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    Ok(Json(cart_service::cart_of_owner(&state, &user, owner_id).await?))
}
