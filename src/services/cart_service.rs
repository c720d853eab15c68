use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{CartItemRequest, CartList, SetQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Book, Cart, CartLine, ProductId},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn my_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    let cart = with_cart(state, user, |_| Ok(())).await?;
    Ok(ApiResponse::success("OK", cart, None))
}

pub async fn add_one(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    let product_id = payload.product_id;
    let book = state.catalog.get(product_id).await;
    let line_id = state.next_line_id();

    let cart = with_cart(state, user, |cart| {
        let desired = cart.quantity_of(product_id) + 1;
        let book = supply(book, product_id, desired)?;
        if !cart.increment(product_id) {
            cart.upsert_line(CartLine::new(line_id, &book, 1));
        }
        Ok(())
    })
    .await?;

    log_audit(
        Some(user.user_id),
        "cart_add_one",
        Some("carts"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(ApiResponse::success("Added to cart", cart, None))
}

pub async fn remove_one(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    let product_id = payload.product_id;
    let cart = with_cart(state, user, |cart| {
        cart.decrement(product_id);
        Ok(())
    })
    .await?;

    log_audit(
        Some(user.user_id),
        "cart_remove_one",
        Some("carts"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(ApiResponse::success("Removed from cart", cart, None))
}

pub async fn clear_item(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    let product_id = payload.product_id;
    let cart = with_cart(state, user, |cart| {
        cart.remove_line(product_id);
        Ok(())
    })
    .await?;

    log_audit(
        Some(user.user_id),
        "cart_clear_item",
        Some("carts"),
        Some(serde_json::json!({ "product_id": product_id })),
    );
    Ok(ApiResponse::success("Cleared from cart", cart, None))
}

pub async fn set_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: SetQuantityRequest,
) -> AppResult<ApiResponse<Cart>> {
    let SetQuantityRequest {
        product_id,
        quantity,
    } = payload;
    if quantity < 0 {
        return Err(AppError::InvalidQuantity(quantity));
    }

    let book = if quantity > 0 {
        state.catalog.get(product_id).await
    } else {
        None
    };
    let line_id = state.next_line_id();

    let cart = with_cart(state, user, |cart| {
        if quantity == 0 {
            cart.remove_line(product_id);
            return Ok(());
        }
        let book = supply(book, product_id, quantity)?;
        if !cart.set_line_quantity(product_id, quantity) {
            cart.upsert_line(CartLine::new(line_id, &book, quantity));
        }
        Ok(())
    })
    .await?;

    log_audit(
        Some(user.user_id),
        "cart_set_quantity",
        Some("carts"),
        Some(serde_json::json!({ "product_id": product_id, "quantity": quantity })),
    );
    Ok(ApiResponse::success("Quantity updated", cart, None))
}

pub async fn list_carts(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    ensure_admin(user)?;
    let carts = state.carts.read().await;
    let mut items: Vec<Cart> = carts.values().cloned().collect();
    items.sort_by_key(|cart| cart.owner_id);

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn cart_of_owner(
    state: &AppState,
    user: &AuthUser,
    owner_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    ensure_admin(user)?;
    let cart = state
        .carts
        .read()
        .await
        .get(&owner_id)
        .cloned()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", cart, None))
}

// Runs `apply` against the caller's cart, creating an empty one on first use.
// The cart is only written back when `apply` succeeds.
async fn with_cart<F>(state: &AppState, user: &AuthUser, apply: F) -> AppResult<Cart>
where
    F: FnOnce(&mut Cart) -> AppResult<()>,
{
    let mut carts = state.carts.write().await;
    let cart = carts
        .entry(user.user_id)
        .or_insert_with(|| Cart::empty(user.user_id));

    let mut updated = cart.clone();
    apply(&mut updated)?;
    *cart = updated.clone();
    Ok(updated)
}

fn supply(book: Option<Book>, product_id: ProductId, quantity: i32) -> AppResult<Book> {
    let unavailable = |reason| AppError::ProductUnavailable { product_id, reason };
    let book = book.ok_or_else(|| unavailable("not found"))?;
    if !book.active {
        return Err(unavailable("inactive"));
    }
    if !book.can_supply(quantity) {
        return Err(unavailable("exceeds available stock"));
    }
    Ok(book)
}
