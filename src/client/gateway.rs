//! Typed operations against the caller's server-held cart.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};

use crate::{
    client::{
        error::{CartError, NetworkErrorKind},
        executor::RequestExecutor,
    },
    models::{Cart, ProductId},
    response::ApiResponse,
};

const MY_CART: &str = "/api/carts/me";

/// A change to the cart requested by the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartIntent {
    AddOne(ProductId),
    RemoveOne(ProductId),
    ClearItem(ProductId),
    SetQuantity(ProductId, i32),
}

impl CartIntent {
    pub fn product_id(&self) -> ProductId {
        match *self {
            CartIntent::AddOne(id)
            | CartIntent::RemoveOne(id)
            | CartIntent::ClearItem(id)
            | CartIntent::SetQuantity(id, _) => id,
        }
    }

    /// Rejects input the server would refuse anyway.
    pub fn validate(&self) -> Result<(), CartError> {
        match *self {
            CartIntent::SetQuantity(_, quantity) if quantity < 0 => Err(
                CartError::InvalidQuantity(format!("quantity must not be negative, got {quantity}")),
            ),
            _ => Ok(()),
        }
    }

    /// Replaying the request yields the same cart.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, CartIntent::ClearItem(_) | CartIntent::SetQuantity(..))
    }

    /// Applies the intent to a copy of `cart` as far as it can be known locally.
    ///
    /// A product without a line has no known price yet, so adding it is left to
    /// the server and the cart is returned as is.
    pub fn provisional(&self, cart: &Cart) -> Cart {
        let mut next = cart.clone();
        match *self {
            CartIntent::AddOne(id) => {
                next.increment(id);
            }
            CartIntent::RemoveOne(id) => next.decrement(id),
            CartIntent::ClearItem(id) => next.remove_line(id),
            CartIntent::SetQuantity(id, quantity) => {
                next.set_line_quantity(id, quantity);
            }
        }
        next
    }

    fn endpoint(&self) -> (Method, &'static str, Value) {
        match *self {
            CartIntent::AddOne(id) => (Method::POST, "/api/carts/me/add-one", json!({ "product_id": id })),
            CartIntent::RemoveOne(id) => (Method::POST, "/api/carts/me/remove-one", json!({ "product_id": id })),
            CartIntent::ClearItem(id) | CartIntent::SetQuantity(id, 0) => {
                (Method::POST, "/api/carts/me/clear-item", json!({ "product_id": id }))
            }
            CartIntent::SetQuantity(id, quantity) => (
                Method::PUT,
                "/api/carts/me/quantity",
                json!({ "product_id": id, "quantity": quantity }),
            ),
        }
    }
}

/// Translates cart intents into authenticated calls and decodes the returned snapshot.
///
/// A network failure is retried once after `retry_backoff`. Add-one and
/// remove-one are only retried when the connection was never established,
/// since a timed-out increment may already have been applied.
#[derive(Debug, Clone)]
pub struct CartGateway<E> {
    executor: E,
    retry_backoff: Duration,
}

impl<E: RequestExecutor> CartGateway<E> {
    pub fn new(executor: E, retry_backoff: Duration) -> Self {
        Self {
            executor,
            retry_backoff,
        }
    }

    pub async fn fetch_own_cart(&self) -> Result<Cart, CartError> {
        self.call(Method::GET, MY_CART, None, true).await
    }

    pub async fn add_one(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.submit(CartIntent::AddOne(product_id)).await
    }

    pub async fn remove_one(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.submit(CartIntent::RemoveOne(product_id)).await
    }

    pub async fn clear_item(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.submit(CartIntent::ClearItem(product_id)).await
    }

    /// `quantity == 0` clears the line; negative quantities never leave the client.
    pub async fn set_quantity(&self, product_id: ProductId, quantity: i32) -> Result<Cart, CartError> {
        self.submit(CartIntent::SetQuantity(product_id, quantity)).await
    }

    pub async fn submit(&self, intent: CartIntent) -> Result<Cart, CartError> {
        intent.validate()?;
        let (method, path, body) = intent.endpoint();
        self.call(method, path, Some(body), intent.is_idempotent())
            .await
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        idempotent: bool,
    ) -> Result<Cart, CartError> {
        match self.round_trip(method.clone(), path, body.clone()).await {
            Err(CartError::Network { kind, message }) if idempotent || kind == NetworkErrorKind::Connect => {
                tracing::warn!(%method, path, %kind, error = %message, "cart request failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.round_trip(method, path, body).await
            }
            other => other,
        }
    }

    async fn round_trip(&self, method: Method, path: &str, body: Option<Value>) -> Result<Cart, CartError> {
        let value = self.executor.execute(method, path, body).await?;
        let envelope: ApiResponse<Cart> = serde_json::from_value(value)?;
        envelope
            .data
            .ok_or_else(|| CartError::UnexpectedResponse(format!("{path} returned no cart")))
    }
}
