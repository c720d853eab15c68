use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::response::ErrorData;

/// How a round-trip failed below the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request never reached the server.
    Connect,
    /// The request may or may not have been applied.
    Timeout,
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Other => "transport",
        };
        f.write_str(kind)
    }
}

/// Failures surfaced by the cart gateway and store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("network failure ({kind}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("another cart update is in progress")]
    Busy,

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl CartError {
    /// Text the storefront shows next to the cart.
    pub fn user_message(&self) -> &'static str {
        match self {
            CartError::Unauthenticated => "Please sign in to use your cart.",
            CartError::Forbidden => "You are not allowed to change this cart.",
            CartError::ProductUnavailable(_) => "This book is unavailable or out of stock.",
            CartError::InvalidQuantity(_) => "Please choose a valid quantity.",
            CartError::Network { .. } => "We couldn't reach the store. Please try again.",
            CartError::Busy => "Your cart is still updating.",
            CartError::UnexpectedResponse(_) => "Something went wrong updating your cart.",
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, CartError::Network { .. })
    }

    /// Maps a non-success reply from the cart resource onto the client taxonomy.
    pub fn from_status(status: StatusCode, body: Option<ErrorData>) -> Self {
        let detail = body
            .as_ref()
            .map(|data| data.error.clone())
            .unwrap_or_else(|| status.to_string());

        match body.as_ref().map(|data| data.code.as_str()) {
            Some("unauthorized") => return CartError::Unauthenticated,
            Some("forbidden") => return CartError::Forbidden,
            Some("product_unavailable") => return CartError::ProductUnavailable(detail),
            Some("invalid_quantity") => return CartError::InvalidQuantity(detail),
            _ => {}
        }

        match status {
            StatusCode::UNAUTHORIZED => CartError::Unauthenticated,
            StatusCode::FORBIDDEN => CartError::Forbidden,
            StatusCode::CONFLICT => CartError::ProductUnavailable(detail),
            StatusCode::UNPROCESSABLE_ENTITY => CartError::InvalidQuantity(detail),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                CartError::Network {
                    kind: NetworkErrorKind::Other,
                    message: detail,
                }
            }
            _ => CartError::UnexpectedResponse(format!("{status}: {detail}")),
        }
    }
}

impl From<reqwest::Error> for CartError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CartError::UnexpectedResponse(err.to_string());
        }
        let kind = if err.is_connect() {
            NetworkErrorKind::Connect
        } else if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else {
            NetworkErrorKind::Other
        };
        CartError::Network {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        CartError::UnexpectedResponse(err.to_string())
    }
}
