//! Storefront side of the cart: session, request execution, gateway and store.

pub mod error;
pub mod executor;
pub mod gateway;
pub mod session;
pub mod store;

pub use error::{CartError, NetworkErrorKind};
pub use executor::{HttpExecutor, RequestExecutor};
pub use gateway::{CartGateway, CartIntent};
pub use session::Session;
pub use store::{CartPhase, CartStore, CartView, MutationMode, StoreOptions};

use crate::config::ClientConfig;

/// Wires an HTTP-backed store for `session` from `config`.
pub fn http_store(
    config: &ClientConfig,
    session: Session,
    options: StoreOptions,
) -> Result<CartStore<HttpExecutor>, CartError> {
    let executor = HttpExecutor::new(config, session.clone())?;
    let gateway = CartGateway::new(executor, config.retry_backoff);
    Ok(CartStore::new(gateway, session, options))
}
