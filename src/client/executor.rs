//! Authenticated request execution.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::{
    client::{error::CartError, session::Session},
    config::ClientConfig,
    response::{ApiResponse, ErrorData},
};

/// Sends a request on behalf of the signed-in user.
///
/// Implementations attach the bearer credential and map authorization
/// failures to [`CartError::Unauthenticated`] / [`CartError::Forbidden`].
/// On success the decoded JSON body is returned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, CartError>;
}

/// [`RequestExecutor`] over `reqwest`, reading the token from a [`Session`].
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    http: Client,
    base_url: String,
    session: Session,
}

impl HttpExecutor {
    /// # Errors
    ///
    /// Fails when the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, CartError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, CartError> {
        let token = self.session.bearer().ok_or(CartError::Unauthenticated)?;
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.http.request(method.clone(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error = response
            .json::<ApiResponse<ErrorData>>()
            .await
            .ok()
            .and_then(|envelope| envelope.data);
        let err = CartError::from_status(status, error);

        match &err {
            CartError::Unauthenticated => {
                tracing::warn!(%method, path, "credential rejected, signing out");
                self.session.sign_out();
            }
            CartError::Forbidden => tracing::warn!(%method, path, "access forbidden"),
            _ => tracing::debug!(%method, path, %status, error = %err, "request failed"),
        }
        Err(err)
    }
}
