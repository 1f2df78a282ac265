//! Credential-injecting transport middleware.

use async_trait::async_trait;
use tracing::debug;
use workflows::ApiError;

use crate::credentials::TokenMinter;
use crate::transport::{ApiRequest, Transport};

/// Wraps a [`Transport`] so every request carries a freshly minted bearer token.
///
/// Minting happens per request, never per client: one token authorises
/// exactly one call. When minting fails the inner transport is not called.
#[derive(Debug, Clone)]
pub struct BearerAuth<T> {
    inner: T,
    minter: TokenMinter,
}

impl<T> BearerAuth<T> {
    pub fn new(inner: T, minter: TokenMinter) -> Self {
        Self { inner, minter }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for BearerAuth<T> {
    async fn send(&self, mut request: ApiRequest) -> Result<serde_json::Value, ApiError> {
        let token = self.minter.mint().map_err(|e| {
            debug!(
                operation = request.body.operation_name,
                error = %e,
                "Token was not generated, aborting API call"
            );
            ApiError::from(e)
        })?;
        request.authorization = Some(token.into_bearer_header());
        self.inner.send(request).await
    }
}
