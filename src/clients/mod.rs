use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{
    auth::Token,
    errors::ServiceError,
    models::{CartSnapshot, OrderPayload, UserProfile},
};

const PROFILE_PATH: &str = "/user/profile1";
const CART_PATH: &str = "/cart";
const ORDER_PATH: &str = "/order";

/// Remote commerce service boundary: fetch profile, fetch cart, submit order.
///
/// Network failures and non-2xx responses are surfaced uniformly as
/// `ServiceError::ExternalServiceError`.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    async fn fetch_profile(&self, token: &Token) -> Result<UserProfile, ServiceError>;
    async fn fetch_cart(&self, token: &Token) -> Result<CartSnapshot, ServiceError>;
    async fn submit_order(
        &self,
        token: Option<&Token>,
        payload: &OrderPayload,
    ) -> Result<(), ServiceError>;
}

/// HTTP implementation of [`CommerceApi`] over `reqwest`.
#[derive(Clone)]
pub struct HttpCommerceClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCommerceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CommerceApi for HttpCommerceClient {
    #[instrument(skip(self, token))]
    async fn fetch_profile(&self, token: &Token) -> Result<UserProfile, ServiceError> {
        let profile = self
            .client
            .get(self.url(PROFILE_PATH))
            .bearer_auth(token.as_str())
            .send()
            .await?
            .error_for_status()?
            .json::<UserProfile>()
            .await?;
        debug!("fetched user profile");
        Ok(profile)
    }

    #[instrument(skip(self, token))]
    async fn fetch_cart(&self, token: &Token) -> Result<CartSnapshot, ServiceError> {
        let snapshot = self
            .client
            .get(self.url(CART_PATH))
            .bearer_auth(token.as_str())
            .send()
            .await?
            .error_for_status()?
            .json::<CartSnapshot>()
            .await?;
        debug!(lines = snapshot.cart.len(), "fetched cart snapshot");
        Ok(snapshot)
    }

    #[instrument(skip(self, token, payload))]
    async fn submit_order(
        &self,
        token: Option<&Token>,
        payload: &OrderPayload,
    ) -> Result<(), ServiceError> {
        let mut request = self.client.post(self.url(ORDER_PATH)).json(payload);
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        request.send().await?.error_for_status()?;
        debug!("order submission accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client =
            HttpCommerceClient::new("https://api.example.com/", Duration::from_secs(10)).unwrap();
        assert_eq!(client.url(ORDER_PATH), "https://api.example.com/order");
    }
}
