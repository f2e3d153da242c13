//! HTTP boundary to the subscription backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use shared::{
    domain::UserId,
    protocol::{NotificationDraft, NotifyRequest, SubscriptionsResponse, UserRequest},
};
use tracing::debug;
use url::Url;

use crate::error::GatewayError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

pub const SUBSCRIPTIONS_ENDPOINT: &str = "/subscriptions";
pub const NOTIFY_ENDPOINT: &str = "/notify";
pub const NOTIFY_USER_ENDPOINT: &str = "/notify-user";
pub const UNSUBSCRIBE_ENDPOINT: &str = "/unsubscribe";

/// One request/response per call. Implementations never retry.
#[async_trait]
pub trait DispatchGateway: Send + Sync {
    async fn fetch_subscriptions(&self) -> Result<SubscriptionsResponse, GatewayError>;
    async fn notify_all(&self, draft: &NotificationDraft) -> Result<(), GatewayError>;
    async fn notify_selected(
        &self,
        draft: &NotificationDraft,
        users: &[UserId],
    ) -> Result<(), GatewayError>;
    async fn notify_user(&self, user_id: &UserId) -> Result<(), GatewayError>;
    async fn unsubscribe(&self, user_id: &UserId) -> Result<(), GatewayError>;
}

pub struct HttpDispatchGateway {
    http: Client,
    base_url: Url,
}

impl HttpDispatchGateway {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// `timeout` of `None` leaves requests unbounded.
    pub fn with_timeout(base_url: Url, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GatewayError::Client)?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, mut base_url: Url) -> Self {
        // Endpoints are joined relative to the base, so a path prefix such as
        // `/api` must end in a slash to survive the join.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &'static str) -> Result<Url, GatewayError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|source| GatewayError::InvalidUrl {
                base: self.base_url.to_string(),
                endpoint,
                source,
            })
    }

    async fn post_json<T>(&self, endpoint: &'static str, body: &T) -> Result<(), GatewayError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint_url(endpoint)?;
        debug!(endpoint, %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| GatewayError::Network { endpoint, source })?;
        ensure_success(endpoint, response)?;
        Ok(())
    }
}

fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::Http { endpoint, status })
    }
}

#[async_trait]
impl DispatchGateway for HttpDispatchGateway {
    async fn fetch_subscriptions(&self) -> Result<SubscriptionsResponse, GatewayError> {
        let endpoint = SUBSCRIPTIONS_ENDPOINT;
        let url = self.endpoint_url(endpoint)?;
        debug!(endpoint, %url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| GatewayError::Network { endpoint, source })?;
        let body = ensure_success(endpoint, response)?
            .bytes()
            .await
            .map_err(|source| GatewayError::Network { endpoint, source })?;
        serde_json::from_slice(&body).map_err(|source| GatewayError::Decode { endpoint, source })
    }

    async fn notify_all(&self, draft: &NotificationDraft) -> Result<(), GatewayError> {
        self.post_json(NOTIFY_ENDPOINT, &NotifyRequest::all(draft))
            .await
    }

    async fn notify_selected(
        &self,
        draft: &NotificationDraft,
        users: &[UserId],
    ) -> Result<(), GatewayError> {
        self.post_json(NOTIFY_ENDPOINT, &NotifyRequest::selected(draft, users))
            .await
    }

    async fn notify_user(&self, user_id: &UserId) -> Result<(), GatewayError> {
        self.post_json(
            NOTIFY_USER_ENDPOINT,
            &UserRequest {
                userid: user_id.clone(),
            },
        )
        .await
    }

    async fn unsubscribe(&self, user_id: &UserId) -> Result<(), GatewayError> {
        self.post_json(
            UNSUBSCRIBE_ENDPOINT,
            &UserRequest {
                userid: user_id.clone(),
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
