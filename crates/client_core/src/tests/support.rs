//! In-process stand-in for the subscription backend, served over real HTTP.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use shared::{
    domain::{SubscriptionKeys, SubscriptionRecord, UserId},
    protocol::SubscriptionsResponse,
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    pub subscriptions: Arc<Mutex<SubscriptionsResponse>>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    failures: Arc<Mutex<HashMap<String, StatusCode>>>,
    malformed_subscriptions: Arc<Mutex<bool>>,
}

pub(crate) fn record(user: &str) -> SubscriptionRecord {
    SubscriptionRecord {
        endpoint: format!("https://push.example/{user}"),
        keys: SubscriptionKeys {
            auth: format!("auth-{user}"),
            p256dh: format!("p256-{user}"),
        },
    }
}

impl MockBackend {
    pub fn with_users(users: &[&str]) -> Self {
        let entries: SubscriptionsResponse = users
            .iter()
            .map(|user| (UserId::from(*user), record(user)))
            .collect();
        Self {
            subscriptions: Arc::new(Mutex::new(entries)),
            ..Self::default()
        }
    }

    pub async fn fail(&self, path: &str, status: StatusCode) {
        self.failures.lock().await.insert(path.to_string(), status);
    }

    pub async fn recover(&self, path: &str) {
        self.failures.lock().await.remove(path);
    }

    pub async fn serve_malformed_subscriptions(&self) {
        *self.malformed_subscriptions.lock().await = true;
    }

    pub async fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub async fn spawn(&self) -> Result<String> {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new()
            .route("/subscriptions", get(list_subscriptions))
            .route("/notify", post(record_post))
            .route("/notify-user", post(record_post))
            .route("/unsubscribe", post(record_post))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{addr}"))
    }

    async fn push(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.requests.lock().await.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            content_type,
            body,
        });
    }

    async fn failure_for(&self, uri: &Uri) -> Option<StatusCode> {
        self.failures.lock().await.get(uri.path()).copied()
    }
}

async fn list_subscriptions(
    State(backend): State<MockBackend>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    backend.push(Method::GET, &uri, &headers, None).await;
    if let Some(status) = backend.failure_for(&uri).await {
        return status.into_response();
    }
    if *backend.malformed_subscriptions.lock().await {
        return (
            [(header::CONTENT_TYPE, "application/json")],
            "[\"not\", \"a\", \"mapping\"]",
        )
            .into_response();
    }
    Json(backend.subscriptions.lock().await.clone()).into_response()
}

async fn record_post(
    State(backend): State<MockBackend>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    backend
        .push(Method::POST, &uri, &headers, body.clone())
        .await;
    if let Some(status) = backend.failure_for(&uri).await {
        return status;
    }
    if uri.path() == "/unsubscribe" {
        if let Some(user) = body
            .as_ref()
            .and_then(|body| body.get("userid"))
            .and_then(Value::as_str)
        {
            backend.subscriptions.lock().await.remove(user);
        }
    }
    StatusCode::OK
}
