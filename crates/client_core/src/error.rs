use reqwest::StatusCode;
use shared::domain::UserId;
use thiserror::Error;

use crate::controller::OperationKey;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid backend url '{base}' for {endpoint}: {source}")]
    InvalidUrl {
        base: String,
        endpoint: &'static str,
        source: url::ParseError,
    },
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Http {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("unexpected {endpoint} response body: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
}

impl GatewayError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Network { .. })
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("{0} is already in flight")]
    Busy(OperationKey),
    #[error("no users selected")]
    EmptySelection,
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("dashboard is not mounted")]
    Unmounted,
    #[error("{0} resolved after the dashboard was remounted; result discarded")]
    Superseded(OperationKey),
}

impl DashboardError {
    pub fn gateway(&self) -> Option<&GatewayError> {
        match self {
            DashboardError::Gateway(err) => Some(err),
            _ => None,
        }
    }
}
