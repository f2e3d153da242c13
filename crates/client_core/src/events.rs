//! Events fanned out by the dashboard controller, including operator alerts.

use crate::controller::{OperationKey, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Failure,
}

/// Text meant for the operator. Never carries HTTP status or response body;
/// those only go to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub operation: OperationKind,
    pub message: String,
}

impl Alert {
    pub fn failure(operation: OperationKind) -> Self {
        let message = match operation {
            OperationKind::Refresh => "Failed to load subscriptions.",
            OperationKind::NotifyAll | OperationKind::NotifySelected => {
                "Failed to send notifications."
            }
            OperationKind::NotifyUser => "Failed to send notification.",
            OperationKind::Unsubscribe => "Failed to unsubscribe.",
        };
        Self {
            severity: AlertSeverity::Failure,
            operation,
            message: message.to_string(),
        }
    }

    /// `None` for operations that complete silently.
    pub fn success(key: &OperationKey) -> Option<Self> {
        let message = match (key.kind, key.target.as_ref()) {
            (OperationKind::Refresh, _) => return None,
            (OperationKind::NotifyAll, _) => "Notifications sent to all subscriptions.".to_string(),
            (OperationKind::NotifySelected, _) => {
                "Notifications sent to selected users.".to_string()
            }
            (OperationKind::NotifyUser, Some(user_id)) => {
                format!("Notification sent to user {user_id}")
            }
            (OperationKind::Unsubscribe, Some(user_id)) => format!("Unsubscribed user {user_id}"),
            (OperationKind::NotifyUser | OperationKind::Unsubscribe, None) => return None,
        };
        Some(Self {
            severity: AlertSeverity::Info,
            operation: key.kind,
            message,
        })
    }

    pub fn is_failure(&self) -> bool {
        self.severity == AlertSeverity::Failure
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    StoreReplaced {
        count: usize,
        pruned_selection: usize,
    },
    Busy {
        key: OperationKey,
        in_flight: bool,
    },
    Alert(Alert),
}
