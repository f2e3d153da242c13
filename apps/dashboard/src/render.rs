//! Plain-text rendering of controller state for the terminal.

use client_core::{Alert, AlertSeverity, DashboardSnapshot, OperationKey};
use shared::protocol::{NotificationAction, NotificationDraft};

pub fn subscription_lines(snapshot: &DashboardSnapshot, show_selection: bool) -> Vec<String> {
    if snapshot.is_busy(&OperationKey::refresh()) {
        return vec!["Loading subscriptions...".to_string()];
    }
    if snapshot.store.is_empty() {
        return vec!["No subscriptions available".to_string()];
    }

    let mut lines = Vec::with_capacity(snapshot.store.len() + 1);
    let header = match snapshot.store.refreshed_at() {
        Some(at) => format!(
            "Subscriptions ({}, refreshed {})",
            snapshot.store.len(),
            at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => format!("Subscriptions ({})", snapshot.store.len()),
    };
    lines.push(header);

    for user_id in snapshot.store.user_ids() {
        let marker = if !show_selection {
            ""
        } else if snapshot.selection.contains(user_id) {
            "[x] "
        } else {
            "[ ] "
        };
        let busy = if snapshot.is_user_busy(user_id) {
            "  (busy)"
        } else {
            ""
        };
        lines.push(format!("  {marker}{user_id}{busy}"));
    }
    lines
}

pub fn alert_line(alert: &Alert) -> String {
    match alert.severity {
        AlertSeverity::Info => format!("[info] {}", alert.message),
        AlertSeverity::Failure => format!("[alert] {}", alert.message),
    }
}

pub fn draft_lines(draft: &NotificationDraft) -> Vec<String> {
    let mut lines = vec![
        format!("title:   {:?}", draft.title),
        format!("message: {:?}", draft.message),
    ];
    if draft.actions.is_empty() {
        lines.push("actions: none".to_string());
    } else {
        lines.push(format!("actions: {}", draft.actions.len()));
        lines.extend(action_lines(&draft.actions));
    }
    lines
}

fn action_lines(actions: &[NotificationAction]) -> Vec<String> {
    actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            format!(
                "  #{index} action={:?} title={:?} icon={:?}",
                action.action, action.title, action.icon
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use client_core::{OperationKind, SelectionSet, SubscriptionStore};
    use shared::domain::{SubscriptionKeys, SubscriptionRecord, UserId};

    use super::*;

    fn snapshot(users: &[&str]) -> DashboardSnapshot {
        let mut store = SubscriptionStore::default();
        store.replace(
            users
                .iter()
                .map(|user| {
                    (
                        UserId::from(*user),
                        SubscriptionRecord {
                            endpoint: String::new(),
                            keys: SubscriptionKeys {
                                auth: String::new(),
                                p256dh: String::new(),
                            },
                        },
                    )
                })
                .collect(),
            "2026-01-02T03:04:05Z".parse().expect("timestamp"),
        );
        DashboardSnapshot {
            mounted: true,
            store,
            selection: SelectionSet::default(),
            in_flight: Vec::new(),
        }
    }

    #[test]
    fn empty_store_renders_empty_state() {
        assert_eq!(
            subscription_lines(&snapshot(&[]), false),
            vec!["No subscriptions available".to_string()]
        );
    }

    #[test]
    fn refresh_in_flight_renders_loading() {
        let mut snapshot = snapshot(&["u1"]);
        snapshot.in_flight.push(OperationKey::refresh());
        assert_eq!(
            subscription_lines(&snapshot, false),
            vec!["Loading subscriptions...".to_string()]
        );
    }

    #[test]
    fn rows_show_selection_and_busy_markers() {
        let mut snapshot = snapshot(&["u1", "u2"]);
        snapshot.selection.toggle(&"u2".into());
        snapshot.in_flight.push(OperationKey::unsubscribe("u1".into()));

        assert_eq!(
            subscription_lines(&snapshot, true),
            vec![
                "Subscriptions (2, refreshed 2026-01-02 03:04:05 UTC)".to_string(),
                "  [ ] u1  (busy)".to_string(),
                "  [x] u2".to_string(),
            ]
        );
    }

    #[test]
    fn draft_lists_actions_by_index() {
        let draft = NotificationDraft {
            title: "Deploy".into(),
            message: String::new(),
            actions: vec![
                NotificationAction {
                    action: "open".into(),
                    title: "Open".into(),
                    icon: String::new(),
                },
                NotificationAction::default(),
            ],
        };

        assert_eq!(
            draft_lines(&draft),
            vec![
                "title:   \"Deploy\"".to_string(),
                "message: \"\"".to_string(),
                "actions: 2".to_string(),
                "  #0 action=\"open\" title=\"Open\" icon=\"\"".to_string(),
                "  #1 action=\"\" title=\"\" icon=\"\"".to_string(),
            ]
        );
        assert_eq!(
            draft_lines(&NotificationDraft::default())[2],
            "actions: none"
        );
    }

    #[test]
    fn alerts_are_tagged_by_severity() {
        assert_eq!(
            alert_line(&Alert::failure(OperationKind::NotifyAll)),
            "[alert] Failed to send notifications."
        );
    }
}
