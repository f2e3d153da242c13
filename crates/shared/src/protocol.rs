use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::{SubscriptionRecord, UserId};

/// Body of `GET /subscriptions`.
pub type SubscriptionsResponse = BTreeMap<UserId, SubscriptionRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl NotificationAction {
    pub fn field(&self, field: ActionField) -> &str {
        match field {
            ActionField::Action => &self.action,
            ActionField::Title => &self.title,
            ActionField::Icon => &self.icon,
        }
    }

    pub fn field_mut(&mut self, field: ActionField) -> &mut String {
        match field {
            ActionField::Action => &mut self.action,
            ActionField::Title => &mut self.title,
            ActionField::Icon => &mut self.icon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionField {
    Action,
    Title,
    Icon,
}

impl ActionField {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionField::Action => "action",
            ActionField::Title => "title",
            ActionField::Icon => "icon",
        }
    }
}

impl fmt::Display for ActionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "action" | "key" => Ok(ActionField::Action),
            "title" => Ok(ActionField::Title),
            "icon" => Ok(ActionField::Icon),
            other => Err(format!(
                "unknown action field '{other}'; expected action, title or icon"
            )),
        }
    }
}

/// Operator-authored notification content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationDraft {
    pub fn from_parts(title: &str, message: &str, actions: &[NotificationAction]) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            actions: actions.to_vec(),
        }
    }
}

/// Body of `POST /notify`. `users` is omitted entirely for a broadcast so the
/// backend can tell the two shapes apart by its presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserId>>,
    pub title: String,
    pub message: String,
    pub actions: Vec<NotificationAction>,
}

impl NotifyRequest {
    pub fn all(draft: &NotificationDraft) -> Self {
        Self {
            users: None,
            title: draft.title.clone(),
            message: draft.message.clone(),
            actions: draft.actions.clone(),
        }
    }

    pub fn selected(draft: &NotificationDraft, users: &[UserId]) -> Self {
        Self {
            users: Some(users.to_vec()),
            ..Self::all(draft)
        }
    }
}

/// Body of `POST /notify-user` and `POST /unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    pub userid: UserId,
}
