use chrono::{DateTime, Utc};
use shared::{
    domain::{SubscriptionRecord, UserId},
    protocol::SubscriptionsResponse,
};

/// Client-side copy of the backend's subscriptions. Only ever replaced whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionStore {
    entries: SubscriptionsResponse,
    refreshed_at: Option<DateTime<Utc>>,
}

impl SubscriptionStore {
    pub fn replace(&mut self, entries: SubscriptionsResponse, refreshed_at: DateTime<Utc>) {
        self.entries = entries;
        self.refreshed_at = Some(refreshed_at);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&SubscriptionRecord> {
        self.entries.get(user_id)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &UserId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &SubscriptionRecord)> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &SubscriptionsResponse {
        &self.entries
    }

    /// `None` until the first successful load.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}
