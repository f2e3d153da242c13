use std::collections::BTreeSet;

use shared::domain::UserId;

use crate::store::SubscriptionStore;

/// Users picked for a targeted send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    users: BTreeSet<UserId>,
}

impl SelectionSet {
    /// Flips membership of `user_id`; returns whether it is now selected.
    pub fn toggle(&mut self, user_id: &UserId) -> bool {
        if self.users.remove(user_id) {
            false
        } else {
            self.users.insert(user_id.clone());
            true
        }
    }

    /// Selects every user in `store`, or clears the selection if that is
    /// already the case.
    pub fn select_all(&mut self, store: &SubscriptionStore) {
        if self.is_fully_selected(store) {
            self.users.clear();
        } else {
            self.users = store.user_ids().cloned().collect();
        }
    }

    pub fn is_fully_selected(&self, store: &SubscriptionStore) -> bool {
        store.user_ids().all(|user_id| self.users.contains(user_id))
    }

    /// Drops users that are no longer in `store`; returns how many went.
    pub fn retain_known(&mut self, store: &SubscriptionStore) -> usize {
        let before = self.users.len();
        self.users.retain(|user_id| store.contains(user_id));
        before - self.users.len()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.users.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.users.iter()
    }

    pub fn to_vec(&self) -> Vec<UserId> {
        self.users.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::domain::{SubscriptionKeys, SubscriptionRecord};

    use super::*;

    fn store_of(ids: &[&str]) -> SubscriptionStore {
        let mut store = SubscriptionStore::default();
        store.replace(
            ids.iter()
                .map(|id| {
                    (
                        UserId::from(*id),
                        SubscriptionRecord {
                            endpoint: format!("https://push.example/{id}"),
                            keys: SubscriptionKeys {
                                auth: "auth".into(),
                                p256dh: "p256".into(),
                            },
                        },
                    )
                })
                .collect(),
            Utc::now(),
        );
        store
    }

    #[test]
    fn toggle_twice_restores_selection() {
        let mut selection = SelectionSet::default();
        selection.toggle(&"u1".into());
        let before = selection.clone();

        assert!(selection.toggle(&"u2".into()));
        assert!(!selection.toggle(&"u2".into()));
        assert_eq!(selection, before);
    }

    #[test]
    fn select_all_twice_returns_to_empty() {
        let store = store_of(&["u1", "u2"]);
        let mut selection = SelectionSet::default();

        selection.select_all(&store);
        assert_eq!(selection.to_vec(), vec![UserId::from("u1"), UserId::from("u2")]);

        selection.select_all(&store);
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_fills_a_partial_selection() {
        let store = store_of(&["u1", "u2", "u3"]);
        let mut selection = SelectionSet::default();
        selection.toggle(&"u2".into());

        selection.select_all(&store);
        assert_eq!(selection.len(), 3);
        assert!(selection.is_fully_selected(&store));
    }

    #[test]
    fn retain_known_prunes_removed_users() {
        let mut selection = SelectionSet::default();
        selection.toggle(&"u1".into());
        selection.toggle(&"u2".into());

        let removed = selection.retain_known(&store_of(&["u1"]));
        assert_eq!(removed, 1);
        assert!(selection.contains(&"u1".into()));
        assert!(!selection.contains(&"u2".into()));
    }
}
