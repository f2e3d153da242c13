use shared::protocol::{ActionField, NotificationAction, NotificationDraft};

/// Local editing state for a notification. Nothing here is validated:
/// empty titles, messages and action fields are forwarded as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationComposer {
    draft: NotificationDraft,
}

impl NotificationComposer {
    pub fn title(&self) -> &str {
        &self.draft.title
    }

    pub fn message(&self) -> &str {
        &self.draft.message
    }

    pub fn actions(&self) -> &[NotificationAction] {
        &self.draft.actions
    }

    pub fn draft(&self) -> &NotificationDraft {
        &self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.draft.message = message.into();
    }

    /// Appends an empty action and returns its index.
    pub fn add_action(&mut self) -> usize {
        self.draft.actions.push(NotificationAction::default());
        self.draft.actions.len() - 1
    }

    /// Returns `false` when `index` is out of range.
    pub fn update_action(
        &mut self,
        index: usize,
        field: ActionField,
        value: impl Into<String>,
    ) -> bool {
        match self.draft.actions.get_mut(index) {
            Some(action) => {
                *action.field_mut(field) = value.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_action(&mut self, index: usize) -> Option<NotificationAction> {
        (index < self.draft.actions.len()).then(|| self.draft.actions.remove(index))
    }

    /// Hands the current content to `on_submit`. The draft is left as is.
    pub fn submit<F, R>(&self, on_submit: F) -> R
    where
        F: FnOnce(&str, &str, &[NotificationAction]) -> R,
    {
        on_submit(&self.draft.title, &self.draft.message, &self.draft.actions)
    }
}
