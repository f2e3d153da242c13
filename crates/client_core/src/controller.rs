//! Dashboard controller: owns the subscription store and selection, runs
//! gateway calls and reports their outcome as events.
//!
//! Busy tracking is per operation key rather than one global flag, and every
//! operation is tied to the mount generation it started in. A result that
//! comes back after `mount`/`unmount` bumped the generation is dropped.
//!
//! A removal that lands while a load is already pending marks that load for
//! one more fetch, so the store never settles on a pre-removal response.

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::Utc;
use shared::{domain::UserId, protocol::NotificationDraft};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::{
    error::{DashboardError, GatewayError},
    events::{Alert, DashboardEvent},
    gateway::DispatchGateway,
    selection::SelectionSet,
    store::SubscriptionStore,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Refresh,
    NotifyAll,
    NotifySelected,
    NotifyUser,
    Unsubscribe,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Refresh => "refresh",
            OperationKind::NotifyAll => "notify_all",
            OperationKind::NotifySelected => "notify_selected",
            OperationKind::NotifyUser => "notify_user",
            OperationKind::Unsubscribe => "unsubscribe",
        }
    }
}

/// Identifies one in-flight request. Two requests with the same key never
/// run at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub kind: OperationKind,
    pub target: Option<UserId>,
}

impl OperationKey {
    pub fn refresh() -> Self {
        Self::untargeted(OperationKind::Refresh)
    }

    pub fn notify_all() -> Self {
        Self::untargeted(OperationKind::NotifyAll)
    }

    pub fn notify_selected() -> Self {
        Self::untargeted(OperationKind::NotifySelected)
    }

    pub fn notify_user(user_id: UserId) -> Self {
        Self {
            kind: OperationKind::NotifyUser,
            target: Some(user_id),
        }
    }

    pub fn unsubscribe(user_id: UserId) -> Self {
        Self {
            kind: OperationKind::Unsubscribe,
            target: Some(user_id),
        }
    }

    fn untargeted(kind: OperationKind) -> Self {
        Self { kind, target: None }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(user_id) => write!(f, "{}({user_id})", self.kind.name()),
            None => f.write_str(self.kind.name()),
        }
    }
}

/// Point-in-time copy of controller state for rendering.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub mounted: bool,
    pub store: SubscriptionStore,
    pub selection: SelectionSet,
    pub in_flight: Vec<OperationKey>,
}

impl DashboardSnapshot {
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_busy(&self, key: &OperationKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Row controls for `user_id` are disabled while the list reloads or while
    /// any request targeting that user is pending.
    pub fn is_user_busy(&self, user_id: &UserId) -> bool {
        self.in_flight
            .iter()
            .any(|key| key.kind == OperationKind::Refresh || key.target.as_ref() == Some(user_id))
    }

    pub fn can_notify_selected(&self) -> bool {
        !self.selection.is_empty() && !self.is_busy(&OperationKey::notify_selected())
    }
}

#[derive(Default)]
struct DashboardState {
    mounted: bool,
    generation: u64,
    store: SubscriptionStore,
    selection: SelectionSet,
    in_flight: HashMap<OperationKey, u64>,
    reload_requested: bool,
}

pub struct DashboardController {
    gateway: Arc<dyn DispatchGateway>,
    inner: Mutex<DashboardState>,
    events: broadcast::Sender<DashboardEvent>,
}

impl DashboardController {
    pub fn new(gateway: Arc<dyn DispatchGateway>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            gateway,
            inner: Mutex::new(DashboardState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    /// Starts a new generation and loads the store.
    pub async fn mount(&self) -> Result<usize, DashboardError> {
        {
            let mut guard = self.inner.lock().await;
            guard.mounted = true;
            self.next_generation(&mut guard);
            debug!(generation = guard.generation, "dashboard mounted");
        }
        self.refresh().await
    }

    /// Pending requests keep running, but their results are discarded.
    pub async fn unmount(&self) {
        let mut guard = self.inner.lock().await;
        guard.mounted = false;
        self.next_generation(&mut guard);
        debug!(generation = guard.generation, "dashboard unmounted");
    }

    /// Drops every in-flight entry of the old generation and reports each one
    /// as no longer busy.
    fn next_generation(&self, state: &mut DashboardState) {
        state.generation += 1;
        state.reload_requested = false;
        for (key, _) in state.in_flight.drain() {
            self.emit(DashboardEvent::Busy {
                key,
                in_flight: false,
            });
        }
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let guard = self.inner.lock().await;
        DashboardSnapshot {
            mounted: guard.mounted,
            store: guard.store.clone(),
            selection: guard.selection.clone(),
            in_flight: guard.in_flight.keys().cloned().collect(),
        }
    }

    pub async fn is_loading(&self) -> bool {
        !self.inner.lock().await.in_flight.is_empty()
    }

    pub async fn is_busy(&self, key: &OperationKey) -> bool {
        self.inner.lock().await.in_flight.contains_key(key)
    }

    /// Returns whether `user_id` is selected afterwards.
    pub async fn toggle_user_selection(&self, user_id: &UserId) -> Result<bool, DashboardError> {
        let mut guard = self.inner.lock().await;
        if !guard.store.contains(user_id) && !guard.selection.contains(user_id) {
            return Err(DashboardError::UnknownUser(user_id.clone()));
        }
        Ok(guard.selection.toggle(user_id))
    }

    /// Returns the number of selected users afterwards.
    pub async fn select_all(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        state.selection.select_all(&state.store);
        state.selection.len()
    }

    /// Replaces the store with the backend's current mapping and prunes the
    /// selection to users that still exist. On failure the store is kept.
    ///
    /// If a reload is requested while the fetch is pending, its response is
    /// dropped and the fetch is issued again.
    pub async fn refresh(&self) -> Result<usize, DashboardError> {
        let key = OperationKey::refresh();
        let generation = self.begin(&key).await?;
        let (result, guard) = loop {
            let result = self.gateway.fetch_subscriptions().await;
            let mut guard = self.inner.lock().await;
            if guard.generation == generation && std::mem::take(&mut guard.reload_requested) {
                debug!("subscriptions changed while loading; fetching again");
                continue;
            }
            break (result, guard);
        };
        let mut guard = self.settle_locked(guard, &key, generation)?;
        match result {
            Ok(entries) => {
                let count = entries.len();
                let state = &mut *guard;
                state.store.replace(entries, Utc::now());
                let pruned_selection = state.selection.retain_known(&state.store);
                drop(guard);
                info!(count, pruned_selection, "subscriptions loaded");
                self.emit(DashboardEvent::StoreReplaced {
                    count,
                    pruned_selection,
                });
                Ok(count)
            }
            Err(err) => {
                drop(guard);
                Err(self.fail(&key, err))
            }
        }
    }

    pub async fn notify_all(&self, draft: &NotificationDraft) -> Result<(), DashboardError> {
        let key = OperationKey::notify_all();
        let generation = self.begin(&key).await?;
        let result = self.gateway.notify_all(draft).await;
        self.complete(&key, generation, result).await
    }

    /// Sends `draft` to the current selection. Refused without a request when
    /// nothing is selected.
    pub async fn notify_selected(&self, draft: &NotificationDraft) -> Result<(), DashboardError> {
        let users = self.inner.lock().await.selection.to_vec();
        if users.is_empty() {
            debug!("notify_selected refused: empty selection");
            return Err(DashboardError::EmptySelection);
        }

        let key = OperationKey::notify_selected();
        let generation = self.begin(&key).await?;
        let result = self.gateway.notify_selected(draft, &users).await;
        self.complete(&key, generation, result).await
    }

    pub async fn notify_user(&self, user_id: &UserId) -> Result<(), DashboardError> {
        let key = OperationKey::notify_user(user_id.clone());
        let generation = self.begin(&key).await?;
        let result = self.gateway.notify_user(user_id).await;
        self.complete(&key, generation, result).await
    }

    /// Removes the subscription, then reloads the store. A failed removal
    /// leaves the store alone and issues no reload. Reload failures raise
    /// their own alert and do not fail the removal.
    pub async fn unsubscribe(&self, user_id: &UserId) -> Result<(), DashboardError> {
        let key = OperationKey::unsubscribe(user_id.clone());
        let generation = self.begin(&key).await?;
        let result = self.gateway.unsubscribe(user_id).await;
        self.complete(&key, generation, result).await?;

        if let Err(err) = self.reload().await {
            warn!(user_id = %user_id, error = %err, "reload after unsubscribe failed");
        }
        Ok(())
    }

    /// Runs a refresh, or, when one is already pending, makes that one fetch
    /// again before it settles.
    async fn reload(&self) -> Result<(), DashboardError> {
        let key = OperationKey::refresh();
        loop {
            match self.refresh().await {
                Err(DashboardError::Busy(_)) => {
                    let mut guard = self.inner.lock().await;
                    if guard.in_flight.contains_key(&key) {
                        guard.reload_requested = true;
                        debug!("reload deferred to pending refresh");
                        return Ok(());
                    }
                }
                other => return other.map(drop),
            }
        }
    }

    async fn begin(&self, key: &OperationKey) -> Result<u64, DashboardError> {
        let generation = {
            let mut guard = self.inner.lock().await;
            if !guard.mounted {
                return Err(DashboardError::Unmounted);
            }
            if guard.in_flight.contains_key(key) {
                debug!(operation = %key, "operation already in flight");
                return Err(DashboardError::Busy(key.clone()));
            }
            let generation = guard.generation;
            guard.in_flight.insert(key.clone(), generation);
            generation
        };
        debug!(operation = %key, generation, "operation started");
        self.emit(DashboardEvent::Busy {
            key: key.clone(),
            in_flight: true,
        });
        Ok(generation)
    }

    /// Clears the in-flight entry and hands back the state lock, unless the
    /// generation moved on while the request was pending.
    async fn settle(
        &self,
        key: &OperationKey,
        generation: u64,
    ) -> Result<MutexGuard<'_, DashboardState>, DashboardError> {
        let guard = self.inner.lock().await;
        self.settle_locked(guard, key, generation)
    }

    fn settle_locked<'a>(
        &'a self,
        mut guard: MutexGuard<'a, DashboardState>,
        key: &OperationKey,
        generation: u64,
    ) -> Result<MutexGuard<'a, DashboardState>, DashboardError> {
        if guard.generation != generation {
            debug!(
                operation = %key,
                generation,
                current = guard.generation,
                "discarding stale result"
            );
            return Err(DashboardError::Superseded(key.clone()));
        }
        guard.in_flight.remove(key);
        self.emit(DashboardEvent::Busy {
            key: key.clone(),
            in_flight: false,
        });
        Ok(guard)
    }

    async fn complete(
        &self,
        key: &OperationKey,
        generation: u64,
        result: Result<(), GatewayError>,
    ) -> Result<(), DashboardError> {
        drop(self.settle(key, generation).await?);
        match result {
            Ok(()) => {
                info!(operation = %key, "operation succeeded");
                if let Some(alert) = Alert::success(key) {
                    self.emit(DashboardEvent::Alert(alert));
                }
                Ok(())
            }
            Err(err) => Err(self.fail(key, err)),
        }
    }

    fn fail(&self, key: &OperationKey, err: GatewayError) -> DashboardError {
        warn!(
            operation = key.kind.name(),
            user_id = key.target.as_ref().map(UserId::as_str),
            status = err.status().map(|status| status.as_u16()),
            error = %err,
            "operation failed"
        );
        self.emit(DashboardEvent::Alert(Alert::failure(key.kind)));
        DashboardError::Gateway(err)
    }

    fn emit(&self, event: DashboardEvent) {
        // No subscribers is fine; nobody is rendering.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
