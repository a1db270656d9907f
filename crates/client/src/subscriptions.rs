//! Local subscription sets kept in step with the backend.
//!
//! A toggle issues the remote mutation first and only then updates the local
//! set, so a failed call leaves the set untouched. Toggles on the same id are
//! serialized: a second toggle while one is in flight is rejected.

use crate::error::ClientError;
use crate::loadable::CancelScope;
use async_trait::async_trait;
use dashmap::DashSet;
use signaldesk_core::NotifyChannels;
use signaldesk_gateway::{Backend, GatewayError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What kind of item a subscription points at.
#[async_trait]
pub trait SubscriptionKind: Send + Sync + 'static {
    const NAME: &'static str;

    /// Ids with an active subscription for this user.
    async fn load(&self, backend: &dyn Backend, telegram_id: i64) -> Result<Vec<String>, GatewayError>;

    async fn subscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError>;

    async fn unsubscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError>;
}

/// Signal subscriptions, with the channels a new subscription notifies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalKind {
    pub channels: NotifyChannels,
}

#[async_trait]
impl SubscriptionKind for SignalKind {
    const NAME: &'static str = "signal";

    async fn load(&self, backend: &dyn Backend, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        backend.get_user_subscriptions(telegram_id).await
    }

    async fn subscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        backend
            .subscribe_to_signal(id, telegram_id, self.channels)
            .await
            .map(|_| ())
    }

    async fn unsubscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        backend.unsubscribe_from_signal(id, telegram_id).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventKind;

#[async_trait]
impl SubscriptionKind for EventKind {
    const NAME: &'static str = "event";

    async fn load(&self, backend: &dyn Backend, telegram_id: i64) -> Result<Vec<String>, GatewayError> {
        backend.get_event_subscriptions(telegram_id).await
    }

    async fn subscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        backend.subscribe_to_event(id, telegram_id).await.map(|_| ())
    }

    async fn unsubscribe(&self, backend: &dyn Backend, id: &str, telegram_id: i64) -> Result<(), GatewayError> {
        backend.unsubscribe_from_event(id, telegram_id).await
    }
}

pub type SignalSubscriptions = SubscriptionStore<SignalKind>;
pub type EventSubscriptions = SubscriptionStore<EventKind>;

/// Removes an id from the pending set when the toggle finishes, however it ends.
struct PendingGuard<'a> {
    pending: &'a DashSet<String>,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}

pub struct SubscriptionStore<K: SubscriptionKind> {
    kind: K,
    backend: Arc<dyn Backend>,
    telegram_id: Option<i64>,
    subscribed: DashSet<String>,
    pending: DashSet<String>,
    loading: AtomicBool,
    scope: CancelScope,
}

impl<K: SubscriptionKind + Default> SubscriptionStore<K> {
    pub fn new(backend: Arc<dyn Backend>, telegram_id: Option<i64>) -> Self {
        Self::with_kind(K::default(), backend, telegram_id)
    }
}

impl<K: SubscriptionKind> SubscriptionStore<K> {
    pub fn with_kind(kind: K, backend: Arc<dyn Backend>, telegram_id: Option<i64>) -> Self {
        Self {
            kind,
            backend,
            telegram_id,
            subscribed: DashSet::new(),
            pending: DashSet::new(),
            loading: AtomicBool::new(telegram_id.is_some()),
            scope: CancelScope::new(),
        }
    }

    /// Seed the local set from the backend. Without a user there is nothing to load.
    #[instrument(skip(self), fields(kind = K::NAME))]
    pub async fn load(&self) -> Result<(), ClientError> {
        let Some(telegram_id) = self.telegram_id else {
            self.loading.store(false, Ordering::SeqCst);
            return Ok(());
        };

        let result = self
            .scope
            .run(self.kind.load(self.backend.as_ref(), telegram_id))
            .await;
        self.loading.store(false, Ordering::SeqCst);

        match result? {
            Ok(ids) => {
                debug!(count = ids.len(), "Subscriptions loaded");
                self.subscribed.clear();
                for id in ids {
                    self.subscribed.insert(id);
                }
                Ok(())
            }
            Err(e) => {
                warn!(user_id = telegram_id, error = %e, "Failed to load subscriptions");
                Err(e.into())
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self, id: &str) -> bool {
        self.subscribed.contains(id)
    }

    /// True while a toggle for `id` is in flight.
    pub fn is_toggling(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    pub fn subscribed_ids(&self) -> HashSet<String> {
        self.subscribed.iter().map(|id| id.key().clone()).collect()
    }

    /// Flip the subscription for `id`. Returns the new membership.
    ///
    /// The local set changes only after the backend confirms. Failures are
    /// returned to the caller with the set unchanged.
    #[instrument(skip(self), fields(kind = K::NAME))]
    pub async fn toggle(&self, id: &str) -> Result<bool, ClientError> {
        let telegram_id = self.telegram_id.ok_or(ClientError::MissingIdentity)?;

        if !self.pending.insert(id.to_string()) {
            debug!(id, "Toggle already in flight");
            return Err(ClientError::ToggleInProgress(id.to_string()));
        }
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        let currently = self.subscribed.contains(id);
        let backend = self.backend.as_ref();
        let result = if currently {
            self.scope
                .run(self.kind.unsubscribe(backend, id, telegram_id))
                .await?
        } else {
            self.scope
                .run(self.kind.subscribe(backend, id, telegram_id))
                .await?
        };

        if let Err(e) = result {
            warn!(id, user_id = telegram_id, error = %e, "Failed to toggle subscription");
            return Err(e.into());
        }

        if currently {
            self.subscribed.remove(id);
        } else {
            self.subscribed.insert(id.to_string());
        }
        debug!(id, subscribed = !currently, "Subscription toggled");
        Ok(!currently)
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }
}

impl<K: SubscriptionKind> Drop for SubscriptionStore<K> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use signaldesk_gateway::MemoryBackend;
    use std::time::Duration;

    const USER: i64 = 77;

    async fn setup() -> (Arc<MemoryBackend>, SignalSubscriptions) {
        let backend = Arc::new(MemoryBackend::demo(1).await);
        let store = SignalSubscriptions::new(backend.clone(), Some(USER));
        (backend, store)
    }

    #[tokio::test]
    async fn test_double_toggle_restores_membership() {
        let (backend, store) = setup().await;
        store.load().await.unwrap();
        assert!(!store.is_subscribed("signal-1"));

        assert!(store.toggle("signal-1").await.unwrap());
        assert!(store.is_subscribed("signal-1"));
        assert!(!store.toggle("signal-1").await.unwrap());
        assert!(!store.is_subscribed("signal-1"));

        // Unsubscribe is soft: the row stays, inactive.
        let row = backend.signal_subscription("signal-1", USER).await.unwrap();
        assert!(!row.is_active);
    }

    #[tokio::test]
    async fn test_resubscribe_reuses_row() {
        let (backend, store) = setup().await;
        store.toggle("signal-2").await.unwrap();
        store.toggle("signal-2").await.unwrap();
        store.toggle("signal-2").await.unwrap();

        assert_eq!(backend.signal_subscription_rows().await, 1);
        assert!(backend.signal_subscription("signal-2", USER).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_failure_leaves_set_unchanged() {
        let (backend, store) = setup().await;
        backend.set_failing(true);

        assert!(matches!(
            store.toggle("signal-1").await,
            Err(ClientError::Gateway(_))
        ));
        assert!(!store.is_subscribed("signal-1"));
        assert!(!store.is_toggling("signal-1"));
    }

    #[tokio::test]
    async fn test_load_reflects_backend() {
        let (backend, store) = setup().await;
        backend
            .subscribe_to_signal("signal-3", USER, NotifyChannels::default())
            .await
            .unwrap();

        assert!(store.is_loading());
        store.load().await.unwrap();
        assert!(!store.is_loading());
        assert_eq!(store.subscribed_ids(), HashSet::from(["signal-3".to_string()]));
    }

    #[tokio::test]
    async fn test_without_user() {
        let backend = Arc::new(MemoryBackend::demo(1).await);
        let store = EventSubscriptions::new(backend, None);
        assert!(!store.is_loading());
        store.load().await.unwrap();
        assert!(matches!(
            store.toggle("event-1").await,
            Err(ClientError::MissingIdentity)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_toggle_same_id_is_rejected() {
        let (backend, store) = setup().await;
        backend.set_latency(Duration::from_millis(50));
        let store = Arc::new(store);

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.toggle("signal-1").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(store.is_toggling("signal-1"));

        assert!(matches!(
            store.toggle("signal-1").await,
            Err(ClientError::ToggleInProgress(_))
        ));
        // A different id is independent.
        assert!(store.toggle("signal-2").await.unwrap());

        assert!(first.await.unwrap().unwrap());
        assert!(store.is_subscribed("signal-1"));
        assert!(!store.is_toggling("signal-1"));
    }

    #[tokio::test]
    async fn test_event_subscriptions() {
        let backend = Arc::new(MemoryBackend::demo(1).await);
        let store = EventSubscriptions::new(backend.clone(), Some(USER));
        store.toggle("event-1").await.unwrap();

        let reloaded = EventSubscriptions::new(backend, Some(USER));
        reloaded.load().await.unwrap();
        assert!(reloaded.is_subscribed("event-1"));
    }
}
