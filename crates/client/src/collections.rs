//! Fetch-on-demand collections: signals, events and admins.
//!
//! A store owns a `Loadable<Vec<T>>` and a query. `refetch` re-reads the whole
//! list from the backend; mutations elsewhere trigger a refetch rather than
//! patching the list locally. Overlapping fetches resolve newest-wins, and
//! results arriving after `cancel` are dropped.

use crate::error::ClientError;
use crate::loadable::{CancelScope, Loadable};
use async_trait::async_trait;
use signaldesk_core::{Admin, Event, Signal};
use signaldesk_gateway::{Backend, EventQuery, GatewayError, SignalFilter};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// How a collection is read from the backend.
#[async_trait]
pub trait Collection: Send + Sync + 'static {
    type Query: Clone + PartialEq + Debug + Send + Sync;
    type Item: Clone + Send + Sync;

    const NAME: &'static str;

    async fn fetch(
        &self,
        backend: &dyn Backend,
        query: &Self::Query,
    ) -> Result<Vec<Self::Item>, GatewayError>;
}

/// Active signals, filtered by admin and risk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals;

#[async_trait]
impl Collection for Signals {
    type Query = SignalFilter;
    type Item = Signal;

    const NAME: &'static str = "signals";

    async fn fetch(&self, backend: &dyn Backend, query: &SignalFilter) -> Result<Vec<Signal>, GatewayError> {
        backend.get_active_signals(query).await
    }
}

/// Calendar events, filtered by status and type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Events;

#[async_trait]
impl Collection for Events {
    type Query = EventQuery;
    type Item = Event;

    const NAME: &'static str = "events";

    async fn fetch(&self, backend: &dyn Backend, query: &EventQuery) -> Result<Vec<Event>, GatewayError> {
        backend.get_events(query).await
    }
}

/// Admin list for the filter chips.
#[derive(Debug, Clone, Copy, Default)]
pub struct Admins;

#[async_trait]
impl Collection for Admins {
    type Query = ();
    type Item = Admin;

    const NAME: &'static str = "admins";

    async fn fetch(&self, backend: &dyn Backend, _query: &()) -> Result<Vec<Admin>, GatewayError> {
        backend.get_admins().await
    }
}

pub type SignalsStore = CollectionStore<Signals>;
pub type EventsStore = CollectionStore<Events>;
pub type AdminsStore = CollectionStore<Admins>;

pub struct CollectionStore<C: Collection> {
    collection: C,
    backend: Arc<dyn Backend>,
    query: Mutex<C::Query>,
    state: RwLock<Loadable<Vec<C::Item>>>,
    generation: AtomicU64,
    scope: CancelScope,
}

impl<C: Collection + Default> CollectionStore<C> {
    pub fn new(backend: Arc<dyn Backend>, query: C::Query) -> Self {
        Self::with_collection(C::default(), backend, query)
    }
}

impl<C: Collection> CollectionStore<C> {
    pub fn with_collection(collection: C, backend: Arc<dyn Backend>, query: C::Query) -> Self {
        Self {
            collection,
            backend,
            query: Mutex::new(query),
            state: RwLock::new(Loadable::default()),
            generation: AtomicU64::new(0),
            scope: CancelScope::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn query(&self) -> C::Query {
        match self.query.lock() {
            Ok(query) => query.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the query. Returns true when it changed and a refetch is due.
    pub fn set_query(&self, query: C::Query) -> bool {
        let mut current = match self.query.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current == query {
            return false;
        }
        *current = query;
        true
    }

    pub async fn snapshot(&self) -> Loadable<Vec<C::Item>> {
        self.state.read().await.clone()
    }

    pub async fn items(&self) -> Vec<C::Item> {
        self.state.read().await.data.clone()
    }

    /// Re-read the list with the current query.
    ///
    /// Errors are recorded in the store (previous items kept) and returned.
    /// A result superseded by a newer fetch is dropped and reported as `Ok`.
    #[instrument(skip(self), fields(collection = C::NAME))]
    pub async fn refetch(&self) -> Result<(), ClientError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = self.query();
        self.state.write().await.begin();

        let fetched = self
            .scope
            .run(self.collection.fetch(self.backend.as_ref(), &query))
            .await;

        let fetched = match fetched {
            Ok(result) => result,
            Err(e) => {
                debug!("Fetch cancelled, result discarded");
                return Err(e);
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Superseded fetch discarded");
            return Ok(());
        }

        let mut state = self.state.write().await;
        match fetched {
            Ok(items) => {
                debug!(count = items.len(), ?query, "Collection loaded");
                state.finish_ok(items);
                Ok(())
            }
            Err(e) => {
                let e = ClientError::from(e);
                warn!(error = %e, retryable = e.is_retryable(), "Failed to load collection");
                state.finish_err(&e);
                Err(e)
            }
        }
    }

    /// Drop results of every fetch still in flight, now and later.
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }
}

impl<C: Collection> Drop for CollectionStore<C> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
