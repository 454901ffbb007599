//! Event Bus - typed pub/sub between the planning core and its listeners
//!
//! Handlers subscribe per [`EventType`]. `publish` fans an event out to every
//! handler concurrently and waits for all of them; a failing or panicking
//! handler is logged and never affects the others or the publisher.
//! `publish_async` queues events for a background consumer that publishes
//! them one at a time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::types::{Event, EventType};

/// Something that reacts to published events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "handler"
    }

    async fn handle(&self, event: &Event) -> eyre::Result<()>;
}

/// Handler wrapping an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = eyre::Result<()>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> eyre::Result<()> {
        (self.f)(event.clone()).await
    }
}

/// Turn an async closure into a shareable handler
pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler { name: name.into(), f })
}

/// Identifies one subscription, returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one synchronous publish
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub handled: usize,
    pub failed: usize,
}

type HandlerMap = HashMap<EventType, Vec<(SubscriptionId, Arc<dyn EventHandler>)>>;

/// Central event bus
pub struct EventBus {
    handlers: Arc<RwLock<HandlerMap>>,
    queue_tx: mpsc::UnboundedSender<Event>,
    queue_rx: Arc<Mutex<mpsc::UnboundedReceiver<Event>>>,
    processor: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    pub fn new() -> Self {
        debug!("EventBus::new: creating event bus");
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            processor: std::sync::Mutex::new(None),
        }
    }

    /// Register a handler for one event type
    pub fn subscribe(&self, event_type: impl Into<EventType>, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let event_type = event_type.into();
        let id = SubscriptionId(Uuid::now_v7());
        debug!(%event_type, %id, handler = handler.name(), "EventBus::subscribe");
        self.write_handlers().entry(event_type).or_default().push((id, handler));
        id
    }

    /// Remove a subscription; false if it was not registered for this type
    pub fn unsubscribe(&self, event_type: impl Into<EventType>, id: SubscriptionId) -> bool {
        let event_type = event_type.into();
        let mut handlers = self.write_handlers();
        let Some(list) = handlers.get_mut(&event_type) else {
            debug!(%event_type, %id, "EventBus::unsubscribe: no handlers for type");
            return false;
        };

        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&event_type);
        }
        debug!(%event_type, %id, removed, "EventBus::unsubscribe");
        removed
    }

    /// Drop every handler for one type, or for all types when `None`
    ///
    /// Returns the number of subscriptions removed.
    pub fn unsubscribe_all(&self, event_type: Option<&EventType>) -> usize {
        let mut handlers = self.write_handlers();
        let removed = match event_type {
            Some(event_type) => handlers.remove(event_type).map(|list| list.len()).unwrap_or(0),
            None => {
                let count = handlers.values().map(Vec::len).sum();
                handlers.clear();
                count
            }
        };
        debug!(?event_type, removed, "EventBus::unsubscribe_all");
        removed
    }

    pub fn subscriber_count(&self, event_type: &EventType) -> usize {
        self.read_handlers().get(event_type).map(Vec::len).unwrap_or(0)
    }

    /// Event types with at least one subscriber
    pub fn event_types(&self) -> Vec<EventType> {
        self.read_handlers()
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(event_type, _)| event_type.clone())
            .collect()
    }

    /// Deliver an event to all its subscribers and wait for them
    ///
    /// Never fails: handler errors and panics are logged and counted.
    pub async fn publish(&self, event: Event) -> PublishSummary {
        dispatch(&self.handlers, event).await
    }

    /// Queue an event for the background consumer
    ///
    /// Nothing runs until [`start_processing`](Self::start_processing) is called.
    pub fn publish_async(&self, event: Event) {
        debug!(event_type = %event.event_type(), "EventBus::publish_async");
        // the receiver lives as long as the bus, so sending cannot fail
        let _ = self.queue_tx.send(event);
    }

    /// Spawn the consumer for queued events; no-op if already running
    pub fn start_processing(&self) {
        let mut processor = self.processor.lock().unwrap_or_else(|e| e.into_inner());
        if processor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("EventBus::start_processing: already running");
            return;
        }

        let handlers = Arc::clone(&self.handlers);
        let queue_rx = Arc::clone(&self.queue_rx);
        *processor = Some(tokio::spawn(async move {
            let mut rx = queue_rx.lock().await;
            while let Some(event) = rx.recv().await {
                dispatch(&handlers, event).await;
            }
            debug!("EventBus: queue closed, consumer exiting");
        }));
        info!("Event queue processing started");
    }

    /// Cancel the consumer; queued events stay queued and are not drained
    pub fn stop_processing(&self) {
        let handle = self.processor.lock().unwrap_or_else(|e| e.into_inner()).take();
        match handle {
            Some(handle) => {
                handle.abort();
                info!("Event queue processing stopped");
            }
            None => debug!("EventBus::stop_processing: not running"),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn read_handlers(&self) -> std::sync::RwLockReadGuard<'_, HandlerMap> {
        self.handlers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_handlers(&self) -> std::sync::RwLockWriteGuard<'_, HandlerMap> {
        self.handlers.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Some(handle) = self.processor.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

/// Fan one event out to its handlers, each in its own task
async fn dispatch(handlers: &RwLock<HandlerMap>, event: Event) -> PublishSummary {
    let event_type = event.event_type();
    let targets: Vec<Arc<dyn EventHandler>> = handlers
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&event_type)
        .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
        .unwrap_or_default();

    if targets.is_empty() {
        debug!(%event_type, "EventBus::publish: no subscribers");
        return PublishSummary::default();
    }

    debug!(%event_type, handlers = targets.len(), source = %event.source, "EventBus::publish");
    let event = Arc::new(event);
    let names: Vec<String> = targets.iter().map(|h| h.name().to_string()).collect();
    let tasks = targets.into_iter().map(|handler| {
        let event = Arc::clone(&event);
        tokio::spawn(async move { handler.handle(&event).await })
    });

    let mut summary = PublishSummary::default();
    for (name, result) in names.iter().zip(join_all(tasks).await) {
        match result {
            Ok(Ok(())) => summary.handled += 1,
            Ok(Err(e)) => {
                warn!(%event_type, handler = %name, error = %e, "Event handler failed");
                summary.failed += 1;
            }
            Err(e) => {
                error!(%event_type, handler = %name, error = %e, "Event handler panicked");
                summary.failed += 1;
            }
        }
    }
    summary
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}
