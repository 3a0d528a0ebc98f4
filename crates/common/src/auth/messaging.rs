//! In-process window message hub
//!
//! Hosts forward every `message` event received by the application window
//! into [`MessageBus::deliver`]. Controllers call [`MessageBus::listen`] and
//! hold the returned [`MessageListener`] for the lifetime of one attempt;
//! dropping it unregisters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A cross-document message as received by the window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMessage {
    /// Serialized origin of the sending document
    pub origin: String,
    /// Structured-clone payload
    pub data: serde_json::Value,
}

impl WindowMessage {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self { origin: origin.into(), data }
    }
}

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<u64, mpsc::UnboundedSender<WindowMessage>>>,
    next_id: AtomicU64,
}

/// Fan-out hub for window messages
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message to every registered listener
    ///
    /// Returns the number of listeners reached.
    pub fn deliver(&self, message: WindowMessage) -> usize {
        let mut listeners = self.inner.listeners.lock();
        listeners.retain(|_, tx| !tx.is_closed());
        for tx in listeners.values() {
            // Closed receivers were pruned above; a race here only loses a
            // message for a listener that is going away.
            let _ = tx.send(message.clone());
        }
        listeners.len()
    }

    /// Register a listener
    #[must_use]
    pub fn listen(&self) -> MessageListener {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().insert(id, tx);
        MessageListener { id, rx, bus: Arc::clone(&self.inner) }
    }

    /// Number of registered listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus").field("listeners", &self.listener_count()).finish()
    }
}

/// Registration on a [`MessageBus`]; unregisters on drop
pub struct MessageListener {
    id: u64,
    rx: mpsc::UnboundedReceiver<WindowMessage>,
    bus: Arc<BusInner>,
}

impl MessageListener {
    /// Wait for the next message
    ///
    /// Never returns `None` while the listener is registered, because the bus
    /// keeps the sender alive.
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        self.rx.recv().await
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        self.bus.listeners.lock().remove(&self.id);
    }
}
