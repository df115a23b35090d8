//! # Notifications
//!
//! Outbound signals consumed by the UI layer: transient toasts and
//! invalidation of views keyed by resource name. Both are broadcast
//! channels; publishing with nobody listening is not an error.

use shared::{Toast, ToastKind};
use tokio::sync::broadcast;
use tracing::debug;

/// Publishes transient toast messages
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    pub fn success(&self, title: impl Into<String>, description: impl Into<String>) {
        self.publish(ToastKind::Success, title.into(), description.into());
    }

    pub fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.publish(ToastKind::Error, title.into(), description.into());
    }

    fn publish(&self, kind: ToastKind, title: String, description: String) {
        let toast = Toast { kind, title, description };
        if self.tx.send(toast).is_err() {
            debug!("Toast dropped, no subscribers");
        }
    }
}

/// Tells dependent views to refetch a resource
#[derive(Clone)]
pub struct RefreshBus {
    tx: broadcast::Sender<String>,
}

impl RefreshBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn invalidate(&self, resource: &str) {
        debug!("Invalidating '{}'", resource);
        let _ = self.tx.send(resource.to_string());
    }
}
