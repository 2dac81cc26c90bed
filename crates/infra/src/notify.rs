//! Outbound customer notifications.
//!
//! The engine calls `NotificationPort::notify` on a detached task after a
//! transition has committed. The returned flag is only logged; a failed or
//! slow notification never affects the order.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;

use storefront_orders::{NotificationKind, NotificationMessage, OrderSnapshot};

#[async_trait::async_trait]
pub trait NotificationPort: Send + Sync {
    /// Deliver a notification. Returns `false` when delivery failed.
    async fn notify(&self, kind: NotificationKind, snapshot: &OrderSnapshot) -> bool;
}

/// Renders the message and emits it as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(&self, kind: NotificationKind, snapshot: &OrderSnapshot) -> bool {
        let message = NotificationMessage::render(kind, snapshot);
        tracing::info!(
            kind = kind.as_str(),
            order_number = %snapshot.order_number,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "customer notification"
        );
        true
    }
}

/// Records every call; optionally reports failure. Used by tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(NotificationKind, OrderSnapshot)>>,
    fail: bool,
    signal: Notify,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails (still recorded).
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(NotificationKind, OrderSnapshot)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Wait until at least `count` calls were recorded, or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.signal.notified();
                if self.calls().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[async_trait::async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, kind: NotificationKind, snapshot: &OrderSnapshot) -> bool {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((kind, snapshot.clone()));
        }
        self.signal.notify_waiters();
        !self.fail
    }
}
