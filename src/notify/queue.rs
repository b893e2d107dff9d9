//! Bounded queue between producers and the notification sink

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::notify::Notifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: i64,
    pub text: String,
}

/// Producer handle. Pushing never waits: a full queue drops the message.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Starts a worker delivering to `notifier`. It exits once every handle is dropped.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (queue, rx) = Self::channel(capacity);
        let worker = tokio::spawn(deliver(rx, notifier));
        (queue, worker)
    }

    pub fn push(&self, user_id: i64, text: impl Into<String>) -> bool {
        let notification = Notification {
            user_id,
            text: text.into(),
        };

        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                warn!("[Notify] Queue full, dropping message for user {}: {}", n.user_id, n.text);
                false
            }
            Err(TrySendError::Closed(n)) => {
                warn!("[Notify] Queue closed, dropping message for user {}", n.user_id);
                false
            }
        }
    }
}

async fn deliver(mut rx: mpsc::Receiver<Notification>, notifier: Arc<dyn Notifier>) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = notifier.notify(notification.user_id, &notification.text).await {
            warn!(
                "[Notify] Failed to deliver notification, userId: {}, text: {}, {}",
                notification.user_id, notification.text, e
            );
        }
    }
    debug!("[Notify] Delivery worker stopped");
}
