//! OTP delivery.
//!
//! Delivery is best-effort: [`dispatch`] hands the code to a
//! [`NotificationSender`] on a background task with retries, and the caller
//! never learns whether it arrived.

use crate::language::Channel;
use crate::retry::{with_retry, RetryConfig};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A code addressed to one destination over one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: Channel,
    pub destination: String,
    pub code: String,
}

/// Transport capable of delivering a one-time code.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify(&self, channel: Channel, destination: &str, code: &str) -> Result<()>;
}

/// Stand-in transport that writes the code to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn notify(&self, channel: Channel, destination: &str, code: &str) -> Result<()> {
        match channel {
            Channel::Email => info!("[EMAIL OTP] Sending OTP {} to email: {}", code, destination),
            Channel::Mobile => info!("[SMS OTP] Sending OTP {} to mobile: {}", code, destination),
        }
        Ok(())
    }
}

/// Captures notifications in memory so tests can assert on what was sent.
///
/// Every delivery is also pushed onto the channel returned by [`Self::new`],
/// which lets async tests wait for the background task to finish.
#[derive(Debug)]
pub struct MemoryNotificationSender {
    sent: Mutex<Vec<Notification>>,
    tx: mpsc::UnboundedSender<Notification>,
}

impl MemoryNotificationSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sent: Mutex::new(Vec::new()),
                tx,
            },
            rx,
        )
    }

    /// Everything delivered so far, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl NotificationSender for MemoryNotificationSender {
    async fn notify(&self, channel: Channel, destination: &str, code: &str) -> Result<()> {
        let notification = Notification {
            channel,
            destination: destination.to_string(),
            code: code.to_string(),
        };
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        // Receiver may have been dropped; the Vec still has the record.
        let _ = self.tx.send(notification);
        Ok(())
    }
}

/// Deliver `notification` on a background task.
///
/// Failures are retried per `retry` and then logged; they never propagate.
pub fn dispatch(
    sender: Arc<dyn NotificationSender>,
    retry: RetryConfig,
    notification: Notification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Notification {
            channel,
            destination,
            code,
        } = notification;

        let result = with_retry(&retry, "OTP delivery", || {
            sender.notify(channel, &destination, &code)
        })
        .await;

        if let Err(e) = result {
            warn!(
                "Giving up on OTP delivery via {} to {}: {:#}",
                channel, destination, e
            );
        }
    })
}
