//! Owner notification - best-effort delivery of lifecycle messages
//!
//! The pipeline calls the notifier after settling a task; failures are
//! swallowed into the task log and never change task status. Owner ids are
//! opaque strings here - if a transport needs a numeric chat id, that
//! conversion is the implementation's problem.

use ampliflow_foundation::{Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

/// Notifier trait - implement to deliver messages over a concrete channel
/// (chat bot, email, webhook, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to the owner
    async fn notify(&self, owner_id: &str, text: &str) -> Result<()>;

    /// Get notifier name
    fn name(&self) -> &'static str;
}

/// Notifier that only logs deliveries. Useful as a default and in tests
/// that do not assert on notifications.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, owner_id: &str, text: &str) -> Result<()> {
        info!("Notification for {}: {}", owner_id, text);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub owner_id: String,
    pub text: String,
}

/// Notifier that forwards messages over an mpsc channel. Front-ends drain
/// the receiver and push messages out over their own transport.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier plus the receiving end of its channel
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, owner_id: &str, text: &str) -> Result<()> {
        self.tx
            .send(Notification {
                owner_id: owner_id.to_string(),
                text: text.to_string(),
            })
            .await
            .map_err(|_| Error::Notify("notification channel closed".to_string()))
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
