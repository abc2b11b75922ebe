use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::models::{Message, NotificationChannel, NotificationError};

/// One outbound transport (e-mail provider, SMS gateway, LINE messaging).
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> NotificationChannel;

    /// Deliver `message` to `recipient`; returns the provider's message id.
    async fn send(&self, recipient: &str, message: &Message) -> Result<String, NotificationError>;
}

/// Development transport: writes the message to the log instead of delivering it.
pub struct LogSender {
    channel: NotificationChannel,
    sequence: AtomicU64,
}

impl LogSender {
    pub fn new(channel: NotificationChannel) -> Self {
        Self {
            channel,
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ChannelSender for LogSender {
    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    async fn send(&self, recipient: &str, message: &Message) -> Result<String, NotificationError> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            channel = %self.channel,
            recipient,
            subject = message.subject.as_deref().unwrap_or("-"),
            "Notification (log transport): {}",
            message.body
        );
        Ok(format!("{}_log_{}", self.channel, seq))
    }
}
