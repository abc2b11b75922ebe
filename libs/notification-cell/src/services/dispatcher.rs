use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::models::{
    DeliveryMode, NotificationChannel, NotificationContext, NotificationError, NotificationEvent,
    NotificationLogEntry, NotificationResult,
};
use crate::services::channels::{plan_channels, recipient_for};
use crate::services::log::NotificationLog;
use crate::services::sender::{ChannelSender, LogSender};
use crate::services::templates::render;

/// Renders and delivers booking notifications over the registered channel senders.
pub struct NotificationDispatcher {
    senders: HashMap<NotificationChannel, Arc<dyn ChannelSender>>,
    log: Arc<dyn NotificationLog>,
    clinic_name: String,
    timezone: Tz,
}

impl NotificationDispatcher {
    pub fn new(log: Arc<dyn NotificationLog>, clinic_name: impl Into<String>, timezone: Tz) -> Self {
        Self {
            senders: HashMap::new(),
            log,
            clinic_name: clinic_name.into(),
            timezone,
        }
    }

    /// Register (or replace) the sender for its channel.
    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.senders.insert(sender.channel(), sender);
        self
    }

    /// Register the logging transport on every channel.
    pub fn with_log_senders(self) -> Self {
        NotificationChannel::PRIORITY
            .into_iter()
            .fold(self, |dispatcher, channel| {
                dispatcher.with_sender(Arc::new(LogSender::new(channel)))
            })
    }

    /// Deliver `event`. In `Auto` mode channels are tried in plan order until one
    /// succeeds; in `Explicit` mode every planned channel is attempted.
    /// Every attempt is logged.
    pub async fn dispatch(
        &self,
        event: NotificationEvent,
        ctx: &NotificationContext,
        mode: &DeliveryMode,
    ) -> Result<Vec<NotificationResult>, NotificationError> {
        let plan = plan_channels(&ctx.patient, mode);
        debug!("Dispatching {} for booking {} over {:?}", event, ctx.booking_id, plan);

        if plan.is_empty() {
            warn!("No usable channel for booking {} ({})", ctx.booking_id, event);
            return Err(NotificationError::NoChannel);
        }

        let mut results = Vec::with_capacity(plan.len());
        for channel in plan {
            let result = self.attempt(event, ctx, channel).await;
            self.record(ctx, &result).await;

            let delivered = result.success;
            results.push(result);

            if delivered && *mode == DeliveryMode::Auto {
                break;
            }
        }

        let sent = results.iter().filter(|r| r.success).count();
        info!("{} notification for booking {}: {}/{} attempts succeeded", event, ctx.booking_id, sent, results.len());

        Ok(results)
    }

    async fn attempt(
        &self,
        event: NotificationEvent,
        ctx: &NotificationContext,
        channel: NotificationChannel,
    ) -> NotificationResult {
        let outcome = match (recipient_for(&ctx.patient, channel), self.senders.get(&channel)) {
            (None, _) => Err(NotificationError::MissingContact(channel)),
            (_, None) => Err(NotificationError::NoSender(channel)),
            (Some(recipient), Some(sender)) => {
                let message = render(event, channel, ctx, &self.clinic_name, self.timezone);
                sender.send(recipient, &message).await
            }
        };

        match outcome {
            Ok(provider_id) => NotificationResult {
                channel,
                event,
                success: true,
                provider_id: Some(provider_id),
                error: None,
            },
            Err(e) => {
                warn!("{} via {} failed for booking {}: {}", event, channel, ctx.booking_id, e);
                NotificationResult {
                    channel,
                    event,
                    success: false,
                    provider_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn record(&self, ctx: &NotificationContext, result: &NotificationResult) {
        let entry = NotificationLogEntry {
            booking_id: ctx.booking_id,
            channel: result.channel,
            event: result.event,
            sent_at: Utc::now(),
            success: result.success,
            provider_msg_id: result.provider_id.clone(),
            error: result.error.clone(),
        };

        if let Err(e) = self.log.record(entry).await {
            warn!("Failed to record notification log for booking {}: {}", ctx.booking_id, e);
        }
    }
}
