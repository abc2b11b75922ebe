use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use notification_cell::{NotificationEvent, NotificationLog};

use crate::models::{ReminderSummary, SchedulingError};
use crate::services::availability::clinic_day;
use crate::services::notify::BookingNotifier;
use crate::services::store::SchedulingStore;

/// Day-before reminder sweep. Idempotent per clinic-local day: a booking
/// whose reminder already went out today is skipped.
pub struct ReminderService {
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn BookingNotifier>,
    log: Arc<dyn NotificationLog>,
    timezone: Tz,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        notifier: Arc<dyn BookingNotifier>,
        log: Arc<dyn NotificationLog>,
        timezone: Tz,
    ) -> Self {
        Self { store, notifier, log, timezone }
    }

    pub async fn send_reminders(&self, now: DateTime<Utc>) -> Result<ReminderSummary, SchedulingError> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| SchedulingError::Validation(format!("no day after {}", today)))?;
        let sent_since = clinic_day(self.timezone, today)?.start;

        let bookings = self
            .store
            .list_confirmed_bookings_between(clinic_day(self.timezone, tomorrow)?)
            .await?;
        info!("Running reminders for {}: {} confirmed bookings", tomorrow, bookings.len());

        let mut summary = ReminderSummary {
            date: tomorrow,
            sent: 0,
            skipped: 0,
            failed: 0,
        };

        for booking in &bookings {
            match self
                .log
                .has_sent_since(booking.id, NotificationEvent::Reminder, sent_since)
                .await
            {
                Ok(true) => {
                    debug!("Reminder already sent for booking {}", booking.id);
                    summary.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => warn!("Could not check reminder log for booking {}: {}", booking.id, e),
            }

            match self.notifier.notify(NotificationEvent::Reminder, booking).await {
                Ok(results) if results.iter().any(|r| r.success) => summary.sent += 1,
                Ok(_) => {
                    warn!("Reminder for booking {} was not delivered on any channel", booking.id);
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!("Reminder for booking {} failed: {}", booking.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Reminders for {}: {} sent, {} skipped, {} failed",
            summary.date, summary.sent, summary.skipped, summary.failed
        );
        Ok(summary)
    }
}
