use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use notification_cell::{
    DeliveryMode, NotificationContext, NotificationDispatcher, NotificationError,
    NotificationEvent, NotificationResult, PatientContact,
};

use crate::models::Booking;
use crate::services::store::SchedulingStore;

/// Outbound booking notifications, injected into the booking service.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn notify(
        &self,
        event: NotificationEvent,
        booking: &Booking,
    ) -> Result<Vec<NotificationResult>, NotificationError>;
}

/// Sends nothing.
pub struct NoopNotifier;

#[async_trait]
impl BookingNotifier for NoopNotifier {
    async fn notify(
        &self,
        _event: NotificationEvent,
        _booking: &Booking,
    ) -> Result<Vec<NotificationResult>, NotificationError> {
        Ok(Vec::new())
    }
}

/// Resolves patient, menu and staff for a booking and hands it to the dispatcher.
/// Bookings with stored contact channels are sent on exactly those; otherwise
/// the patient's preference picks the channel.
pub struct DispatcherNotifier {
    dispatcher: Arc<NotificationDispatcher>,
    store: Arc<dyn SchedulingStore>,
}

impl DispatcherNotifier {
    pub fn new(dispatcher: Arc<NotificationDispatcher>, store: Arc<dyn SchedulingStore>) -> Self {
        Self { dispatcher, store }
    }

    async fn context(&self, booking: &Booking) -> Result<NotificationContext, NotificationError> {
        let lookup = |e: crate::models::StoreError| NotificationError::Context(e.to_string());

        let patient_id = booking
            .patient_id
            .ok_or_else(|| NotificationError::Context(format!("booking {} has no patient", booking.id)))?;
        let patient = self
            .store
            .get_patient(patient_id)
            .await
            .map_err(lookup)?
            .ok_or_else(|| NotificationError::Context(format!("patient {} not found", patient_id)))?;

        let menu_name = self
            .store
            .get_menu(booking.menu_id)
            .await
            .map_err(lookup)?
            .map(|m| m.name)
            .unwrap_or_else(|| "Treatment".to_string());
        let staff_name = self
            .store
            .get_staff(booking.staff_id)
            .await
            .map_err(lookup)?
            .map(|s| s.name)
            .unwrap_or_else(|| "Staff".to_string());

        Ok(NotificationContext {
            booking_id: booking.id,
            patient: PatientContact::from(&patient),
            menu_name,
            staff_name,
            start: booking.start_ts,
            end: booking.end_ts,
        })
    }
}

#[async_trait]
impl BookingNotifier for DispatcherNotifier {
    async fn notify(
        &self,
        event: NotificationEvent,
        booking: &Booking,
    ) -> Result<Vec<NotificationResult>, NotificationError> {
        let ctx = self.context(booking).await?;
        let mode = if booking.contact_channels.is_empty() {
            DeliveryMode::Auto
        } else {
            DeliveryMode::Explicit(booking.contact_channels.clone())
        };

        debug!("Notifying {} for booking {} ({:?})", event, booking.id, mode);
        self.dispatcher.dispatch(event, &ctx, &mode).await
    }
}
