// libs/notification-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CHANNELS AND EVENTS
// ==============================================================================

/// Contact methods, declared in fallback priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Line,
    Email,
    Sms,
}

impl NotificationChannel {
    pub const PRIORITY: [NotificationChannel; 3] = [
        NotificationChannel::Line,
        NotificationChannel::Email,
        NotificationChannel::Sms,
    ];
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Line => write!(f, "line"),
            NotificationChannel::Email => write!(f, "email"),
            NotificationChannel::Sms => write!(f, "sms"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Confirm,
    Reminder,
    Changed,
    Canceled,
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationEvent::Confirm => write!(f, "confirm"),
            NotificationEvent::Reminder => write!(f, "reminder"),
            NotificationEvent::Changed => write!(f, "changed"),
            NotificationEvent::Canceled => write!(f, "canceled"),
        }
    }
}

/// Patient-stated preference; `None` means "no preference".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactPreference {
    Line,
    Email,
    Sms,
    #[default]
    None,
}

impl ContactPreference {
    pub fn channel(self) -> Option<NotificationChannel> {
        match self {
            ContactPreference::Line => Some(NotificationChannel::Line),
            ContactPreference::Email => Some(NotificationChannel::Email),
            ContactPreference::Sms => Some(NotificationChannel::Sms),
            ContactPreference::None => None,
        }
    }
}

// ==============================================================================
// DELIVERY INPUTS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub line_user_id: Option<String>,
    #[serde(default)]
    pub preferred_contact: ContactPreference,
}

/// Everything a template needs about one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContext {
    pub booking_id: Uuid,
    pub patient: PatientContact,
    pub menu_name: String,
    pub staff_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// How to pick channels for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Preferred channel first, then the rest by priority; stop at the first success.
    Auto,
    /// Send on every listed channel the patient can actually receive.
    Explicit(Vec<NotificationChannel>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: Option<String>,
    pub body: String,
}

// ==============================================================================
// RESULTS AND LOGGING
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub channel: NotificationChannel,
    pub event: NotificationEvent,
    pub success: bool,
    pub provider_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogEntry {
    pub booking_id: Uuid,
    pub channel: NotificationChannel,
    pub event: NotificationEvent,
    pub sent_at: DateTime<Utc>,
    pub success: bool,
    pub provider_msg_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("No usable notification channel for this patient")]
    NoChannel,

    #[error("Patient has no contact details for {0}")]
    MissingContact(NotificationChannel),

    #[error("No sender registered for {0}")]
    NoSender(NotificationChannel),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Notification log error: {0}")]
    Log(String),

    #[error("Cannot build notification context: {0}")]
    Context(String),
}
