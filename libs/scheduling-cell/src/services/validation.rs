use std::sync::OnceLock;

use regex::Regex;
use tracing::error;

use notification_cell::NotificationChannel;

use crate::models::{CreateBookingRequest, SchedulingError};

pub const MAX_NAME_CHARS: usize = 50;
const MAX_EMAIL_CHARS: usize = 254;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$";
/// E.164-ish after separators are stripped: optional `+`, 7-15 digits.
const PHONE_PATTERN: &str = r"^\+?[0-9]{7,15}$";

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .map_err(|e| error!("Invalid validation pattern {}: {}", pattern, e))
            .ok()
    })
    .as_ref()
    .is_some_and(|re| re.is_match(value))
}

pub fn validate_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_CHARS && is_match(&EMAIL_REGEX, EMAIL_PATTERN, email)
}

/// Accepts spaces, dashes, dots and parentheses as separators.
pub fn validate_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    is_match(&PHONE_REGEX, PHONE_PATTERN, &digits)
}

pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Name length, channel presence, contact formats, and a usable contact for
/// every requested channel.
pub fn validate_create(request: &CreateBookingRequest) -> Result<(), SchedulingError> {
    let name_len = request.name.trim().chars().count();
    if name_len == 0 || name_len > MAX_NAME_CHARS {
        return Err(SchedulingError::Validation(format!(
            "name must be 1-{} characters",
            MAX_NAME_CHARS
        )));
    }

    if request.contact_channels.is_empty() {
        return Err(SchedulingError::Validation(
            "at least one contact channel is required".to_string(),
        ));
    }

    let email = non_blank(request.email.as_deref());
    if let Some(email) = &email {
        if !validate_email(email) {
            return Err(SchedulingError::Validation(format!("invalid email address: {}", email)));
        }
    }

    let phone = non_blank(request.phone.as_deref());
    if let Some(phone) = &phone {
        if !validate_phone(phone) {
            return Err(SchedulingError::Validation(format!("invalid phone number: {}", phone)));
        }
    }

    for channel in &request.contact_channels {
        let reachable = match channel {
            NotificationChannel::Email => email.is_some(),
            NotificationChannel::Sms => phone.is_some(),
            NotificationChannel::Line => false,
        };
        if !reachable {
            return Err(SchedulingError::Validation(format!(
                "contact channel {} has no matching contact details",
                channel
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            name: "Yamada".to_string(),
            email: Some("yamada@example.com".to_string()),
            phone: None,
            menu_id: Uuid::new_v4(),
            start: Utc::now(),
            staff_id: None,
            contact_channels: vec![NotificationChannel::Email],
        }
    }

    #[test]
    fn accepts_consistent_request() {
        assert!(validate_create(&request()).is_ok());
    }

    #[test]
    fn rejects_long_or_blank_names() {
        let mut r = request();
        r.name = "   ".to_string();
        assert!(validate_create(&r).is_err());
        r.name = "x".repeat(51);
        assert!(validate_create(&r).is_err());
        r.name = "x".repeat(50);
        assert!(validate_create(&r).is_ok());
    }

    #[test]
    fn channel_needs_contact() {
        let mut r = request();
        r.contact_channels = vec![NotificationChannel::Email, NotificationChannel::Sms];
        assert!(validate_create(&r).is_err());
        r.phone = Some("090-0000-0000".to_string());
        assert!(validate_create(&r).is_ok());
    }

    #[test]
    fn empty_channels_rejected() {
        let mut r = request();
        r.contact_channels.clear();
        assert!(validate_create(&r).is_err());
    }

    #[test]
    fn email_format() {
        assert!(validate_email("hanako.yamada+clinic@mail.example.co.jp"));
        assert!(!validate_email("a@@b.cc"));
        assert!(!validate_email("a@b.c"));
        assert!(!validate_email("no-at-sign.example.com"));
        assert!(!validate_email("space in@example.com"));
        assert!(!validate_email(&format!("{}@example.com", "a".repeat(250))));
    }

    #[test]
    fn phone_format() {
        assert!(validate_phone("090-1234-5678"));
        assert!(validate_phone("+81 90 1234 5678"));
        assert!(validate_phone("(03) 1234-5678"));
        assert!(!validate_phone("xyz"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("+81-90-1234-5678-0000-0000"));
    }

    #[test]
    fn malformed_contacts_are_rejected() {
        let mut r = request();
        r.email = Some("a@@b.cc".to_string());
        assert!(matches!(validate_create(&r), Err(SchedulingError::Validation(_))));

        let mut r = request();
        r.phone = Some("xyz".to_string());
        r.contact_channels = vec![NotificationChannel::Sms];
        assert!(matches!(validate_create(&r), Err(SchedulingError::Validation(_))));
    }
}
