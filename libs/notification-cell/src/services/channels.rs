use crate::models::{DeliveryMode, NotificationChannel, PatientContact};

/// Channels the patient can be reached on, in priority order (LINE > e-mail > SMS).
pub fn available_channels(contact: &PatientContact) -> Vec<NotificationChannel> {
    NotificationChannel::PRIORITY
        .into_iter()
        .filter(|channel| recipient_for(contact, *channel).is_some())
        .collect()
}

/// Ordered list of channels to attempt for one dispatch.
pub fn plan_channels(contact: &PatientContact, mode: &DeliveryMode) -> Vec<NotificationChannel> {
    let available = available_channels(contact);

    match mode {
        DeliveryMode::Auto => {
            let mut plan = available;
            if let Some(preferred) = contact.preferred_contact.channel() {
                if let Some(pos) = plan.iter().position(|c| *c == preferred) {
                    let channel = plan.remove(pos);
                    plan.insert(0, channel);
                }
            }
            plan
        }
        DeliveryMode::Explicit(requested) => {
            let mut plan: Vec<NotificationChannel> = Vec::with_capacity(requested.len());
            for channel in requested {
                if available.contains(channel) && !plan.contains(channel) {
                    plan.push(*channel);
                }
            }
            plan
        }
    }
}

/// The address for `channel`, if the patient has a non-blank one.
pub fn recipient_for(contact: &PatientContact, channel: NotificationChannel) -> Option<&str> {
    let value = match channel {
        NotificationChannel::Line => contact.line_user_id.as_deref(),
        NotificationChannel::Email => contact.email.as_deref(),
        NotificationChannel::Sms => contact.phone.as_deref(),
    };
    value.map(str::trim).filter(|v| !v.is_empty())
}
