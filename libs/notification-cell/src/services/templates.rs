use chrono_tz::Tz;

use crate::models::{Message, NotificationChannel, NotificationContext, NotificationEvent};

/// Render the message for one event on one channel. Times are shown in clinic time.
pub fn render(
    event: NotificationEvent,
    channel: NotificationChannel,
    ctx: &NotificationContext,
    clinic_name: &str,
    tz: Tz,
) -> Message {
    let datetime = ctx.start.with_timezone(&tz).format("%Y-%m-%d (%a) %H:%M").to_string();
    let patient = &ctx.patient.name;
    let menu = &ctx.menu_name;
    let staff = &ctx.staff_name;

    match channel {
        NotificationChannel::Email => {
            let (subject, body) = match event {
                NotificationEvent::Confirm => (
                    format!("Booking confirmed - {clinic_name}"),
                    format!(
                        "Dear {patient},\n\n\
                         Thank you for choosing {clinic_name}. Your booking is confirmed.\n\n\
                         Date/time: {datetime}\nMenu: {menu}\nStaff: {staff}\n\n\
                         Please arrive 10 minutes early. Contact us in advance if you need to change or cancel.\n\n\
                         {clinic_name}"
                    ),
                ),
                NotificationEvent::Reminder => (
                    format!("Your booking tomorrow - {clinic_name}"),
                    format!(
                        "Dear {patient},\n\n\
                         This is a reminder of your booking tomorrow.\n\n\
                         Date/time: {datetime}\nMenu: {menu}\nStaff: {staff}\n\n\
                         We look forward to seeing you.\n\n\
                         {clinic_name}"
                    ),
                ),
                NotificationEvent::Changed => (
                    format!("Booking changed - {clinic_name}"),
                    format!(
                        "Dear {patient},\n\n\
                         Your booking has been changed.\n\n\
                         New date/time: {datetime}\nMenu: {menu}\nStaff: {staff}\n\n\
                         {clinic_name}"
                    ),
                ),
                NotificationEvent::Canceled => (
                    format!("Booking canceled - {clinic_name}"),
                    format!(
                        "Dear {patient},\n\n\
                         Your booking on {datetime} has been canceled.\n\
                         We hope to see you again.\n\n\
                         {clinic_name}"
                    ),
                ),
            };
            Message { subject: Some(subject), body }
        }
        NotificationChannel::Sms | NotificationChannel::Line => {
            let body = match event {
                NotificationEvent::Confirm => format!(
                    "[{clinic_name}] Booking confirmed\n{patient}: {datetime} {menu} (staff: {staff})\nPlease arrive 10 minutes early."
                ),
                NotificationEvent::Reminder => format!(
                    "[{clinic_name}] Booking tomorrow\n{patient}: {datetime} {menu} (staff: {staff})"
                ),
                NotificationEvent::Changed => format!(
                    "[{clinic_name}] Booking changed\n{patient}: now {datetime} {menu} (staff: {staff})"
                ),
                NotificationEvent::Canceled => format!(
                    "[{clinic_name}] Booking canceled\n{patient}: your booking on {datetime} was canceled."
                ),
            };
            Message { subject: None, body }
        }
    }
}
