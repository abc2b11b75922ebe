// libs/scheduling-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use notification_cell::{ContactPreference, NotificationChannel, PatientContact};

use crate::services::overlap::overlaps;

// ==============================================================================
// SCHEDULE RECORDS
// ==============================================================================

/// Opening hours for one weekday (0 = Sunday).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub weekday: u32,
    #[serde(with = "clock_time")]
    pub open_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub close_time: NaiveTime,
    #[serde(default)]
    pub is_closed: bool,
}

/// Per-staff, per-date override of the business hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffSchedule {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_off: bool,
    #[serde(default, with = "clock_time::option")]
    pub work_start: Option<NaiveTime>,
    #[serde(default, with = "clock_time::option")]
    pub work_end: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default = "default_max_parallel")]
    pub max_parallel: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_parallel() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: Uuid,
    pub name: String,
    pub duration_min: i64,
    pub description: Option<String>,
}

impl Menu {
    pub fn duration(&self) -> Result<Duration, SchedulingError> {
        booking_duration(self.duration_min)
    }
}

/// Longest bookable treatment.
pub const MAX_BOOKING_MINUTES: i64 = 24 * 60;

/// Minutes as a booking length in `1..=MAX_BOOKING_MINUTES`.
pub fn booking_duration(minutes: i64) -> Result<Duration, SchedulingError> {
    if !(1..=MAX_BOOKING_MINUTES).contains(&minutes) {
        return Err(SchedulingError::Validation(format!(
            "duration must be between 1 and {} minutes, got {}",
            MAX_BOOKING_MINUTES, minutes
        )));
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| SchedulingError::Validation(format!("duration {} is out of range", minutes)))
}

// ==============================================================================
// BOOKINGS AND PATIENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Canceled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub patient_id: Option<Uuid>,
    pub menu_id: Uuid,
    pub staff_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub contact_channels: Vec<NotificationChannel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn interval(&self) -> TimeRange {
        TimeRange::new(self.start_ts, self.end_ts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub line_user_id: Option<String>,
    #[serde(default)]
    pub preferred_contact: ContactPreference,
}

impl From<&Patient> for PatientContact {
    fn from(patient: &Patient) -> Self {
        PatientContact {
            name: patient.name.clone(),
            email: patient.email.clone(),
            phone: patient.phone.clone(),
            line_user_id: patient.line_user_id.clone(),
            preferred_contact: patient.preferred_contact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub preferred_contact: ContactPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub patient_id: Uuid,
    pub menu_id: Uuid,
    pub staff_id: Uuid,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub contact_channels: Vec<NotificationChannel>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_ts: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
}

impl BookingUpdate {
    pub fn apply(&self, booking: &mut Booking) {
        if let Some(staff_id) = self.staff_id {
            booking.staff_id = staff_id;
        }
        if let Some(menu_id) = self.menu_id {
            booking.menu_id = menu_id;
        }
        if let Some(start) = self.start_ts {
            booking.start_ts = start;
        }
        if let Some(end) = self.end_ts {
            booking.end_ts = end;
        }
        if let Some(status) = self.status {
            booking.status = status;
        }
    }
}

// ==============================================================================
// DERIVED SCHEDULING TYPES
// ==============================================================================

/// Half-open interval `[start, end)` of absolute instants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Saturates at the end of representable time.
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Self {
        let end = start
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Which staff rows `list_staff` returns. `None` means "don't care".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaffFilter {
    pub active: Option<bool>,
    pub public: Option<bool>,
}

impl StaffFilter {
    pub fn active() -> Self {
        Self { active: Some(true), public: None }
    }

    /// Staff offered in unassigned slot listings.
    pub fn bookable() -> Self {
        Self { active: Some(true), public: Some(true) }
    }

    pub fn matches(&self, staff: &Staff) -> bool {
        self.active.map_or(true, |a| staff.is_active == a)
            && self.public.map_or(true, |p| staff.is_public == p)
    }
}

/// One staff member's day: working window (if any) and confirmed commitments.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAvailability {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub window: Option<TimeRange>,
    pub bookings: Vec<Booking>,
}

impl DayAvailability {
    pub fn unavailable(staff_id: Uuid, date: NaiveDate) -> Self {
        Self { staff_id, date, window: None, bookings: Vec::new() }
    }

    pub fn is_working(&self) -> bool {
        self.window.is_some()
    }

    pub fn fits(&self, interval: &TimeRange) -> bool {
        self.window.is_some_and(|w| w.contains(interval))
    }

    pub fn conflicts_with(&self, interval: &TimeRange) -> bool {
        self.bookings.iter().any(|b| b.interval().overlaps(interval))
    }

    /// Drop a booking from the occupancy list (the one being rescheduled).
    pub fn without_booking(mut self, booking_id: Option<Uuid>) -> Self {
        if let Some(id) = booking_id {
            self.bookings.retain(|b| b.id != id);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub available: bool,
}

/// The staff member the load balancer picked, with the load it was picked on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffChoice {
    pub staff_id: Uuid,
    pub staff_name: String,
    pub same_day_bookings: usize,
}

// ==============================================================================
// GUARD OUTCOMES
// ==============================================================================

/// Business-rule rejections. Not faults: the caller shows `message()` and
/// clients switch on `code()`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    OutsideBusinessHours,
    InPast,
    NoChange,
    Conflict,
    NoStaffAvailable,
    AlreadyCanceled,
}

impl RejectionReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::OutsideBusinessHours => "outside_business_hours",
            RejectionReason::InPast => "in_past",
            RejectionReason::NoChange => "no_change",
            RejectionReason::Conflict => "conflict",
            RejectionReason::NoStaffAvailable => "no_staff_available",
            RejectionReason::AlreadyCanceled => "already_canceled",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RejectionReason::OutsideBusinessHours => "Requested time is outside business hours",
            RejectionReason::InPast => "Requested time is in the past",
            RejectionReason::NoChange => "Booking already has this time and menu",
            RejectionReason::Conflict => "Time slot is no longer available",
            RejectionReason::NoStaffAvailable => "No staff available at the requested time",
            RejectionReason::AlreadyCanceled => "Booking is already canceled",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub staff_id: Uuid,
    /// The requested/current staff member was busy and another was chosen.
    pub reassigned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    Approved(Assignment),
    Rejected(RejectionReason),
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub menu_id: Option<Uuid>,
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotListResponse {
    pub date: NaiveDate,
    pub duration_minutes: i64,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub menu_id: Uuid,
    #[serde(alias = "startISO")]
    pub start: DateTime<Utc>,
    pub staff_id: Option<Uuid>,
    pub contact_channels: Vec<NotificationChannel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingCreated {
    pub booking_id: Uuid,
    pub assigned_staff_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reassigned: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    #[serde(alias = "startISO")]
    pub start: DateTime<Utc>,
    pub menu_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleOutcome {
    pub booking: Booking,
    pub changed_staff: bool,
}

/// Staff-side booking list query. Omitted fields don't filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
    pub staff_id: Option<Uuid>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Store-level form of `BookingListQuery`: newest start first, then paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// Bookings whose start lies in `[start, end)`.
    pub starts_within: Option<TimeRange>,
    pub staff_id: Option<Uuid>,
    pub limit: usize,
    pub offset: usize,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.staff_id.map_or(true, |id| booking.staff_id == id)
            && self
                .starts_within
                .map_or(true, |r| r.start <= booking.start_ts && booking.start_ts < r.end)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub limit: usize,
    pub offset: usize,
}

/// What the booking form needs before a slot query.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub menus: Vec<Menu>,
    pub staff: Vec<Staff>,
    pub business_hours: Vec<BusinessHours>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReminderSummary {
    pub date: NaiveDate,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed storage record: {0}")]
    Decode(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// Exclusion or uniqueness violation. The write lost a race.
    #[error("Write conflict: {0}")]
    WriteConflict(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rejected: {}", .0.message())]
    Rejected(RejectionReason),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Booking conflicted with a concurrent write: {0}")]
    RetryableConflict(String),
}

/// Accepts `HH:MM` and `HH:MM:SS` (Postgres `time` columns render with seconds).
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}
