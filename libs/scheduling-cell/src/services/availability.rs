use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{DayAvailability, SchedulingError, Staff, TimeRange};
use crate::services::store::SchedulingStore;

/// The absolute instant of a clinic-local wall-clock time. A time skipped by
/// a DST gap resolves to the first valid instant an hour later.
pub fn clinic_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let local = date.and_time(time);
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })
        .map(|instant| instant.with_timezone(&Utc))
}

/// `[00:00, next day 00:00)` of a clinic-local calendar day.
pub fn clinic_day(tz: Tz, date: NaiveDate) -> Result<TimeRange, SchedulingError> {
    let next = date
        .succ_opt()
        .ok_or_else(|| SchedulingError::Validation(format!("date {} is out of range", date)))?;
    match (
        clinic_instant(tz, date, NaiveTime::MIN),
        clinic_instant(tz, next, NaiveTime::MIN),
    ) {
        (Some(start), Some(end)) => Ok(TimeRange::new(start, end)),
        _ => Err(SchedulingError::Validation(format!(
            "date {} has no valid local midnight in {}",
            date, tz
        ))),
    }
}

/// Resolves one staff member's working window and confirmed bookings for a
/// clinic-local date.
pub struct AvailabilityCalculator {
    store: Arc<dyn SchedulingStore>,
    timezone: Tz,
}

impl AvailabilityCalculator {
    pub fn new(store: Arc<dyn SchedulingStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Unknown staff is simply unavailable.
    pub async fn for_staff(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<DayAvailability, SchedulingError> {
        match self.store.get_staff(staff_id).await? {
            Some(staff) => self.for_known_staff(&staff, date).await,
            None => {
                debug!("Unknown staff {} treated as unavailable", staff_id);
                Ok(DayAvailability::unavailable(staff_id, date))
            }
        }
    }

    pub async fn for_known_staff(
        &self,
        staff: &Staff,
        date: NaiveDate,
    ) -> Result<DayAvailability, SchedulingError> {
        let window = self.working_window(staff.id, date).await?;
        if window.is_none() {
            return Ok(DayAvailability::unavailable(staff.id, date));
        }

        let bookings = self
            .store
            .list_confirmed_bookings(staff.id, clinic_day(self.timezone, date)?)
            .await?;

        debug!(
            "Staff {} on {}: window {:?}, {} confirmed bookings",
            staff.name, date, window, bookings.len()
        );

        Ok(DayAvailability {
            staff_id: staff.id,
            date,
            window,
            bookings,
        })
    }

    /// Staff override first, business hours second; `None` when off or closed.
    async fn working_window(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<TimeRange>, SchedulingError> {
        let schedule = self.store.staff_schedule(staff_id, date).await?;

        let (work_start, work_end) = match &schedule {
            Some(s) if s.is_off => return Ok(None),
            Some(s) => (s.work_start, s.work_end),
            None => (None, None),
        };

        let (open, close) = match (work_start, work_end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                let weekday = date.weekday().num_days_from_sunday();
                match self.store.business_hours(weekday).await? {
                    Some(hours) if !hours.is_closed => (
                        work_start.unwrap_or(hours.open_time),
                        work_end.unwrap_or(hours.close_time),
                    ),
                    _ => return Ok(None),
                }
            }
        };

        let start = clinic_instant(self.timezone, date, open);
        let end = clinic_instant(self.timezone, date, close);
        match (start, end) {
            (Some(start), Some(end)) if start < end => Ok(Some(TimeRange::new(start, end))),
            (Some(_), Some(_)) => Ok(None),
            _ => {
                warn!("Window {}-{} on {} does not resolve in {}", open, close, date, self.timezone);
                Ok(None)
            }
        }
    }
}
