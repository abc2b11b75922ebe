use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::future::try_join_all;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Booking, DayAvailability, SchedulingError, Staff, StaffFilter, TimeRange, TimeSlot,
    MAX_BOOKING_MINUTES,
};
use crate::services::availability::AvailabilityCalculator;
use crate::services::store::SchedulingStore;

/// Enumerates fixed-cadence candidate slots across eligible staff.
pub struct SlotGenerator {
    store: Arc<dyn SchedulingStore>,
    availability: Arc<AvailabilityCalculator>,
    cadence: Duration,
}

impl SlotGenerator {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        availability: Arc<AvailabilityCalculator>,
        cadence: Duration,
    ) -> Self {
        Self { store, availability, cadence }
    }

    /// Every candidate slot for `date`, taken ones included, sorted by start.
    /// Equal starts keep staff order (by name), then generation order.
    pub async fn generate(
        &self,
        date: NaiveDate,
        duration: Duration,
        staff_id: Option<Uuid>,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        if duration <= Duration::zero() || duration > Duration::minutes(MAX_BOOKING_MINUTES) {
            return Err(SchedulingError::Validation(format!(
                "duration must be between 1 and {} minutes",
                MAX_BOOKING_MINUTES
            )));
        }
        if self.cadence <= Duration::zero() {
            return Err(SchedulingError::Validation("slot cadence must be positive".to_string()));
        }

        let staff = self.eligible_staff(staff_id).await?;
        debug!("Generating {}-minute slots on {} for {} staff", duration.num_minutes(), date, staff.len());

        let days = try_join_all(
            staff
                .iter()
                .map(|member| self.availability.for_known_staff(member, date)),
        )
        .await?;

        let mut slots: Vec<TimeSlot> = staff
            .iter()
            .zip(days.iter())
            .flat_map(|(member, day)| slots_for_day(member, day, duration, self.cadence))
            .collect();
        slots.sort_by_key(|slot| slot.start);

        Ok(slots)
    }

    async fn eligible_staff(&self, staff_id: Option<Uuid>) -> Result<Vec<Staff>, SchedulingError> {
        match staff_id {
            Some(id) => Ok(self
                .store
                .get_staff(id)
                .await?
                .filter(|s| s.is_active)
                .into_iter()
                .collect()),
            None => Ok(self.store.list_staff(StaffFilter::bookable()).await?),
        }
    }
}

/// Slots for one staff member: every `cadence` from window start while the
/// slot still ends within the window. Empty when the staff member is not working.
pub fn slots_for_day(
    staff: &Staff,
    day: &DayAvailability,
    duration: Duration,
    cadence: Duration,
) -> Vec<TimeSlot> {
    let Some(window) = day.window else {
        return Vec::new();
    };
    if duration <= Duration::zero() || cadence <= Duration::zero() {
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut start = window.start;
    while let Some(end) = start.checked_add_signed(duration).filter(|end| *end <= window.end) {
        let candidate = TimeRange::new(start, end);
        slots.push(TimeSlot {
            start: candidate.start,
            end: candidate.end,
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            available: !is_taken(&day.bookings, &candidate),
        });
        match start.checked_add_signed(cadence) {
            Some(next) => start = next,
            None => break,
        }
    }
    slots
}

fn is_taken(bookings: &[Booking], candidate: &TimeRange) -> bool {
    bookings.iter().any(|b| b.interval().overlaps(candidate))
}
