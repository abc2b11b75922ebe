use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{DayAvailability, SchedulingError, Staff, StaffChoice, StaffFilter, TimeRange};
use crate::services::availability::AvailabilityCalculator;
use crate::services::store::SchedulingStore;

/// Picks the least-loaded active staff member who is free for an interval.
pub struct StaffLoadBalancer {
    store: Arc<dyn SchedulingStore>,
    availability: Arc<AvailabilityCalculator>,
}

impl StaffLoadBalancer {
    pub fn new(store: Arc<dyn SchedulingStore>, availability: Arc<AvailabilityCalculator>) -> Self {
        Self { store, availability }
    }

    /// `Ok(None)` is the ordinary "no staff available" answer.
    ///
    /// A candidate must be working with the interval inside their window,
    /// have no overlapping confirmed booking and be under `max_parallel`
    /// same-day bookings. The fewest same-day bookings wins; ties go to the
    /// first in staff order. `exclude_booking` is left out of every count
    /// (the booking being rescheduled).
    pub async fn select(
        &self,
        date: NaiveDate,
        interval: TimeRange,
        exclude_booking: Option<Uuid>,
    ) -> Result<Option<StaffChoice>, SchedulingError> {
        let staff = self.store.list_staff(StaffFilter::active()).await?;
        let mut best: Option<StaffChoice> = None;

        for member in &staff {
            let day = self
                .availability
                .for_known_staff(member, date)
                .await?
                .without_booking(exclude_booking);

            let Some(load) = eligible_load(member, &day, &interval) else {
                continue;
            };

            if best.as_ref().map_or(true, |b| load < b.same_day_bookings) {
                best = Some(StaffChoice {
                    staff_id: member.id,
                    staff_name: member.name.clone(),
                    same_day_bookings: load,
                });
            }
        }

        match &best {
            Some(choice) => debug!("Selected {} with {} same-day bookings", choice.staff_name, choice.same_day_bookings),
            None => debug!("No staff available on {} for {:?}", date, interval),
        }
        Ok(best)
    }

    /// Whether one staff member still passes every candidate rule for
    /// `interval`. Used to re-validate a balancer pick under the staff lock.
    pub async fn can_take(
        &self,
        staff_id: Uuid,
        interval: &TimeRange,
        exclude_booking: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        let member = match self.store.get_staff(staff_id).await? {
            Some(member) if member.is_active => member,
            _ => return Ok(false),
        };
        let date = interval.start.with_timezone(&self.availability.timezone()).date_naive();
        let day = self
            .availability
            .for_known_staff(&member, date)
            .await?
            .without_booking(exclude_booking);
        Ok(eligible_load(&member, &day, interval).is_some())
    }
}

/// Same-day load of a staff member who can take `interval`, `None` if excluded.
fn eligible_load(member: &Staff, day: &DayAvailability, interval: &TimeRange) -> Option<usize> {
    if !day.fits(interval) {
        debug!("{} excluded: not working over the requested interval", member.name);
        return None;
    }
    if day.conflicts_with(interval) {
        debug!("{} excluded: overlapping booking", member.name);
        return None;
    }
    let load = day.bookings.len();
    if load >= member.max_parallel as usize {
        debug!("{} excluded: {} bookings reaches max_parallel {}", member.name, load, member.max_parallel);
        return None;
    }
    Some(load)
}
