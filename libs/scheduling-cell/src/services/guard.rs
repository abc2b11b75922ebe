use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{
    Assignment, Booking, GuardVerdict, RejectionReason, SchedulingError, TimeRange,
};
use crate::services::availability::AvailabilityCalculator;
use crate::services::balancer::StaffLoadBalancer;

/// A booking as proposed by a create or reschedule request.
#[derive(Debug, Clone, Copy)]
pub struct ProposedBooking {
    pub start: DateTime<Utc>,
    pub duration: Duration,
    pub menu_id: Uuid,
    /// Named staff for a create; ignored on reschedule (the booking's staff is used).
    pub staff_id: Option<Uuid>,
}

impl ProposedBooking {
    pub fn interval(&self) -> TimeRange {
        TimeRange::starting_at(self.start, self.duration)
    }
}

/// Validates proposed bookings against the business rules, in order:
/// hour gate, not in the past, not a no-op reschedule, no overlap for the
/// target staff, then reassignment through the load balancer.
pub struct BookingConflictGuard {
    availability: Arc<AvailabilityCalculator>,
    balancer: Arc<StaffLoadBalancer>,
    timezone: Tz,
    open_hour: u32,
    close_hour: u32,
}

impl BookingConflictGuard {
    pub fn new(
        availability: Arc<AvailabilityCalculator>,
        balancer: Arc<StaffLoadBalancer>,
        config: &SchedulingConfig,
    ) -> Self {
        Self {
            availability,
            balancer,
            timezone: config.timezone,
            open_hour: config.open_hour,
            close_hour: config.close_hour,
        }
    }

    pub async fn check_create(
        &self,
        proposal: &ProposedBooking,
        now: DateTime<Utc>,
    ) -> Result<GuardVerdict, SchedulingError> {
        self.evaluate(proposal, None, now).await
    }

    pub async fn check_reschedule(
        &self,
        current: &Booking,
        proposal: &ProposedBooking,
        now: DateTime<Utc>,
    ) -> Result<GuardVerdict, SchedulingError> {
        self.evaluate(proposal, Some(current), now).await
    }

    /// Clinic-local calendar date of an instant.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Whether `staff_id` can take `interval` right now: working over it and
    /// no overlapping confirmed booking other than `exclude_booking`.
    pub async fn staff_is_free(
        &self,
        staff_id: Uuid,
        interval: &TimeRange,
        exclude_booking: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        let day = self
            .availability
            .for_staff(staff_id, self.local_date(interval.start))
            .await?
            .without_booking(exclude_booking);
        Ok(day.fits(interval) && !day.conflicts_with(interval))
    }

    async fn evaluate(
        &self,
        proposal: &ProposedBooking,
        current: Option<&Booking>,
        now: DateTime<Utc>,
    ) -> Result<GuardVerdict, SchedulingError> {
        let interval = proposal.interval();
        debug!("Guard evaluating {:?} (reschedule: {})", interval, current.is_some());

        let hour = proposal.start.with_timezone(&self.timezone).hour();
        if hour < self.open_hour || hour >= self.close_hour {
            return Ok(reject(RejectionReason::OutsideBusinessHours));
        }

        if proposal.start < now {
            return Ok(reject(RejectionReason::InPast));
        }

        if let Some(booking) = current {
            if booking.start_ts == proposal.start && booking.menu_id == proposal.menu_id {
                return Ok(reject(RejectionReason::NoChange));
            }
        }

        let exclude = current.map(|b| b.id);
        let target = current.map(|b| b.staff_id).or(proposal.staff_id);

        let Some(target) = target else {
            return match self.balancer.select(self.local_date(interval.start), interval, None).await? {
                Some(choice) => Ok(GuardVerdict::Approved(Assignment {
                    staff_id: choice.staff_id,
                    reassigned: false,
                })),
                None => Ok(reject(RejectionReason::NoStaffAvailable)),
            };
        };

        if self.staff_is_free(target, &interval, exclude).await? {
            return Ok(GuardVerdict::Approved(Assignment {
                staff_id: target,
                reassigned: false,
            }));
        }

        debug!("Staff {} is busy over {:?}, trying reassignment", target, interval);
        match self.balancer.select(self.local_date(interval.start), interval, exclude).await? {
            Some(choice) => Ok(GuardVerdict::Approved(Assignment {
                staff_id: choice.staff_id,
                reassigned: choice.staff_id != target,
            })),
            None => Ok(reject(RejectionReason::Conflict)),
        }
    }
}

fn reject(reason: RejectionReason) -> GuardVerdict {
    warn!("Booking rejected: {}", reason.message());
    GuardVerdict::Rejected(reason)
}
