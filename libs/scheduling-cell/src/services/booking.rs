use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{ContactPreference, NotificationChannel, NotificationEvent};
use shared_config::SchedulingConfig;

use crate::models::{
    booking_duration, Assignment, Booking, BookingCreated, BookingFilter, BookingListQuery,
    BookingPage, BookingStatus, BookingUpdate, Catalog, CreateBookingRequest, GuardVerdict, Menu,
    NewBooking, NewPatient, RejectionReason, RescheduleOutcome, RescheduleRequest,
    SchedulingError, SlotListResponse, SlotQuery, StaffChoice, StaffFilter, StoreError, TimeRange,
};
use crate::services::availability::clinic_day;
use crate::services::availability::AvailabilityCalculator;
use crate::services::balancer::StaffLoadBalancer;
use crate::services::guard::{BookingConflictGuard, ProposedBooking};
use crate::services::locks::StaffLocks;
use crate::services::notify::BookingNotifier;
use crate::services::slots::SlotGenerator;
use crate::services::store::SchedulingStore;
use crate::services::validation::{non_blank, validate_create};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

/// Entry point for slot listing and booking mutations. Runs the guard,
/// writes under the per-staff lock and notifies after the write.
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn BookingNotifier>,
    slots: SlotGenerator,
    balancer: Arc<StaffLoadBalancer>,
    guard: BookingConflictGuard,
    locks: Arc<StaffLocks>,
    timezone: Tz,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        notifier: Arc<dyn BookingNotifier>,
        config: &SchedulingConfig,
        locks: Arc<StaffLocks>,
    ) -> Self {
        let availability = Arc::new(AvailabilityCalculator::new(store.clone(), config.timezone));
        let balancer = Arc::new(StaffLoadBalancer::new(store.clone(), availability.clone()));
        let slots = SlotGenerator::new(
            store.clone(),
            availability.clone(),
            Duration::try_minutes(config.slot_interval_minutes).unwrap_or_else(Duration::zero),
        );
        let guard = BookingConflictGuard::new(availability, balancer.clone(), config);

        Self {
            store,
            notifier,
            slots,
            balancer,
            guard,
            locks,
            timezone: config.timezone,
        }
    }

    pub async fn list_slots(&self, query: SlotQuery) -> Result<SlotListResponse, SchedulingError> {
        debug!("Listing slots for {} (staff: {:?})", query.date, query.staff_id);

        let duration_minutes = match (query.duration_minutes, query.menu_id) {
            (Some(minutes), _) => minutes,
            (None, Some(menu_id)) => self.menu(menu_id).await?.duration_min,
            (None, None) => {
                return Err(SchedulingError::Validation(
                    "duration_minutes or menu_id is required".to_string(),
                ))
            }
        };
        let duration = booking_duration(duration_minutes)?;

        let mut slots = self.slots.generate(query.date, duration, query.staff_id).await?;
        if query.available_only {
            slots.retain(|slot| slot.available);
        }

        Ok(SlotListResponse {
            date: query.date,
            duration_minutes,
            slots,
        })
    }

    /// Who the load balancer would assign, without booking anything.
    pub async fn preview_assignment(
        &self,
        start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<Option<StaffChoice>, SchedulingError> {
        let interval = TimeRange::starting_at(start, booking_duration(duration_minutes)?);
        let date = start.with_timezone(&self.timezone).date_naive();
        self.balancer.select(date, interval, None).await
    }

    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<BookingCreated, SchedulingError> {
        debug!("Creating booking for menu {} at {}", request.menu_id, request.start);
        validate_create(&request)?;

        let menu = self.menu(request.menu_id).await?;
        let proposal = ProposedBooking {
            start: request.start,
            duration: menu.duration()?,
            menu_id: menu.id,
            staff_id: request.staff_id,
        };
        let assignment = approved(self.guard.check_create(&proposal, Utc::now()).await?)?;
        let interval = proposal.interval();

        let patient = self
            .store
            .upsert_patient(NewPatient {
                name: request.name.trim().to_string(),
                email: non_blank(request.email.as_deref()),
                phone: non_blank(request.phone.as_deref()),
                preferred_contact: if request.contact_channels.contains(&NotificationChannel::Email) {
                    ContactPreference::Email
                } else {
                    ContactPreference::Sms
                },
            })
            .await?;

        let booking = {
            let _lock = self.locks.lock(assignment.staff_id).await;
            let reassigned_from_request = request.staff_id != Some(assignment.staff_id);
            self.ensure_still_free(&assignment, &interval, None, reassigned_from_request)
                .await?;

            self.store
                .create_booking(NewBooking {
                    patient_id: patient.id,
                    menu_id: menu.id,
                    staff_id: assignment.staff_id,
                    start_ts: interval.start,
                    end_ts: interval.end,
                    contact_channels: request.contact_channels.clone(),
                })
                .await
                .map_err(write_error)?
        };

        info!("Booking {} created for staff {} at {}", booking.id, booking.staff_id, booking.start_ts);
        self.notify(NotificationEvent::Confirm, &booking).await;

        Ok(BookingCreated {
            booking_id: booking.id,
            assigned_staff_id: booking.staff_id,
            start: booking.start_ts,
            end: booking.end_ts,
            reassigned: assignment.reassigned,
        })
    }

    pub async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        request: RescheduleRequest,
    ) -> Result<RescheduleOutcome, SchedulingError> {
        debug!("Rescheduling booking {} to {}", booking_id, request.start);

        let current = self.booking(booking_id).await?;
        if !current.is_confirmed() {
            warn!("Reschedule of canceled booking {} refused", booking_id);
            return Err(SchedulingError::Rejected(RejectionReason::AlreadyCanceled));
        }

        let menu = self.menu(request.menu_id.unwrap_or(current.menu_id)).await?;
        let proposal = ProposedBooking {
            start: request.start,
            duration: menu.duration()?,
            menu_id: menu.id,
            staff_id: None,
        };
        let assignment = approved(self.guard.check_reschedule(&current, &proposal, Utc::now()).await?)?;
        let interval = proposal.interval();

        let updated = {
            let _lock = self.locks.lock(assignment.staff_id).await;
            let moved = assignment.staff_id != current.staff_id;
            self.ensure_still_free(&assignment, &interval, Some(booking_id), moved)
                .await?;

            self.store
                .update_booking(
                    booking_id,
                    BookingUpdate {
                        staff_id: Some(assignment.staff_id),
                        menu_id: Some(menu.id),
                        start_ts: Some(interval.start),
                        end_ts: Some(interval.end),
                        status: None,
                    },
                )
                .await
                .map_err(write_error)?
        };

        let changed_staff = updated.staff_id != current.staff_id;
        info!(
            "Booking {} moved to {} (staff {}{})",
            booking_id,
            updated.start_ts,
            updated.staff_id,
            if changed_staff { ", reassigned" } else { "" }
        );
        self.notify(NotificationEvent::Changed, &updated).await;

        Ok(RescheduleOutcome {
            booking: updated,
            changed_staff,
        })
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, SchedulingError> {
        debug!("Canceling booking {}", booking_id);

        let current = self.booking(booking_id).await?;
        if !current.is_confirmed() {
            warn!("Booking {} is already canceled", booking_id);
            return Err(SchedulingError::Rejected(RejectionReason::AlreadyCanceled));
        }

        let canceled = self
            .store
            .update_booking(
                booking_id,
                BookingUpdate {
                    status: Some(BookingStatus::Canceled),
                    ..BookingUpdate::default()
                },
            )
            .await
            .map_err(write_error)?;

        info!("Booking {} canceled", booking_id);
        self.notify(NotificationEvent::Canceled, &canceled).await;

        Ok(canceled)
    }

    /// Menus, bookable staff and weekly hours for the booking form.
    pub async fn catalog(&self) -> Result<Catalog, SchedulingError> {
        let (menus, staff, business_hours) = futures::try_join!(
            self.store.list_menus(),
            self.store.list_staff(StaffFilter::bookable()),
            self.store.list_business_hours(),
        )?;
        Ok(Catalog {
            menus,
            staff,
            business_hours,
        })
    }

    pub async fn list_bookings(&self, query: BookingListQuery) -> Result<BookingPage, SchedulingError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(SchedulingError::Validation(format!(
                "limit must be 1-{}",
                MAX_PAGE_SIZE
            )));
        }
        let filter = BookingFilter {
            status: query.status,
            starts_within: query.date.map(|d| clinic_day(self.timezone, d)).transpose()?,
            staff_id: query.staff_id,
            limit,
            offset: query.offset.unwrap_or(0),
        };
        debug!("Listing bookings: {:?}", filter);

        let bookings = self.store.list_bookings(filter).await?;
        Ok(BookingPage {
            bookings,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    /// Re-run under the staff lock. Balancer-picked staff are re-checked
    /// against their window and parallel cap as well as overlap.
    async fn ensure_still_free(
        &self,
        assignment: &Assignment,
        interval: &TimeRange,
        exclude_booking: Option<Uuid>,
        check_capacity: bool,
    ) -> Result<(), SchedulingError> {
        let free = if check_capacity {
            self.balancer
                .can_take(assignment.staff_id, interval, exclude_booking)
                .await?
        } else {
            self.guard
                .staff_is_free(assignment.staff_id, interval, exclude_booking)
                .await?
        };
        if free {
            Ok(())
        } else {
            warn!("Staff {} was taken by a concurrent booking", assignment.staff_id);
            Err(SchedulingError::RetryableConflict(format!(
                "staff {} is no longer free at {}",
                assignment.staff_id, interval.start
            )))
        }
    }

    async fn menu(&self, menu_id: Uuid) -> Result<Menu, SchedulingError> {
        self.store
            .get_menu(menu_id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("Menu {} not found", menu_id)))
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Booking, SchedulingError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("Booking {} not found", booking_id)))
    }

    async fn notify(&self, event: NotificationEvent, booking: &Booking) {
        match self.notifier.notify(event, booking).await {
            Ok(results) if !results.is_empty() && results.iter().all(|r| !r.success) => {
                warn!("Every {} notification for booking {} failed", event, booking.id);
            }
            Ok(_) => {}
            Err(e) => warn!("{} notification for booking {} not sent: {}", event, booking.id, e),
        }
    }
}

fn approved(verdict: GuardVerdict) -> Result<Assignment, SchedulingError> {
    match verdict {
        GuardVerdict::Approved(assignment) => Ok(assignment),
        GuardVerdict::Rejected(reason) => Err(SchedulingError::Rejected(reason)),
    }
}

fn write_error(e: StoreError) -> SchedulingError {
    match e {
        StoreError::WriteConflict(msg) => SchedulingError::RetryableConflict(msg),
        StoreError::NotFound(msg) => SchedulingError::NotFound(msg),
        other => SchedulingError::Storage(other),
    }
}
