use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingUpdate, BusinessHours, Menu, NewBooking, NewPatient, Patient, Staff,
    StaffFilter, StaffSchedule, StoreError, TimeRange,
};

/// Record store behind the scheduling core. Every read is fresh; nothing
/// here may be cached across requests.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// `None` means no record, which the core treats as closed.
    async fn business_hours(&self, weekday: u32) -> Result<Option<BusinessHours>, StoreError>;

    /// Every configured weekday, ordered by weekday.
    async fn list_business_hours(&self) -> Result<Vec<BusinessHours>, StoreError>;

    async fn staff_schedule(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<StaffSchedule>, StoreError>;

    async fn get_staff(&self, staff_id: Uuid) -> Result<Option<Staff>, StoreError>;

    /// Ordered by name.
    async fn list_staff(&self, filter: StaffFilter) -> Result<Vec<Staff>, StoreError>;

    /// Confirmed bookings of one staff member starting in `[range.start, range.end)`, by start.
    async fn list_confirmed_bookings(
        &self,
        staff_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Confirmed bookings of every staff member starting in `range`, by start.
    async fn list_confirmed_bookings_between(
        &self,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Newest start first, after `filter.offset` rows, at most `filter.limit`.
    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError>;

    async fn get_menu(&self, id: Uuid) -> Result<Option<Menu>, StoreError>;

    /// Ordered by name.
    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError>;

    /// Matches an existing patient by e-mail when one is given, else inserts.
    async fn upsert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError>;

    /// Fails with `WriteConflict` if the staff member already has an
    /// overlapping confirmed booking.
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError>;

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> Result<Booking, StoreError>;
}
