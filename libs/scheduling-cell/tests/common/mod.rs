// Shared fixtures for the scheduling-cell integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use notification_cell::{ContactPreference, NotificationChannel};
use scheduling_cell::models::*;
use scheduling_cell::services::{AvailabilityCalculator, InMemoryStore, SchedulingStore};
use shared_config::SchedulingConfig;

pub fn tokyo() -> Tz {
    chrono_tz::Asia::Tokyo
}

/// A Monday far enough ahead that "not in the past" always holds.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 4).unwrap()
}

pub fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 3, 3).unwrap()
}

pub fn clock(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Clinic-local wall time on `date` as a UTC instant.
pub fn local(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    tokyo()
        .from_local_datetime(&date.and_time(clock(h, m)))
        .unwrap()
        .with_timezone(&Utc)
}

pub fn config() -> SchedulingConfig {
    SchedulingConfig::default()
}

/// Mon-Sat 09:00-18:00, Sunday closed.
pub async fn open_week(store: &InMemoryStore) {
    for weekday in 0..7 {
        store
            .put_business_hours(BusinessHours {
                weekday,
                open_time: clock(9, 0),
                close_time: clock(18, 0),
                is_closed: weekday == 0,
            })
            .await;
    }
}

pub async fn add_staff(store: &InMemoryStore, name: &str, max_parallel: u32) -> Staff {
    let staff = Staff {
        id: Uuid::new_v4(),
        name: name.to_string(),
        is_active: true,
        is_public: true,
        max_parallel,
    };
    store.put_staff(staff.clone()).await;
    staff
}

pub async fn add_menu(store: &InMemoryStore, name: &str, minutes: i64) -> Menu {
    let menu = Menu {
        id: Uuid::new_v4(),
        name: name.to_string(),
        duration_min: minutes,
        description: None,
    };
    store.put_menu(menu.clone()).await;
    menu
}

pub async fn add_patient(store: &InMemoryStore, name: &str, email: &str) -> Patient {
    let patient = Patient {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: Some(email.to_string()),
        phone: None,
        line_user_id: None,
        preferred_contact: ContactPreference::Email,
    };
    store.put_patient(patient.clone()).await;
    patient
}

pub fn booking(staff_id: Uuid, menu_id: Uuid, start: DateTime<Utc>, minutes: i64) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        patient_id: None,
        menu_id,
        staff_id,
        start_ts: start,
        end_ts: start + Duration::minutes(minutes),
        status: BookingStatus::Confirmed,
        contact_channels: vec![NotificationChannel::Email],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn add_booking(
    store: &InMemoryStore,
    staff_id: Uuid,
    start: DateTime<Utc>,
    minutes: i64,
) -> Booking {
    let booking = booking(staff_id, Uuid::new_v4(), start, minutes);
    store.put_booking(booking.clone()).await;
    booking
}

pub async fn open_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    open_week(&store).await;
    store
}

pub fn calculator(store: Arc<InMemoryStore>) -> Arc<AvailabilityCalculator> {
    let store: Arc<dyn SchedulingStore> = store;
    Arc::new(AvailabilityCalculator::new(store, tokyo()))
}

/// In-memory store with injectable faults: a pause before patient writes so
/// concurrent requests pass the guard together, or every call unavailable.
pub struct ScriptedStore {
    pub inner: Arc<InMemoryStore>,
    patient_write_delay: Option<std::time::Duration>,
    unavailable: bool,
}

impl ScriptedStore {
    pub fn slow_patient_writes(inner: Arc<InMemoryStore>, millis: u64) -> Self {
        Self {
            inner,
            patient_write_delay: Some(std::time::Duration::from_millis(millis)),
            unavailable: false,
        }
    }

    pub fn unavailable(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            patient_write_delay: None,
            unavailable: true,
        }
    }

    fn up(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SchedulingStore for ScriptedStore {
    async fn business_hours(&self, weekday: u32) -> Result<Option<BusinessHours>, StoreError> {
        self.up()?;
        self.inner.business_hours(weekday).await
    }

    async fn list_business_hours(&self) -> Result<Vec<BusinessHours>, StoreError> {
        self.up()?;
        self.inner.list_business_hours().await
    }

    async fn staff_schedule(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<StaffSchedule>, StoreError> {
        self.up()?;
        self.inner.staff_schedule(staff_id, date).await
    }

    async fn get_staff(&self, staff_id: Uuid) -> Result<Option<Staff>, StoreError> {
        self.up()?;
        self.inner.get_staff(staff_id).await
    }

    async fn list_staff(&self, filter: StaffFilter) -> Result<Vec<Staff>, StoreError> {
        self.up()?;
        self.inner.list_staff(filter).await
    }

    async fn list_confirmed_bookings(
        &self,
        staff_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        self.up()?;
        self.inner.list_confirmed_bookings(staff_id, range).await
    }

    async fn list_confirmed_bookings_between(
        &self,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        self.up()?;
        self.inner.list_confirmed_bookings_between(range).await
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        self.up()?;
        self.inner.list_bookings(filter).await
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.up()?;
        self.inner.get_booking(id).await
    }

    async fn get_menu(&self, id: Uuid) -> Result<Option<Menu>, StoreError> {
        self.up()?;
        self.inner.get_menu(id).await
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
        self.up()?;
        self.inner.list_menus().await
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.up()?;
        self.inner.get_patient(id).await
    }

    async fn upsert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        self.up()?;
        if let Some(delay) = self.patient_write_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.upsert_patient(patient).await
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        self.up()?;
        self.inner.create_booking(booking).await
    }

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> Result<Booking, StoreError> {
        self.up()?;
        self.inner.update_booking(id, update).await
    }
}
