use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingStatus, BookingUpdate, BusinessHours, Menu, NewBooking, NewPatient, Patient,
    Staff, StaffFilter, StaffSchedule, StoreError, TimeRange,
};
use crate::services::store::SchedulingStore;

#[derive(Default)]
struct MemoryState {
    business_hours: HashMap<u32, BusinessHours>,
    schedules: HashMap<(Uuid, NaiveDate), StaffSchedule>,
    staff: Vec<Staff>,
    menus: HashMap<Uuid, Menu>,
    patients: Vec<Patient>,
    bookings: Vec<Booking>,
}

impl MemoryState {
    fn overlapping_booking(&self, staff_id: Uuid, interval: &TimeRange, exclude: Option<Uuid>) -> Option<Uuid> {
        self.bookings
            .iter()
            .filter(|b| b.is_confirmed() && b.staff_id == staff_id && Some(b.id) != exclude)
            .find(|b| b.interval().overlaps(interval))
            .map(|b| b.id)
    }
}

/// Process-local store for development runs and tests. Writes enforce the
/// per-staff no-overlap rule the way a database exclusion constraint would.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mon-Sat 09:00-18:00, Sunday closed, two public staff and two menus.
    pub async fn with_demo_data() -> Self {
        let store = Self::new();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default();
        let six = NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default();
        for weekday in 0..7 {
            store
                .put_business_hours(BusinessHours {
                    weekday,
                    open_time: nine,
                    close_time: six,
                    is_closed: weekday == 0,
                })
                .await;
        }
        for name in ["Aoki", "Baba"] {
            store
                .put_staff(Staff {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    is_active: true,
                    is_public: true,
                    max_parallel: 8,
                })
                .await;
        }
        for (name, minutes) in [("Consultation", 30), ("Treatment", 60)] {
            store
                .put_menu(Menu {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    duration_min: minutes,
                    description: None,
                })
                .await;
        }
        store
    }

    pub async fn put_business_hours(&self, hours: BusinessHours) {
        self.state.write().await.business_hours.insert(hours.weekday, hours);
    }

    pub async fn put_staff_schedule(&self, schedule: StaffSchedule) {
        self.state
            .write()
            .await
            .schedules
            .insert((schedule.staff_id, schedule.date), schedule);
    }

    pub async fn put_staff(&self, staff: Staff) {
        let mut state = self.state.write().await;
        state.staff.retain(|s| s.id != staff.id);
        state.staff.push(staff);
        state.staff.sort_by(|a, b| a.name.cmp(&b.name));
    }

    pub async fn put_menu(&self, menu: Menu) {
        self.state.write().await.menus.insert(menu.id, menu);
    }

    pub async fn put_patient(&self, patient: Patient) {
        let mut state = self.state.write().await;
        state.patients.retain(|p| p.id != patient.id);
        state.patients.push(patient);
    }

    /// Seed a booking as-is, bypassing the overlap check.
    pub async fn put_booking(&self, booking: Booking) {
        let mut state = self.state.write().await;
        state.bookings.retain(|b| b.id != booking.id);
        state.bookings.push(booking);
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        self.state.read().await.bookings.clone()
    }
}

fn confirmed_starting_in<'a>(
    bookings: &'a [Booking],
    range: &'a TimeRange,
) -> impl Iterator<Item = &'a Booking> + 'a {
    bookings
        .iter()
        .filter(move |b| b.is_confirmed() && range.start <= b.start_ts && b.start_ts < range.end)
}

fn sorted_by_start(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by_key(|b| b.start_ts);
    bookings
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn business_hours(&self, weekday: u32) -> Result<Option<BusinessHours>, StoreError> {
        Ok(self.state.read().await.business_hours.get(&weekday).cloned())
    }

    async fn list_business_hours(&self) -> Result<Vec<BusinessHours>, StoreError> {
        let mut hours: Vec<BusinessHours> =
            self.state.read().await.business_hours.values().cloned().collect();
        hours.sort_by_key(|h| h.weekday);
        Ok(hours)
    }

    async fn staff_schedule(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<StaffSchedule>, StoreError> {
        Ok(self.state.read().await.schedules.get(&(staff_id, date)).cloned())
    }

    async fn get_staff(&self, staff_id: Uuid) -> Result<Option<Staff>, StoreError> {
        Ok(self.state.read().await.staff.iter().find(|s| s.id == staff_id).cloned())
    }

    async fn list_staff(&self, filter: StaffFilter) -> Result<Vec<Staff>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .staff
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    async fn list_confirmed_bookings(
        &self,
        staff_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        Ok(sorted_by_start(
            confirmed_starting_in(&state.bookings, &range)
                .filter(|b| b.staff_id == staff_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_confirmed_bookings_between(
        &self,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        Ok(sorted_by_start(confirmed_starting_in(&state.bookings, &range).cloned().collect()))
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.state.read().await.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> =
            state.bookings.iter().filter(|b| filter.matches(b)).cloned().collect();
        bookings.sort_by(|a, b| b.start_ts.cmp(&a.start_ts));
        Ok(bookings.into_iter().skip(filter.offset).take(filter.limit).collect())
    }

    async fn get_menu(&self, id: Uuid) -> Result<Option<Menu>, StoreError> {
        Ok(self.state.read().await.menus.get(&id).cloned())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
        let mut menus: Vec<Menu> = self.state.read().await.menus.values().cloned().collect();
        menus.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(menus)
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.state.read().await.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn upsert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        let mut state = self.state.write().await;

        if let Some(email) = patient.email.as_deref() {
            if let Some(existing) = state
                .patients
                .iter_mut()
                .find(|p| p.email.as_deref() == Some(email))
            {
                debug!("Updating existing patient {}", existing.id);
                existing.name = patient.name;
                existing.phone = patient.phone;
                existing.preferred_contact = patient.preferred_contact;
                return Ok(existing.clone());
            }
        }

        let created = Patient {
            id: Uuid::new_v4(),
            name: patient.name,
            email: patient.email,
            phone: patient.phone,
            line_user_id: None,
            preferred_contact: patient.preferred_contact,
        };
        state.patients.push(created.clone());
        Ok(created)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut state = self.state.write().await;
        let interval = TimeRange::new(booking.start_ts, booking.end_ts);

        if let Some(existing) = state.overlapping_booking(booking.staff_id, &interval, None) {
            warn!("Rejected overlapping insert for staff {} (existing booking {})", booking.staff_id, existing);
            return Err(StoreError::WriteConflict(format!(
                "staff {} already booked by {}",
                booking.staff_id, existing
            )));
        }

        let now = Utc::now();
        let created = Booking {
            id: Uuid::new_v4(),
            patient_id: Some(booking.patient_id),
            menu_id: booking.menu_id,
            staff_id: booking.staff_id,
            start_ts: booking.start_ts,
            end_ts: booking.end_ts,
            status: BookingStatus::Confirmed,
            contact_channels: booking.contact_channels,
            created_at: now,
            updated_at: now,
        };
        state.bookings.push(created.clone());
        Ok(created)
    }

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> Result<Booking, StoreError> {
        let mut state = self.state.write().await;

        let mut updated = state
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", id)))?;
        update.apply(&mut updated);
        updated.updated_at = Utc::now();

        if updated.is_confirmed() {
            if let Some(existing) = state.overlapping_booking(updated.staff_id, &updated.interval(), Some(id)) {
                warn!("Rejected overlapping update of booking {} (existing booking {})", id, existing);
                return Err(StoreError::WriteConflict(format!(
                    "staff {} already booked by {}",
                    updated.staff_id, existing
                )));
            }
        }

        if let Some(slot) = state.bookings.iter_mut().find(|b| b.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }
}
