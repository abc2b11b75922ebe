use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::{ApiError, SupabaseClient};

use crate::models::{
    Booking, BookingFilter, BookingUpdate, BusinessHours, Menu, NewBooking, NewPatient, Patient, Staff,
    StaffFilter, StaffSchedule, StoreError, TimeRange,
};
use crate::services::store::SchedulingStore;

/// `SchedulingStore` over the Supabase REST API.
pub struct SupabaseStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None)
            .await
            .map_err(store_error)?;
        decode_rows(rows)
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.fetch(path).await?.into_iter().next())
    }

    async fn write_one<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Value,
    ) -> Result<T, StoreError> {
        let rows: Vec<Value> = self
            .supabase
            .request_returning(method, path, body)
            .await
            .map_err(store_error)?;

        decode_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("no row returned from {}", path)))
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| StoreError::Decode(e.to_string()))
}

fn store_error(e: anyhow::Error) -> StoreError {
    if let Some(api) = e.downcast_ref::<ApiError>() {
        if api.is_conflict() {
            return StoreError::WriteConflict(api.body.clone());
        }
    }
    if let Some(decode) = e.downcast_ref::<reqwest::Error>().filter(|re| re.is_decode()) {
        return StoreError::Decode(decode.to_string());
    }
    error!("Supabase request failed: {}", e);
    StoreError::Unavailable(e.to_string())
}

fn ts(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl SchedulingStore for SupabaseStore {
    async fn business_hours(&self, weekday: u32) -> Result<Option<BusinessHours>, StoreError> {
        let path = format!("/rest/v1/business_hours?weekday=eq.{}&limit=1", weekday);
        self.fetch_one(&path).await
    }

    async fn list_business_hours(&self) -> Result<Vec<BusinessHours>, StoreError> {
        self.fetch("/rest/v1/business_hours?select=*&order=weekday.asc").await
    }

    async fn staff_schedule(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<StaffSchedule>, StoreError> {
        let path = format!(
            "/rest/v1/staff_schedules?staff_id=eq.{}&date=eq.{}&limit=1",
            staff_id,
            date.format("%Y-%m-%d")
        );
        self.fetch_one(&path).await
    }

    async fn get_staff(&self, staff_id: Uuid) -> Result<Option<Staff>, StoreError> {
        let path = format!("/rest/v1/staffs?id=eq.{}", staff_id);
        self.fetch_one(&path).await
    }

    async fn list_staff(&self, filter: StaffFilter) -> Result<Vec<Staff>, StoreError> {
        let mut query_parts = vec!["select=*".to_string()];
        if let Some(active) = filter.active {
            query_parts.push(format!("is_active=eq.{}", active));
        }
        if let Some(public) = filter.public {
            query_parts.push(format!("is_public=eq.{}", public));
        }
        query_parts.push("order=name.asc".to_string());

        let path = format!("/rest/v1/staffs?{}", query_parts.join("&"));
        self.fetch(&path).await
    }

    async fn list_confirmed_bookings(
        &self,
        staff_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        debug!("Fetching confirmed bookings for staff {} in [{}, {})", staff_id, range.start, range.end);
        let path = format!(
            "/rest/v1/bookings?staff_id=eq.{}&status=eq.confirmed&start_ts=gte.{}&start_ts=lt.{}&order=start_ts.asc",
            staff_id,
            ts(range.start),
            ts(range.end)
        );
        self.fetch(&path).await
    }

    async fn list_confirmed_bookings_between(
        &self,
        range: TimeRange,
    ) -> Result<Vec<Booking>, StoreError> {
        let path = format!(
            "/rest/v1/bookings?status=eq.confirmed&start_ts=gte.{}&start_ts=lt.{}&order=start_ts.asc",
            ts(range.start),
            ts(range.end)
        );
        self.fetch(&path).await
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.fetch_one(&format!("/rest/v1/bookings?id=eq.{}", id)).await
    }

    async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let mut query_parts = vec!["select=*".to_string()];
        if let Some(status) = filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(staff_id) = filter.staff_id {
            query_parts.push(format!("staff_id=eq.{}", staff_id));
        }
        if let Some(range) = filter.starts_within {
            query_parts.push(format!("start_ts=gte.{}", ts(range.start)));
            query_parts.push(format!("start_ts=lt.{}", ts(range.end)));
        }
        query_parts.push("order=start_ts.desc".to_string());
        query_parts.push(format!("limit={}", filter.limit));
        query_parts.push(format!("offset={}", filter.offset));

        let path = format!("/rest/v1/bookings?{}", query_parts.join("&"));
        debug!("Listing bookings: {}", path);
        self.fetch(&path).await
    }

    async fn get_menu(&self, id: Uuid) -> Result<Option<Menu>, StoreError> {
        self.fetch_one(&format!("/rest/v1/menus?id=eq.{}", id)).await
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, StoreError> {
        self.fetch("/rest/v1/menus?select=*&order=name.asc").await
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.fetch_one(&format!("/rest/v1/patients?id=eq.{}", id)).await
    }

    async fn upsert_patient(&self, patient: NewPatient) -> Result<Patient, StoreError> {
        if let Some(email) = patient.email.as_deref() {
            let path = format!(
                "/rest/v1/patients?email=eq.{}&limit=1",
                urlencoding::encode(email)
            );
            if let Some(existing) = self.fetch_one::<Patient>(&path).await? {
                debug!("Updating existing patient {}", existing.id);
                let update = json!({
                    "name": patient.name,
                    "phone": patient.phone,
                    "preferred_contact": patient.preferred_contact,
                });
                let path = format!("/rest/v1/patients?id=eq.{}", existing.id);
                return self.write_one(Method::PATCH, &path, update).await;
            }
        }

        let body = serde_json::to_value(&patient).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.write_one(Method::POST, "/rest/v1/patients", body).await
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut body = serde_json::to_value(&booking).map_err(|e| StoreError::Decode(e.to_string()))?;
        body["status"] = json!("confirmed");

        let created: Booking = self.write_one(Method::POST, "/rest/v1/bookings", body).await?;
        debug!("Booking created with ID: {}", created.id);
        Ok(created)
    }

    async fn update_booking(&self, id: Uuid, update: BookingUpdate) -> Result<Booking, StoreError> {
        let mut body = serde_json::to_value(&update).map_err(|e| StoreError::Decode(e.to_string()))?;
        body["updated_at"] = json!(ts(Utc::now()));

        let path = format!("/rest/v1/bookings?id=eq.{}", id);
        self.write_one(Method::PATCH, &path, body).await
    }
}
