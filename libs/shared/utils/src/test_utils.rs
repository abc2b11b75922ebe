use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig, StorageBackend};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub admin_secret: String,
    pub clinic_name: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            admin_secret: "test-admin-secret".to_string(),
            clinic_name: "Test Clinic".to_string(),
        }
    }
}

impl TestConfig {
    pub fn for_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn with_admin_secret(secret: &str) -> Self {
        Self {
            admin_secret: secret.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            admin_secret: self.admin_secret.clone(),
            clinic_name: self.clinic_name.clone(),
            storage_backend: StorageBackend::Supabase,
            port: 0,
            scheduling: SchedulingConfig::default(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// PostgREST row fixtures matching the clinic schema.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn staff_response(id: &Uuid, name: &str, is_public: bool, max_parallel: u32) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "is_active": true,
            "is_public": is_public,
            "max_parallel": max_parallel
        })
    }

    pub fn business_hours_response(weekday: u32, open: &str, close: &str, is_closed: bool) -> serde_json::Value {
        json!({
            "id": weekday + 1,
            "weekday": weekday,
            "open_time": open,
            "close_time": close,
            "is_closed": is_closed
        })
    }

    pub fn staff_schedule_response(
        staff_id: &Uuid,
        date: &str,
        is_off: bool,
        work_start: Option<&str>,
        work_end: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": 1,
            "staff_id": staff_id,
            "date": date,
            "is_off": is_off,
            "work_start": work_start,
            "work_end": work_end
        })
    }

    pub fn booking_response(
        id: &Uuid,
        staff_id: &Uuid,
        menu_id: &Uuid,
        start_ts: &str,
        end_ts: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": null,
            "menu_id": menu_id,
            "staff_id": staff_id,
            "start_ts": start_ts,
            "end_ts": end_ts,
            "status": status,
            "contact_channels": ["email"],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn menu_response(id: &Uuid, name: &str, duration_min: i64) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "duration_min": duration_min,
            "description": null
        })
    }

    pub fn patient_response(id: &Uuid, name: &str, email: Option<&str>, phone: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "email": email,
            "phone": phone,
            "line_user_id": null,
            "preferred_contact": "email",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
