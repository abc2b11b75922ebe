use std::env;
use std::str::FromStr;

use chrono_tz::Tz;
use tracing::warn;

/// Which record store backs the scheduling cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    Memory,
}

/// Clinic-specific scheduling settings.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Fixed clinic time zone, used only for weekday/window resolution
    /// and calendar-day bucketing.
    pub timezone: Tz,
    /// Cadence at which candidate slots are generated.
    pub slot_interval_minutes: i64,
    /// Global booking gate, hour-of-day in clinic time: `open_hour <= h < close_hour`.
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Tokyo,
            slot_interval_minutes: 30,
            open_hour: 9,
            close_hour: 18,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub admin_secret: String,
    pub clinic_name: String,
    pub storage_backend: StorageBackend,
    pub port: u16,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingConfig::default();

        let supabase_url = env::var("SUPABASE_URL").unwrap_or_else(|_| {
            warn!("SUPABASE_URL not set, using empty value");
            String::new()
        });

        let storage_backend = match env::var("STORAGE_BACKEND").ok().as_deref() {
            Some("supabase") => StorageBackend::Supabase,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                warn!("Unknown STORAGE_BACKEND '{}', falling back to auto-detection", other);
                Self::detect_backend(&supabase_url)
            }
            None => Self::detect_backend(&supabase_url),
        };

        let scheduling = SchedulingConfig {
            timezone: env::var("CLINIC_TIMEZONE")
                .ok()
                .and_then(|raw| match Tz::from_str(&raw) {
                    Ok(tz) => Some(tz),
                    Err(_) => {
                        warn!("CLINIC_TIMEZONE '{}' is not a known zone, using default", raw);
                        None
                    }
                })
                .unwrap_or(defaults.timezone),
            slot_interval_minutes: parse_or("SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes),
            open_hour: parse_or("BOOKING_OPEN_HOUR", defaults.open_hour),
            close_hour: parse_or("BOOKING_CLOSE_HOUR", defaults.close_hour),
        };

        let config = Self {
            supabase_url,
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            admin_secret: env::var("ADMIN_SECRET")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_SECRET not set, admin endpoints will reject all requests");
                    String::new()
                }),
            clinic_name: env::var("CLINIC_NAME").unwrap_or_else(|_| "Clinic".to_string()),
            storage_backend,
            port: parse_or("PORT", 3000),
            scheduling,
        };

        if !config.scheduling.is_valid() {
            warn!(
                "Scheduling settings look inconsistent (interval {}m, gate {}:00-{}:00)",
                config.scheduling.slot_interval_minutes,
                config.scheduling.open_hour,
                config.scheduling.close_hour
            );
        }

        if config.storage_backend == StorageBackend::Supabase && !config.is_configured() {
            warn!("Supabase backend selected but not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    fn detect_backend(supabase_url: &str) -> StorageBackend {
        if supabase_url.is_empty() {
            StorageBackend::Memory
        } else {
            StorageBackend::Supabase
        }
    }
}

impl SchedulingConfig {
    pub fn is_valid(&self) -> bool {
        self.slot_interval_minutes > 0 && self.open_hour < self.close_hour && self.close_hour <= 24
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
