use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use notification_cell::{
    InMemoryNotificationLog, NotificationDispatcher, NotificationLog, SupabaseNotificationLog,
};
use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::services::{
    BookingService, DispatcherNotifier, InMemoryStore, ReminderService, SchedulingStore,
    StaffLocks, SupabaseStore,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());
    info!("Starting {} booking API ({:?} storage)", config.clinic_name, config.storage_backend);

    let state = build_state(config.clone()).await;

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Wires store, notifications and services for the configured backend.
async fn build_state(config: Arc<AppConfig>) -> SchedulingState {
    let (store, log): (Arc<dyn SchedulingStore>, Arc<dyn NotificationLog>) = match config.storage_backend {
        StorageBackend::Supabase => {
            let supabase = Arc::new(SupabaseClient::new(&config));
            (
                Arc::new(SupabaseStore::new(supabase.clone())),
                Arc::new(SupabaseNotificationLog::new(supabase)),
            )
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage with demo data; bookings are lost on restart");
            (
                Arc::new(InMemoryStore::with_demo_data().await),
                Arc::new(InMemoryNotificationLog::new()),
            )
        }
    };

    let scheduling = &config.scheduling;
    let dispatcher = Arc::new(
        NotificationDispatcher::new(log.clone(), config.clinic_name.clone(), scheduling.timezone)
            .with_log_senders(),
    );
    let notifier = Arc::new(DispatcherNotifier::new(dispatcher, store.clone()));

    let bookings = Arc::new(BookingService::new(
        store.clone(),
        notifier.clone(),
        scheduling,
        Arc::new(StaffLocks::new()),
    ));
    let reminders = Arc::new(ReminderService::new(store, notifier, log, scheduling.timezone));

    SchedulingState {
        bookings,
        reminders,
        config,
    }
}
