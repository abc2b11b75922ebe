use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::extractor::admin_middleware;

use crate::handlers::{self, SchedulingState};

pub fn scheduling_routes(state: SchedulingState) -> Router {
    let public_routes = Router::new()
        .route("/catalog", get(handlers::get_catalog))
        .route("/slots", get(handlers::list_slots))
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/{booking_id}/reschedule", post(handlers::reschedule_booking))
        .route("/bookings/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/staff/assign", get(handlers::preview_assignment));

    // Operator endpoints, bearer admin secret
    let admin_routes = Router::new()
        .route("/admin/bookings", get(handlers::list_bookings))
        .route("/admin/reminders/run", post(handlers::run_reminders))
        .layer(middleware::from_fn_with_state(state.config.clone(), admin_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
