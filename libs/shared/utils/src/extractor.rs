use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::warn;

use shared_models::error::AppError;
use shared_config::AppConfig;

/// Guards operator endpoints (reminder runs) with the shared admin secret
/// passed as a bearer token.
pub async fn admin_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Missing or malformed bearer token".to_string()))?;

    if config.admin_secret.is_empty() || !secrets_match(auth.token(), &config.admin_secret) {
        warn!("Rejected admin request with invalid secret");
        return Err(AppError::Auth("Invalid admin credentials".to_string()));
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison of the secret bytes once the lengths agree.
fn secrets_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
