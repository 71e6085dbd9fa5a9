use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use smash_core::Reservation;
use smash_store::registry::REGISTRY;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/reservations", post(create_reservation))
}

/// Intake: create a registry entry only if none exists for the request's
/// fingerprint. Resubmitting an identical request is a no-op.
async fn create_reservation(
    State(state): State<AppState>,
    Json(reservation): Json<Reservation>,
) -> Result<String, AppError> {
    let fingerprint = reservation.fingerprint();

    let present = state
        .registry
        .exists(REGISTRY, &fingerprint)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if present {
        info!(%fingerprint, "reservation already registered");
        return Ok("Registry already exist\n".to_string());
    }

    let content = reservation.to_bytes()?;
    state
        .registry
        .put(REGISTRY, &fingerprint, &content)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    info!(%fingerprint, username = %reservation.username, "reservation registered");

    Ok(format!(
        "Username: {}\nPassword: {}\nReserve date: {}\nReserve court: {}\nReserve time: {}\n",
        reservation.username,
        reservation.password,
        reservation.reserve_date,
        reservation.reserve_court,
        reservation.reserve_time,
    ))
}
