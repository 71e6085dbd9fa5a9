use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use smash_store::registry::{RegistryError, REGISTRY};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/registry", get(fetch_registry))
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    id: Option<String>,
}

/// Fetch: return the decrypted content of `registry/<id>`.
///
/// A missing `id`, a malformed `id`, and a missing object all answer 403,
/// so probing cannot distinguish "no such entry" from "not allowed to
/// ask". Only fingerprint-shaped ids ever reach storage; the id must not
/// be able to name objects outside the registry namespace.
async fn fetch_registry(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Response, AppError> {
    let Some(id) = params.id else {
        return Ok((StatusCode::FORBIDDEN, "Request forbidden\n").into_response());
    };
    if !smash_core::is_fingerprint(&id) {
        return Ok((StatusCode::FORBIDDEN, "Forbidden\n").into_response());
    }

    match state.registry.get(REGISTRY, &id).await {
        Ok(content) => Ok((StatusCode::OK, content).into_response()),
        Err(RegistryError::NotFound(_)) => {
            Ok((StatusCode::FORBIDDEN, "Forbidden\n").into_response())
        }
        Err(err) => Err(AppError::InternalServerError(err.to_string())),
    }
}
