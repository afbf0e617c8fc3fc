//! Reveals a guest's room when they supply the date of birth it was booked under.
//!
//! The date is compared in plaintext and attempts are not limited, so anyone
//! who can guess a birthday can read that room. Nothing is kept server side;
//! the unlocked state lives only in the client.

use axum::{Json, debug_handler, extract::State};
use serde::Deserialize;
use time::Date;
use tracing::info;

use crate::{
    AppError, AppResult, AppState, Registry,
    db::StoredRoomAssignment,
    error::{JsonBody, StorageContext},
    registry::intake::{parse_date, present},
};

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyRequest {
    #[serde(default)]
    date_of_birth: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn verify_room(
    State(registry): State<Registry>,
    JsonBody(VerifyRequest { date_of_birth }): JsonBody<VerifyRequest>,
) -> AppResult<Json<StoredRoomAssignment>> {
    let Some(date_of_birth) = present(date_of_birth) else {
        return Err(AppError::BadRequest("Date of birth is required".to_owned()));
    };
    let date_of_birth = parse_date("date_of_birth", &date_of_birth)?;

    Ok(Json(verify(&registry, date_of_birth).await?))
}

pub async fn verify(registry: &Registry, date_of_birth: Date) -> AppResult<StoredRoomAssignment> {
    let assignment = registry
        .find_room_assignment_by_date_of_birth(date_of_birth)
        .await
        .storage_failure("Failed to verify room assignment")?
        .ok_or(AppError::NotFound("No room assignment found"))?;

    info!(id = assignment.id, "room assignment unlocked");
    Ok(assignment)
}
