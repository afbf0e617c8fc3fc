use axum::{Json, debug_handler, extract::State};
use tracing::info;

use crate::{
    AppError, AppResult, AppState, Registry,
    db::{NewRoomAssignment, StoredRoomAssignment},
    error::StorageContext,
    form::FormFields,
    registry::intake::{parse_date, present},
};

#[debug_handler(state = AppState)]
pub(crate) async fn list_assignments(
    State(registry): State<Registry>,
) -> AppResult<Json<Vec<StoredRoomAssignment>>> {
    let assignments = registry
        .list_room_assignments()
        .await
        .storage_failure("Failed to fetch room assignments")?;
    Ok(Json(assignments))
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_assignment(
    State(registry): State<Registry>,
    mut fields: FormFields,
) -> AppResult<Json<StoredRoomAssignment>> {
    let assignment = parse_assignment(&mut fields)?;

    let stored = registry
        .insert_room_assignment(&assignment)
        .await
        .storage_failure("Failed to add room assignment")?;

    info!(id = stored.id, "room {} at {} assigned", stored.room_number, stored.hotel_name);
    Ok(Json(stored))
}

/// The admin panel posts camelCase names; snake_case is accepted as well.
fn parse_assignment(fields: &mut FormFields) -> AppResult<NewRoomAssignment> {
    let mut required = |names: &[&str]| {
        present(fields.take_text_any(names))
            .ok_or_else(|| AppError::BadRequest("All fields are required".to_owned()))
    };

    let name = required(&["name"])?;
    let date_of_birth = required(&["date_of_birth", "dateOfBirth"])?;
    let room_number = required(&["room_number", "roomNumber"])?;
    let hotel_name = required(&["hotel_name", "hotelName"])?;

    Ok(NewRoomAssignment {
        name,
        date_of_birth: parse_date("date_of_birth", &date_of_birth)?,
        room_number,
        hotel_name,
    })
}
