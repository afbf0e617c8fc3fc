mod assignments;
pub mod verify;

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/admin",
        get(assignments::list_assignments)
            .post(assignments::add_assignment)
            .put(verify::verify_room),
    )
}
