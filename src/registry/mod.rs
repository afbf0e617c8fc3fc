pub mod intake;
pub mod media;

use std::sync::Arc;

use axum::{Json, Router, debug_handler, extract::State, routing::get};
use tracing::info;

use crate::{
    AppResult, AppState, Config, Registry, Remotes,
    db::StoredGuest,
    error::StorageContext,
    form::FormFields,
};

use intake::GuestSubmission;
use media::PhotoStyle;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/wedding-registry", get(list_guests).post(register_guest))
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_guests(State(registry): State<Registry>) -> AppResult<Json<Vec<StoredGuest>>> {
    let guests = registry
        .list_guests()
        .await
        .storage_failure("Failed to fetch guest list")?;
    Ok(Json(guests))
}

#[debug_handler(state = AppState)]
pub(crate) async fn register_guest(
    State(registry): State<Registry>,
    State(remotes): State<Remotes>,
    State(config): State<Arc<Config>>,
    mut fields: FormFields,
) -> AppResult<Json<StoredGuest>> {
    let mut guest = submission(&mut fields).validate()?;

    if let Some(photo) = fields.take_file("photo") {
        let style = PhotoStyle::from_field(fields.text("photoStyle"));
        guest.photo_url =
            media::normalize_photo(photo, style, remotes.stylist.as_ref(), config.photo_fallback).await;
    } else {
        guest.photo_url = inline_reference(fields.take_text("photo"));
    }

    if let Some(voice_note) = fields.take_file("voiceNote") {
        guest.voice_note_url = media::normalize_voice_note(&voice_note);
    } else {
        guest.voice_note_url = inline_reference(fields.take_text("voiceNote"));
    }

    let stored = registry
        .insert_guest(&guest)
        .await
        .storage_failure("Failed to add guest to registry")?;

    info!(
        id = stored.id,
        association = %stored.association,
        "registered {}",
        stored.name
    );
    Ok(Json(stored))
}

fn submission(fields: &mut FormFields) -> GuestSubmission {
    GuestSubmission {
        name: fields.take_text("name"),
        email: fields.take_text("email"),
        phone: fields.take_text("phone"),
        association: fields.take_text("association"),
        connection: fields.take_text("connection"),
        date_of_birth: fields.take_text("date_of_birth"),
        location: fields.take_text("location"),
        bio: fields.take_text("bio"),
    }
}

/// A media field sent as text: kept only when it already is a `data:` reference.
fn inline_reference(value: Option<String>) -> Option<String> {
    intake::present(value).filter(|v| v.starts_with("data:"))
}
