mod support;

use axum::http::StatusCode;
use serde_json::Value;
use support::{FakeStylist, MultipartBody, body_json, get, send, test_state, test_state_with, with_stylist};
use weddingbells::{Config, app};

const REGISTRY: &str = "/api/wedding-registry";

fn guest(name: &str, association: &str, connection: &str) -> MultipartBody {
    MultipartBody::new()
        .text("name", name)
        .text("association", association)
        .text("connection", connection)
}

#[tokio::test]
async fn registers_a_guest_without_media() {
    let app = app(test_state().await);

    let response = send(
        &app,
        guest("Asha", "bride", "Kalyani")
            .text("email", "null")
            .text("date_of_birth", "1994-02-11")
            .text("photo", "null")
            .text("voiceNote", "null")
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = body_json(response).await;
    assert_eq!(stored["name"], "Asha");
    assert_eq!(stored["association"], "bride");
    assert_eq!(stored["connection"], "Kalyani");
    assert_eq!(stored["date_of_birth"], "1994-02-11");
    assert_eq!(stored["email"], Value::Null);
    assert_eq!(stored["photo_url"], Value::Null);
    assert_eq!(stored["voice_note_url"], Value::Null);
    assert!(stored["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn rejects_connections_outside_the_association() {
    let app = app(test_state().await);

    let response = send(&app, guest("Raj", "groom", "InvalidPerson").into_request(REGISTRY)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid connection for groom");

    let listed = body_json(send(&app, get(REGISTRY)).await).await;
    assert_eq!(listed, Value::Array(vec![]));
}

#[tokio::test]
async fn rejects_missing_names() {
    let app = app(test_state().await);

    let response = send(
        &app,
        MultipartBody::new()
            .text("association", "bride")
            .text("connection", "Harini")
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "name is required");
}

#[tokio::test]
async fn normal_photos_and_voice_notes_are_stored_inline() {
    let stylist = FakeStylist::answering(Ok(b"styled".as_slice()));
    let app = app(with_stylist(test_state().await, stylist.clone()));

    let response = send(
        &app,
        guest("Meera", "groom", "Aditya")
            .text("photoStyle", "normal")
            .file("photo", "meera.png", "image/png", b"\x89PNG")
            .file("voiceNote", "hello.webm", "audio/webm", b"hi")
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = body_json(response).await;
    assert_eq!(stored["photo_url"], "data:image/png;base64,iVBORw==");
    assert_eq!(stored["voice_note_url"], "data:audio/webm;base64,aGk=");
    assert_eq!(*stylist.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn ghibli_photos_are_restyled() {
    let stylist = FakeStylist::answering(Ok(b"styled".as_slice()));
    let app = app(with_stylist(test_state().await, stylist.clone()));

    let response = send(
        &app,
        guest("Meera", "groom", "Brij Mohan")
            .text("photoStyle", "ghibli")
            .file("photo", "meera.png", "image/png", b"\x89PNG")
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["photo_url"], "data:image/jpeg;base64,c3R5bGVk");
    assert_eq!(*stylist.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn failed_restyle_still_registers_the_guest() {
    let stylist = FakeStylist::answering(Err("upstream down"));
    let app = app(with_stylist(test_state().await, stylist));

    let response = send(
        &app,
        guest("Meera", "groom", "Sushma")
            .text("photoStyle", "ghibli")
            .file("photo", "meera.png", "image/png", b"\x89PNG")
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = body_json(response).await;
    assert_eq!(stored["name"], "Meera");
    assert_eq!(stored["photo_url"], Value::Null);
}

#[tokio::test]
async fn guests_are_listed_newest_first() {
    let app = app(test_state().await);

    for (name, connection) in [("Asha", "Kalyani"), ("Divya", "Harini"), ("Nila", "Kalyan")] {
        let response = send(&app, guest(name, "bride", connection).into_request(REGISTRY)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let listed = body_json(send(&app, get(REGISTRY)).await).await;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Nila", "Divya", "Asha"]);
}

#[tokio::test]
async fn storage_failures_hide_the_cause() {
    let state = test_state().await;
    let app = app(state.clone());
    state.registry.close().await;

    let response = send(&app, get(REGISTRY)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, serde_json::json!({ "message": "Failed to fetch guest list" }));
}

#[tokio::test]
async fn oversized_uploads_are_rejected_as_too_large() {
    let config = Config {
        max_upload_bytes: 1024,
        ..Config::default()
    };
    let app = app(test_state_with(config).await);

    let photo = vec![0xAB; 8 * 1024];
    let response = send(
        &app,
        guest("Asha", "bride", "Kalyani")
            .file("photo", "asha.jpg", "image/jpeg", &photo)
            .into_request(REGISTRY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_json(response).await["message"].is_string());

    let listed = body_json(send(&app, get(REGISTRY)).await).await;
    assert_eq!(listed, Value::Array(vec![]));
}
