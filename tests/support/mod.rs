#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, Response, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use weddingbells::{
    AppState, Config,
    registry::media::Upload,
    remote::{Embedder, ImageStylist, RemoteServiceError},
};

pub const BOUNDARY: &str = "weddingbells-test-boundary";

/// Style-transfer stand-in that answers with fixed bytes or fails.
pub struct FakeStylist {
    answer: Result<&'static [u8], &'static str>,
    pub calls: Mutex<usize>,
}

impl FakeStylist {
    pub fn answering(answer: Result<&'static [u8], &'static str>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl ImageStylist for FakeStylist {
    async fn stylize(&self, _image: &Upload, _prompt: &str) -> Result<Bytes, RemoteServiceError> {
        *self.calls.lock().unwrap() += 1;
        self.answer
            .map(Bytes::from_static)
            .map_err(|e| RemoteServiceError::Malformed(e.to_owned()))
    }
}

/// Embedding stand-in: one fixed vector for every text, or a failure.
pub struct FakeEmbedder {
    answer: Result<Vec<f32>, &'static str>,
}

impl FakeEmbedder {
    pub fn answering(answer: Result<Vec<f32>, &'static str>) -> Arc<Self> {
        Arc::new(Self { answer })
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RemoteServiceError> {
        self.answer
            .clone()
            .map_err(|e| RemoteServiceError::Malformed(e.to_owned()))
    }
}

/// App state over a fresh in-memory database with no API keys configured.
pub async fn test_state() -> AppState {
    test_state_with(Config::default()).await
}

pub async fn test_state_with(config: Config) -> AppState {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    AppState::new(config, db_pool).unwrap()
}

pub fn with_stylist(mut state: AppState, stylist: Arc<FakeStylist>) -> AppState {
    state.remotes.stylist = stylist;
    state
}

pub fn with_embedder(mut state: AppState, embedder: Arc<FakeEmbedder>) -> AppState {
    state.remotes.embedder = embedder;
    state
}

pub fn raw_request(method: &str, uri: &str, content_type: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(method: &str, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            b' ' => "+".to_owned(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, mime: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(self.body))
            .unwrap()
    }
}
