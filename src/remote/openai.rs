use async_trait::async_trait;
use axum::body::Bytes;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{config::ServiceConfig, registry::media::Upload};

use super::{Embedder, GetField, ImageStylist, RemoteServiceError, checked};

const SERVICE: &str = "OpenAI";
const IMAGE_MODEL: &str = "gpt-image-1";
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Clone)]
pub struct OpenAi {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAi {
    pub fn new(http_client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, RemoteServiceError> {
        self.api_key
            .as_deref()
            .ok_or(RemoteServiceError::NotConfigured("OPENAI_API_KEY"))
    }
}

#[async_trait]
impl ImageStylist for OpenAi {
    async fn stylize(&self, image: &Upload, prompt: &str) -> Result<Bytes, RemoteServiceError> {
        let api_key = self.api_key()?;

        let part = Part::bytes(image.bytes.to_vec())
            .file_name(format!("photo.{}", image.extension()))
            .mime_str(&image.mime)
            .map_err(|source| RemoteServiceError::Http { service: SERVICE, source })?;
        let form = Form::new()
            .text("model", IMAGE_MODEL)
            .text("prompt", prompt.to_owned())
            .part("image", part);

        let response = self
            .http_client
            .post(format!("{}/images/edits", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await;
        let body: Value = checked(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|source| RemoteServiceError::Http { service: SERVICE, source })?;

        let encoded = body
            .get_obj_field("data")?
            .get(0)
            .and_then(|first| first.get_str_field("b64_json").ok())
            .ok_or_else(|| {
                RemoteServiceError::Malformed("Failed to generate Ghibli-style image".to_owned())
            })?;

        let decoded = STANDARD.decode(encoded).map_err(|e| {
            RemoteServiceError::Malformed(format!("image edit returned invalid base64: {e}"))
        })?;
        Ok(Bytes::from(decoded))
    }
}

#[async_trait]
impl Embedder for OpenAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RemoteServiceError> {
        let api_key = self.api_key()?;

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({ "model": EMBEDDING_MODEL, "input": text }))
            .send()
            .await;
        let body: EmbeddingResponse = checked(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|source| RemoteServiceError::Http { service: SERVICE, source })?;

        body.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| RemoteServiceError::Malformed("embedding response was empty".to_owned()))
    }
}
