//! Third-party AI services, reached over one shared `reqwest::Client`.

mod gemini;
mod openai;
mod perplexity;

use std::{pin::Pin, sync::Arc};

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::Stream;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{Config, registry::media::Upload};

pub use gemini::{Gemini, GenerationOptions};
pub use openai::OpenAi;
pub use perplexity::Perplexity;

/// Text fragments of a streamed model answer.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, RemoteServiceError>> + Send>>;

#[derive(Debug, Error)]
pub enum RemoteServiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} answered {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{0}")]
    Malformed(String),
}

/// Restyles a photo according to an instruction prompt.
#[async_trait]
pub trait ImageStylist: Send + Sync {
    async fn stylize(&self, image: &Upload, prompt: &str) -> Result<Bytes, RemoteServiceError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RemoteServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: String) -> Self {
        Self {
            role: Role::System,
            content,
            id: None,
        }
    }
}

#[derive(Clone)]
pub struct Remotes {
    pub stylist: Arc<dyn ImageStylist>,
    pub embedder: Arc<dyn Embedder>,
    pub perplexity: Perplexity,
    pub gemini: Gemini,
}

impl Remotes {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let openai = Arc::new(OpenAi::new(http_client.clone(), &config.openai));

        Ok(Self {
            stylist: openai.clone(),
            embedder: openai,
            perplexity: Perplexity::new(http_client.clone(), &config.perplexity),
            gemini: Gemini::new(http_client, &config.gemini),
        })
    }
}

/// Maps transport errors and non-2xx answers to [`RemoteServiceError`].
pub(crate) async fn checked(
    service: &'static str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<reqwest::Response, RemoteServiceError> {
    let response = response.map_err(|source| RemoteServiceError::Http { service, source })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteServiceError::Status {
        service,
        status,
        body,
    })
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> Result<&str, RemoteServiceError>;
    fn get_obj_field(&self, field: &str) -> Result<&Value, RemoteServiceError>;
}

impl GetField for Value {
    fn get_str_field(&self, field: &str) -> Result<&str, RemoteServiceError> {
        self.get_obj_field(field)?
            .as_str()
            .ok_or_else(|| RemoteServiceError::Malformed(format!("expected {field} to be string")))
    }

    fn get_obj_field(&self, field: &str) -> Result<&Value, RemoteServiceError> {
        self.get(field)
            .ok_or_else(|| RemoteServiceError::Malformed(format!("expected {field} in response")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn get_field_reports_what_is_missing() {
        let body = json!({ "data": [{ "b64_json": "aGk=" }], "created": 1 });

        let first = body.get_obj_field("data").unwrap().get(0).unwrap();
        assert_eq!(first.get_str_field("b64_json").unwrap(), "aGk=");

        let err = body.get_str_field("created").unwrap_err();
        assert_eq!(err.to_string(), "expected created to be string");
        let err = body.get_obj_field("usage").unwrap_err();
        assert_eq!(err.to_string(), "expected usage in response");
    }

    #[test]
    fn chat_messages_drop_client_ids_upstream() {
        let message: ChatMessage =
            serde_json::from_value(json!({ "role": "user", "content": "hi", "id": "m1" })).unwrap();
        assert_eq!(message.id.as_deref(), Some("m1"));

        let sent = serde_json::to_value(&message).unwrap();
        assert_eq!(sent, json!({ "role": "user", "content": "hi" }));
    }
}
