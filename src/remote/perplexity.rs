use futures_util::{TryStreamExt, future};
use serde::Deserialize;
use serde_json::json;

use crate::{config::ServiceConfig, sse};

use super::{ChatMessage, RemoteServiceError, TextStream, checked};

const SERVICE: &str = "Perplexity";
const CHAT_MODEL: &str = "sonar";

#[derive(Clone)]
pub struct Perplexity {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

impl Perplexity {
    pub fn new(http_client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    /// Starts a streamed completion and yields the text fragments as they arrive.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<TextStream, RemoteServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RemoteServiceError::NotConfigured("PERPLEXITY_API_KEY"))?;

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&json!({
                "model": CHAT_MODEL,
                "messages": messages,
                "stream": true,
            }))
            .send()
            .await;
        let response = checked(SERVICE, response).await?;

        Ok(Box::pin(sse::data_lines(SERVICE, response.bytes_stream())
            .try_take_while(|data| future::ready(Ok(data.as_str() != sse::DONE)))
            .try_filter_map(|data| future::ready(chunk_content(&data)))))
    }
}

fn chunk_content(data: &str) -> Result<Option<String>, RemoteServiceError> {
    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| RemoteServiceError::Malformed(format!("unreadable chat chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
