use futures_util::{TryStreamExt, future};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{config::ServiceConfig, sse};

use super::{RemoteServiceError, TextStream, checked};

const SERVICE: &str = "Gemini";
const VISION_MODEL: &str = "gemini-1.5-flash-latest";

#[derive(Clone)]
pub struct Gemini {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Client-supplied sampling knobs, forwarded as Gemini's `generationConfig`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(
        rename(serialize = "maxOutputTokens", deserialize = "maxTokens"),
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    text: Option<String>,
}

impl Gemini {
    pub fn new(http_client: reqwest::Client, config: &ServiceConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    /// Streams the model's description of a JPEG, one text fragment per upstream chunk.
    pub async fn stream_image_analysis(
        &self,
        prompt: &str,
        jpeg_base64: String,
        options: GenerationOptions,
    ) -> Result<TextStream, RemoteServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RemoteServiceError::NotConfigured("GOOGLE_API_KEY"))?;

        let response = self
            .http_client
            .post(format!(
                "{}/models/{VISION_MODEL}:streamGenerateContent",
                self.base_url
            ))
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", api_key)
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": prompt },
                        { "inline_data": { "mime_type": "image/jpeg", "data": jpeg_base64 } },
                    ],
                }],
                "generationConfig": options,
            }))
            .send()
            .await;
        let response = checked(SERVICE, response).await?;

        Ok(Box::pin(sse::data_lines(SERVICE, response.bytes_stream())
            .try_filter_map(|data| future::ready(chunk_text(&data)))))
    }
}

fn chunk_text(data: &str) -> Result<Option<String>, RemoteServiceError> {
    let chunk: GenerateChunk = serde_json::from_str(data)
        .map_err(|e| RemoteServiceError::Malformed(format!("unreadable analysis chunk: {e}")))?;

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    Ok(Some(text).filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_joins_parts() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Crisp dosa, "},{"text":"golden edges."}],"role":"model"}}]}"#;
        assert_eq!(
            chunk_text(data).unwrap().as_deref(),
            Some("Crisp dosa, golden edges.")
        );
    }

    #[test]
    fn chunks_without_text_are_skipped() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#;
        assert_eq!(chunk_text(data).unwrap(), None);
    }

    #[test]
    fn generation_options_rename_for_gemini() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"maxTokens":256,"temperature":0.4}"#).unwrap();
        assert_eq!(options.max_tokens, Some(256));

        let sent = serde_json::to_value(options).unwrap();
        assert_eq!(sent["maxOutputTokens"], 256);
        assert!(sent.get("maxTokens").is_none());

        let empty = serde_json::to_value(GenerationOptions::default()).unwrap();
        assert_eq!(empty, json!({}));
    }
}
