//! Food-photo analysis: a guest sends a picture of a dish and gets a short,
//! streamed, flattering description back.

use axum::{
    Json, Router, debug_handler,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::error;

use crate::{
    AppState, Remotes,
    remote::{ChatMessage, GenerationOptions, RemoteServiceError},
    res::FOOD_ANALYSIS_PROMPT,
    sse,
};

/// Preflight `OPTIONS` requests are answered by the CORS layer in [`crate::app`].
pub fn router() -> Router<AppState> {
    Router::new().route("/api/calculator", post(analyze_food))
}

#[derive(Debug, Deserialize)]
struct AnalysisBody {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    body: Option<GenerationOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnalysisContent {
    AnalysisRequest { image: String },
}

#[derive(Debug, Error)]
pub enum FoodError {
    #[error("Invalid request format")]
    InvalidFormat(String),

    #[error("Invalid JSON in message content")]
    InvalidContent,

    #[error("No image data provided")]
    MissingImage,

    #[error("Image data is not valid base64")]
    InvalidImage,

    #[error(transparent)]
    Remote(#[from] RemoteServiceError),
}

impl IntoResponse for FoodError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            FoodError::InvalidFormat(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": self.to_string(), "details": details }),
            ),
            FoodError::InvalidContent | FoodError::MissingImage | FoodError::InvalidImage => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": self.to_string() }),
            ),
            FoodError::Remote(err) => {
                error!("food analysis failed: {err}");
                let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": err.to_string(), "timestamp": timestamp }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn analyze_food(
    State(remotes): State<Remotes>,
    body: Bytes,
) -> Result<Response, FoodError> {
    let (image, options) = parse_request(&body)?;
    let jpeg = STANDARD.encode(decode_image(&image)?);

    let fragments = remotes
        .gemini
        .stream_image_analysis(FOOD_ANALYSIS_PROMPT, jpeg, options)
        .await?;
    Ok(sse::relay(fragments, Some("analysis")).into_response())
}

/// The image travels as a JSON document inside the last chat message.
fn parse_request(body: &[u8]) -> Result<(String, GenerationOptions), FoodError> {
    let AnalysisBody { messages, body: options } =
        serde_json::from_slice(body).map_err(|e| FoodError::InvalidFormat(e.to_string()))?;
    let last = messages
        .last()
        .ok_or_else(|| FoodError::InvalidFormat("messages must not be empty".to_owned()))?;

    let content: serde_json::Value =
        serde_json::from_str(&last.content).map_err(|_| FoodError::InvalidContent)?;
    let AnalysisContent::AnalysisRequest { image } =
        serde_json::from_value(content).map_err(|e| FoodError::InvalidFormat(e.to_string()))?;

    if image.trim().is_empty() {
        return Err(FoodError::MissingImage);
    }
    Ok((image, options.unwrap_or_default()))
}

/// Accepts bare base64 or a `data:image/<kind>;base64,` URL.
fn decode_image(image: &str) -> Result<Vec<u8>, FoodError> {
    let encoded = image
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .filter(|(kind, _)| !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .map_or(image, |(_, data)| data);

    STANDARD.decode(encoded.trim()).map_err(|_| FoodError::InvalidImage)
}
