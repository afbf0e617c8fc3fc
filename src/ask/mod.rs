pub mod knowledge;

use axum::{
    Json, Router, debug_handler,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    AppError, AppResult, AppState, Registry, Remotes,
    db::KnowledgeDocument,
    error::{JsonBody, StorageContext},
    registry::intake::present,
    remote::ChatMessage,
    res, sse,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ask-me-anything", post(ask))
        .route("/api/ask-me-anything/documents", post(add_document))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewDocument {
    contents: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn ask(
    State(registry): State<Registry>,
    State(remotes): State<Remotes>,
    JsonBody(ChatRequest { messages }): JsonBody<ChatRequest>,
) -> AppResult<Response> {
    let Some(question) = messages.last() else {
        return Err(AppError::BadRequest("messages must not be empty".to_owned()));
    };

    let context = knowledge::relevant_context(&registry, remotes.embedder.as_ref(), &question.content).await;
    let conversation = with_system_prompt(&context, messages);

    let fragments = remotes.perplexity.stream_chat(&conversation).await?;
    Ok(sse::relay(fragments, None).into_response())
}

/// Prepends the assistant instructions, carrying the retrieved context, to the client's messages.
fn with_system_prompt(context: &str, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(ChatMessage::system(res::assistant_prompt(context)));
    conversation.extend(messages);
    conversation
}

#[debug_handler(state = AppState)]
pub(crate) async fn add_document(
    State(registry): State<Registry>,
    State(remotes): State<Remotes>,
    JsonBody(NewDocument { contents }): JsonBody<NewDocument>,
) -> AppResult<Json<KnowledgeDocument>> {
    let Some(contents) = present(contents) else {
        return Err(AppError::BadRequest("contents is required".to_owned()));
    };

    let embedding = remotes.embedder.embed(&contents).await?;
    let document = registry
        .insert_document(&contents, &embedding)
        .await
        .storage_failure("Failed to store document")?;

    info!(id = document.id, "knowledge document added");
    Ok(Json(document))
}
