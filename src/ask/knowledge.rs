use tracing::{debug, warn};

use crate::{Registry, db::KnowledgeDocument, remote::Embedder};

pub const SIMILARITY_THRESHOLD: f32 = 0.7;
pub const CONTEXT_LIMIT: usize = 3;

/// Zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Contents of the documents closest to `query`, best first.
pub fn rank<'a>(query: &[f32], documents: &'a [KnowledgeDocument]) -> Vec<&'a str> {
    let mut scored: Vec<(f32, &str)> = documents
        .iter()
        .map(|doc| (cosine_similarity(query, &doc.embedding.0), doc.contents.as_str()))
        .filter(|(similarity, _)| *similarity > SIMILARITY_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(CONTEXT_LIMIT).map(|(_, contents)| contents).collect()
}

/// Context for the assistant prompt. Lookup failures leave the assistant without context.
pub async fn relevant_context(registry: &Registry, embedder: &dyn Embedder, query: &str) -> String {
    let query = match embedder.embed(query).await {
        Ok(embedding) => embedding,
        Err(e) => {
            warn!("Error embedding question: {e}");
            return String::new();
        }
    };

    let documents = match registry.list_documents().await {
        Ok(documents) => documents,
        Err(e) => {
            warn!("Error fetching context: {e}");
            return String::new();
        }
    };

    let context = rank(&query, &documents);
    debug!("{} of {} documents matched", context.len(), documents.len());
    context.join("\n\n")
}
