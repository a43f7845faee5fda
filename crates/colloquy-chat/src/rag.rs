use std::sync::Arc;

use colloquy_llm::{EmbeddingClient, EmbeddingRequest};
use colloquy_persist::{Document, DocumentChunk, PersistenceClient};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Retrieved chunk handed to the model, cited back by `id` and `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Chunk length in characters
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2300,
            chunk_overlap: 200,
        }
    }
}

/// Split text into overlapping windows of `chunk_size` characters
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || config.chunk_size == 0 {
        return Vec::new();
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Cosine similarity; 0.0 for mismatched or zero vectors
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

/// Highest scoring chunks first, at most `top_k`
pub fn rank_chunks(query: &[f32], chunks: Vec<DocumentChunk>, top_k: usize) -> Vec<DocumentChunk> {
    let mut scored: Vec<(f32, DocumentChunk)> = chunks
        .into_iter()
        .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(top_k).map(|(_, chunk)| chunk).collect()
}

/// Document indexing and similarity search over a thread's chunks
pub struct Retriever {
    embeddings: Arc<dyn EmbeddingClient>,
    deployment: String,
    persistence: Arc<dyn PersistenceClient>,
    chunking: ChunkingConfig,
}

impl Retriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        deployment: impl Into<String>,
        persistence: Arc<dyn PersistenceClient>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embeddings,
            deployment: deployment.into(),
            persistence,
            chunking,
        }
    }

    /// Store a document and its embedded chunks
    pub async fn upload(
        &self,
        user_id: &str,
        thread_id: &str,
        name: &str,
        content: &str,
    ) -> Result<Document> {
        let pieces = chunk_text(content, self.chunking);
        if pieces.is_empty() {
            return Err(ChatError::Validation("Document has no content".to_string()));
        }

        let vectors = self
            .embeddings
            .embed(EmbeddingRequest::new(&self.deployment, pieces.clone()))
            .await?;
        if vectors.len() != pieces.len() {
            return Err(ChatError::Upstream(anyhow::anyhow!(
                "Expected {} embeddings, got {}",
                pieces.len(),
                vectors.len()
            )));
        }

        let document = Document::new(thread_id, user_id, name);
        self.persistence.save_document(document.clone()).await?;

        let chunks = pieces
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (content, embedding))| DocumentChunk {
                id: uuid::Uuid::new_v4().to_string(),
                document_id: document.id.clone(),
                thread_id: thread_id.to_string(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                chunk_index: index as u32,
                content,
                embedding,
                is_deleted: false,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            thread_id = %thread_id,
            document_id = %document.id,
            chunks = chunks.len(),
            "Indexed document"
        );
        self.persistence.save_document_chunks(chunks).await?;

        Ok(document)
    }

    /// Top `top_k` chunks of the thread for `query`, as citations
    pub async fn search(
        &self,
        user_id: &str,
        thread_id: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Citation>> {
        let mut vectors = self
            .embeddings
            .embed(EmbeddingRequest::new(&self.deployment, vec![query.to_string()]))
            .await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| ChatError::Upstream(anyhow::anyhow!("Embedding service returned no vector")))?;

        let chunks = self.persistence.get_document_chunks(user_id, thread_id).await?;
        let ranked = rank_chunks(&query_vector, chunks, top_k);

        tracing::debug!(thread_id = %thread_id, hits = ranked.len(), "Similarity search");

        Ok(ranked
            .into_iter()
            .map(|chunk| Citation {
                id: chunk.id,
                name: chunk.name,
                content: chunk.content,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            id: id.to_string(),
            document_id: "d1".to_string(),
            thread_id: "t1".to_string(),
            user_id: "u1".to_string(),
            name: "notes.txt".to_string(),
            chunk_index: 0,
            content: id.to_string(),
            embedding,
            is_deleted: false,
        }
    }

    #[test]
    fn test_chunk_text_overlaps() {
        let config = ChunkingConfig {
            chunk_size: 4,
            chunk_overlap: 1,
        };
        assert_eq!(chunk_text("abcdefghij", config), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_chunk_text_multibyte() {
        let config = ChunkingConfig {
            chunk_size: 2,
            chunk_overlap: 0,
        };
        assert_eq!(chunk_text("ééé", config), vec!["éé", "é"]);
        assert!(chunk_text("", config).is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_chunks_orders_by_score() {
        let chunks = vec![
            chunk("far", vec![0.0, 1.0]),
            chunk("near", vec![1.0, 0.1]),
            chunk("mid", vec![1.0, 1.0]),
        ];
        let ranked = rank_chunks(&[1.0, 0.0], chunks, 2);
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }
}
