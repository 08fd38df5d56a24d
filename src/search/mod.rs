// src/search/mod.rs — Hybrid search collaborators and per-iteration dispatch

pub mod embedder;
pub mod weaviate;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::DossierError;

/// A retrievable text unit produced by offline document ingestion.
/// Ephemeral: discarded after relevance filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub document_id: String,
    pub text: String,
    pub passage_id: String,
}

/// Hybrid (lexical + vector) search over the ingested passage collection.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn hybrid_search(
        &self,
        query: &str,
        vector: &[f32],
        limit: usize,
        auto_limit: usize,
    ) -> Result<Vec<Passage>, DossierError>;

    /// Reachability probe; an unreachable index is fatal before any iteration.
    async fn ready(&self) -> Result<(), DossierError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DossierError>;
}

/// Run every query against the index and keep only passages not seen in any
/// earlier iteration.
///
/// Queries are embedded in one batch, searched sequentially, and the
/// aggregate is deduplicated by passage id within the batch before the
/// cross-iteration `seen` filter applies. The caller merges surviving ids
/// into its bookkeeping.
pub async fn dispatch_searches(
    index: &dyn SearchIndex,
    embedder: &dyn Embedder,
    queries: &[String],
    limit: usize,
    auto_limit: usize,
    seen_passage_ids: &HashSet<String>,
) -> Result<Vec<Passage>, DossierError> {
    if queries.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = embedder.embed(queries).await?;
    if vectors.len() != queries.len() {
        return Err(DossierError::Embedding(format!(
            "expected {} vectors, got {}",
            queries.len(),
            vectors.len()
        )));
    }

    let mut batch = Vec::new();
    for (query, vector) in queries.iter().zip(vectors.iter()) {
        let passages = index
            .hybrid_search(query, vector, limit, auto_limit)
            .await?;
        tracing::debug!(query = %query, hits = passages.len(), "hybrid search");
        batch.extend(passages);
    }

    let mut in_batch = HashSet::new();
    Ok(batch
        .into_iter()
        .filter(|p| in_batch.insert(p.passage_id.clone()))
        .filter(|p| !seen_passage_ids.contains(&p.passage_id))
        .collect())
}
