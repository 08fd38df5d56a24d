// src/search/weaviate.rs — Weaviate hybrid-search adapter (GraphQL over HTTP)

use async_trait::async_trait;

use super::{Passage, SearchIndex};
use crate::infra::errors::DossierError;

pub struct WeaviateIndex {
    base_url: String,
    collection: String,
    client: reqwest::Client,
}

impl WeaviateIndex {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection: collection.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Relative-score fusion over the `text` and `title` properties,
    /// with `autocut` bounding the auto-expanded result groups.
    fn build_query(
        &self,
        query: &str,
        vector: &[f32],
        limit: usize,
        auto_limit: usize,
    ) -> Result<String, DossierError> {
        let query_json = serde_json::to_string(query)
            .map_err(|e| DossierError::Search(format!("failed to encode query: {e}")))?;
        let vector_json = serde_json::to_string(vector)
            .map_err(|e| DossierError::Search(format!("failed to encode vector: {e}")))?;

        Ok(format!(
            "{{ Get {{ {collection}(limit: {limit}, autocut: {auto_limit}, \
             hybrid: {{ query: {query_json}, vector: {vector_json}, \
             fusionType: relativeScore, properties: [\"text\", \"title\"] }}) \
             {{ document_id text _additional {{ id }} }} }} }}",
            collection = self.collection,
        ))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<Vec<Passage>, DossierError> {
        if let Some(errors) = body["errors"].as_array() {
            if !errors.is_empty() {
                return Err(DossierError::Search(format!(
                    "graphql errors: {}",
                    serde_json::to_string(errors).unwrap_or_default()
                )));
            }
        }

        let hits = body["data"]["Get"][self.collection.as_str()]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(hits
            .iter()
            .filter_map(|hit| {
                Some(Passage {
                    document_id: hit["document_id"].as_str()?.to_string(),
                    text: hit["text"].as_str().unwrap_or("").to_string(),
                    passage_id: hit["_additional"]["id"].as_str()?.to_string(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SearchIndex for WeaviateIndex {
    async fn hybrid_search(
        &self,
        query: &str,
        vector: &[f32],
        limit: usize,
        auto_limit: usize,
    ) -> Result<Vec<Passage>, DossierError> {
        let gql = self.build_query(query, vector, limit, auto_limit)?;
        let response = self
            .client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&serde_json::json!({ "query": gql }))
            .send()
            .await
            .map_err(|e| DossierError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DossierError::Search(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DossierError::Search(format!("invalid response: {e}")))?;

        self.parse_response(&body)
    }

    async fn ready(&self) -> Result<(), DossierError> {
        let response = self
            .client
            .get(format!("{}/v1/.well-known/ready", self.base_url))
            .send()
            .await
            .map_err(|e| DossierError::Search(format!("index unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(DossierError::Search(format!(
                "index not ready: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
