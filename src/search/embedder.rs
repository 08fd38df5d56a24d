// src/search/embedder.rs — OpenAI-compatible /embeddings adapter

use async_trait::async_trait;

use super::Embedder;
use crate::infra::errors::DossierError;

pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DossierError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DossierError::Embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DossierError::Embedding(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let resp: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DossierError::Embedding(format!("invalid response: {e}")))?;

        let data = resp["data"]
            .as_array()
            .ok_or_else(|| DossierError::Embedding("response has no data array".into()))?;

        let vectors: Vec<Vec<f32>> = data
            .iter()
            .map(|d| {
                d["embedding"]
                    .as_array()
                    .map(|arr| {
                        arr.iter()
                            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                            .collect()
                    })
                    .ok_or_else(|| DossierError::Embedding("entry has no embedding".into()))
            })
            .collect::<Result<_, _>>()?;

        if vectors.len() != texts.len() {
            return Err(DossierError::Embedding(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }
}
