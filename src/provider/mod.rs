// src/provider/mod.rs — LLM provider layer

pub mod budget;
pub mod openrouter;
pub mod retry;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::infra::errors::DossierError;

/// One chunk of a streamed completion. Usage arrives on the final chunk
/// when the provider reports it.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub delta: String,
    pub usage: Option<TokenUsage>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DossierError>> + Send>>;

/// A free-text completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A completion constrained to a JSON schema. The provider returns raw JSON
/// text; schema conformance is not guaranteed, callers re-validate.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Core trait all model providers implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, DossierError>;

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<Completion, DossierError>;

    /// Streamed completion with reasoning enabled. Consumers pull chunks
    /// until end-of-stream or error.
    async fn complete_streamed(
        &self,
        request: CompletionRequest,
    ) -> Result<ChunkStream, DossierError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
