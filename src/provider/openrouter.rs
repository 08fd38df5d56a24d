// src/provider/openrouter.rs — OpenRouter chat-completions adapter
//
// One HTTP surface serves all three call shapes: plain completion,
// JSON-schema-constrained completion, and the SSE-streamed report call
// with reasoning enabled.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};

use super::{
    ChunkStream, Completion, CompletionRequest, LlmProvider, StreamChunk, StructuredRequest,
    TokenUsage,
};
use crate::infra::errors::DossierError;
use crate::util::truncate_str;

const PROVIDER_ID: &str = "openrouter";

pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    /// Forwarded as `reasoning.effort` on streamed calls when set.
    reasoning_effort: Option<String>,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            reasoning_effort: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(request: &CompletionRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt,
        }));

        serde_json::json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    async fn post_chat(&self, body: &serde_json::Value) -> Result<serde_json::Value, DossierError> {
        let response = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| DossierError::Provider {
                provider: PROVIDER_ID.into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1_000)
                .unwrap_or(5_000);
            return Err(DossierError::RateLimited {
                provider: PROVIDER_ID.into(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DossierError::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        response.json().await.map_err(|e| DossierError::Provider {
            provider: PROVIDER_ID.into(),
            message: format!("failed to parse response: {e}"),
            retriable: false,
        })
    }

    fn extract_completion(resp: &serde_json::Value) -> Completion {
        let text = resp["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        Completion {
            text,
            usage: parse_usage(&resp["usage"]).unwrap_or_default(),
        }
    }
}

fn parse_usage(value: &serde_json::Value) -> Option<TokenUsage> {
    if !value.is_object() {
        return None;
    }
    Some(TokenUsage {
        input_tokens: value["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: value["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, DossierError> {
        tracing::debug!(
            model = %request.model,
            prompt_preview = truncate_str(&request.prompt, 200),
            "completion call"
        );
        let body = Self::build_body(&request);
        let resp = self.post_chat(&body).await?;
        Ok(Self::extract_completion(&resp))
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<Completion, DossierError> {
        tracing::debug!(
            model = %request.model,
            prompt_preview = truncate_str(&request.prompt, 200),
            "structured call"
        );
        let mut body = Self::build_body(&CompletionRequest {
            model: request.model,
            prompt: request.prompt,
            system: request.system,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });
        body["response_format"] = serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": "output",
                "strict": true,
                "schema": request.schema,
            },
        });
        let resp = self.post_chat(&body).await?;
        Ok(Self::extract_completion(&resp))
    }

    async fn complete_streamed(
        &self,
        request: CompletionRequest,
    ) -> Result<ChunkStream, DossierError> {
        tracing::debug!(
            model = %request.model,
            prompt_preview = truncate_str(&request.prompt, 200),
            "streamed call"
        );
        let mut body = Self::build_body(&request);
        body["stream"] = serde_json::json!(true);
        body["stream_options"] = serde_json::json!({ "include_usage": true });
        if let Some(effort) = &self.reasoning_effort {
            body["reasoning"] = serde_json::json!({ "effort": effort });
        }

        let builder = self
            .client
            .post(self.chat_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);

        let mut es = builder.eventsource().map_err(|e| DossierError::Provider {
            provider: PROVIDER_ID.into(),
            message: format!("failed to open stream: {e}"),
            retriable: false,
        })?;

        let stream = async_stream::stream! {
            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => {
                        if msg.data == "[DONE]" {
                            break;
                        }
                        let parsed: serde_json::Value = match serde_json::from_str(&msg.data) {
                            Ok(v) => v,
                            Err(e) => {
                                yield Err(DossierError::Provider {
                                    provider: PROVIDER_ID.into(),
                                    message: format!("failed to parse SSE data: {e}"),
                                    retriable: false,
                                });
                                break;
                            }
                        };

                        let delta = parsed["choices"][0]["delta"]["content"]
                            .as_str()
                            .unwrap_or("")
                            .to_string();
                        let usage = parse_usage(&parsed["usage"]);
                        if !delta.is_empty() || usage.is_some() {
                            yield Ok(StreamChunk { delta, usage });
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(DossierError::Provider {
                            provider: PROVIDER_ID.into(),
                            message: format!("stream error: {e}"),
                            retriable: false,
                        });
                        break;
                    }
                }
            }
            es.close();
        };

        Ok(Box::pin(stream))
    }
}
