// src/provider/budget.rs — Model selection under a prompt-token ceiling
//
// Models outside the large-context allowlist fall back to a cheaper model
// when the rendered prompt exceeds the configured token ceiling.

/// Allowlist and ceiling governing the fallback decision.
#[derive(Debug, Clone)]
pub struct BudgetPolicy {
    /// Model-id prefixes that handle arbitrarily large prompts.
    pub large_context_models: Vec<String>,
    pub token_ceiling: u32,
    pub fallback_model: String,
}

impl BudgetPolicy {
    pub fn from_config(
        models: &crate::infra::config::ModelsConfig,
        llm: &crate::infra::config::LlmConfig,
    ) -> Self {
        Self {
            large_context_models: models.large_context.clone(),
            token_ceiling: llm.fallback_token_limit,
            fallback_model: models.fallback.clone(),
        }
    }
}

/// Pick the model that will actually serve `prompt`.
///
/// Pure function: allowlisted models pass through unconditionally; anything
/// else is swapped for the fallback once the prompt estimate crosses the
/// ceiling.
pub fn effective_model(requested: &str, prompt: &str, policy: &BudgetPolicy) -> String {
    if policy
        .large_context_models
        .iter()
        .any(|prefix| requested.starts_with(prefix.as_str()))
    {
        return requested.to_string();
    }

    let tokens = estimate_tokens(prompt);
    if tokens > policy.token_ceiling {
        tracing::info!(
            requested,
            tokens,
            ceiling = policy.token_ceiling,
            "prompt over token ceiling, using fallback model {}",
            policy.fallback_model
        );
        return policy.fallback_model.clone();
    }

    requested.to_string()
}

/// Rough token estimate: ~4 characters per token.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as f32 / 4.0).ceil() as u32
}
