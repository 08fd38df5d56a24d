// src/research/queries.rs — Query Generator stage

use super::parse::parse_structured;
use super::prompts;
use super::StageCall;
use crate::infra::errors::DossierError;
use crate::provider::{StructuredRequest, TokenUsage};

/// History fed back into later iterations. Duplicate suppression is a
/// prompt-level hint only; nothing here filters what the model returns.
pub struct QueryHistory<'a> {
    pub previous_queries: &'a [String],
    pub considerations: &'a [String],
}

/// Generate up to `max_queries` new search queries for the question.
///
/// Zero queries is a valid outcome, not an error; an unparsable response
/// degrades to zero queries the same way.
pub async fn generate_queries(
    call: &StageCall<'_>,
    question: &str,
    max_queries: usize,
    history: QueryHistory<'_>,
    first_iteration: bool,
) -> Result<(Vec<String>, TokenUsage), DossierError> {
    let system = prompts::query_generation_system(
        max_queries,
        history.previous_queries,
        history.considerations,
        first_iteration,
    );

    let completion = call
        .llm
        .complete_structured(StructuredRequest {
            model: call.model.to_string(),
            prompt: question.to_string(),
            system: Some(system),
            temperature: call.temperature,
            max_tokens: call.max_tokens,
            schema: prompts::queries_schema(),
        })
        .await?;

    let queries = match parse_structured(&completion.text).into_value() {
        Some(value) => value["queries"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|q| q.as_str())
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .take(max_queries)
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    };

    Ok((queries, completion.usage))
}
