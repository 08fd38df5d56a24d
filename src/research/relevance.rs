// src/research/relevance.rs — Relevance Filter stage

use super::parallel::map_bounded;
use super::parse::{parse_structured, TriBool};
use super::prompts;
use super::StageCall;
use crate::provider::{StructuredRequest, TokenUsage};
use crate::search::Passage;

/// Judge every passage against the question and keep only the ones with a
/// `true` verdict. Unknown verdicts, unparsable responses, and item-local
/// call failures all discard the passage — none of them aborts the batch.
pub async fn filter_relevant(
    call: &StageCall<'_>,
    question: &str,
    passages: Vec<Passage>,
    width: usize,
    notify: impl Fn(usize, usize),
) -> (Vec<Passage>, TokenUsage) {
    let requests: Vec<StructuredRequest> = passages
        .iter()
        .map(|p| StructuredRequest {
            model: call.model.to_string(),
            prompt: prompts::relevance_prompt(question, &p.text),
            system: Some(prompts::RELEVANCE_SYSTEM.to_string()),
            temperature: call.temperature,
            max_tokens: call.max_tokens,
            schema: prompts::relevance_schema(),
        })
        .collect();

    let results = map_bounded(
        requests,
        width,
        |request| call.llm.complete_structured(request),
        notify,
    )
    .await;

    let mut usage = TokenUsage::default();
    let mut kept = Vec::new();

    for (passage, result) in passages.into_iter().zip(results) {
        match result {
            Ok(completion) => {
                usage.add(&completion.usage);
                let verdict = parse_structured(&completion.text)
                    .into_value()
                    .map(|v| TriBool::from_json(v.get("relevance")))
                    .unwrap_or(TriBool::Unknown);
                if verdict.is_true() {
                    kept.push(passage);
                }
            }
            Err(e) => {
                tracing::warn!(
                    passage_id = %passage.passage_id,
                    "relevance check failed, passage discarded: {e}"
                );
            }
        }
    }

    (kept, usage)
}
