// src/research/reflect.rs — Reflection Gate stage

use super::parse::{parse_structured, TriBool};
use super::prompts;
use super::StageCall;
use crate::infra::errors::DossierError;
use crate::provider::{StructuredRequest, TokenUsage};

/// The model's judgement on whether the evidence gathered so far suffices.
#[derive(Debug, Clone)]
pub struct Reflection {
    pub finished: TriBool,
    pub text: Option<String>,
}

/// One structured call over the question and every analysis produced so far
/// (not only this iteration's).
///
/// An unparsable response or missing verdict comes back as Unknown —
/// reflection ambiguity must never end a run early. A provider error after
/// retries is a run-level failure.
pub async fn assess_progress(
    call: &StageCall<'_>,
    question: &str,
    analyses: &[String],
) -> Result<(Reflection, TokenUsage), DossierError> {
    let prompt = prompts::reflection_prompt(question, &analyses.join("\n\n"));

    let completion = call
        .llm
        .complete_structured(StructuredRequest {
            model: call.model.to_string(),
            prompt,
            system: None,
            temperature: call.temperature,
            max_tokens: call.max_tokens,
            schema: prompts::reflection_schema(),
        })
        .await?;

    let reflection = match parse_structured(&completion.text).into_value() {
        Some(value) => Reflection {
            finished: TriBool::from_json(value.get("finished")),
            text: value["reflection"].as_str().map(str::to_string),
        },
        None => Reflection {
            finished: TriBool::Unknown,
            text: None,
        },
    };

    Ok((reflection, completion.usage))
}
