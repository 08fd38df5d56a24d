// src/research/report.rs — Report synthesis from accumulated analyses
//
// One streamed call, never retried: a failed or empty stream becomes an
// explicit failed-report error, not a fabricated partial report.

use std::time::Duration;

use futures::StreamExt;

use super::prompts;
use super::types::{AnalyzedDocument, ReportOutput};
use crate::infra::errors::DossierError;
use crate::provider::budget::{effective_model, BudgetPolicy};
use crate::provider::{CompletionRequest, LlmProvider, TokenUsage};

/// Synthesize the final cited report from every accumulated document, in
/// accumulation order.
///
/// The serving model is chosen from the fully rendered prompt via the
/// budget policy. `on_chunk` sees each delta as it streams in; the stream
/// is bounded by `idle_timeout` between chunks.
#[allow(clippy::too_many_arguments)]
pub async fn synthesize_report(
    llm: &dyn LlmProvider,
    question: &str,
    documents: &[AnalyzedDocument],
    requested_model: &str,
    policy: &BudgetPolicy,
    temperature: f32,
    max_tokens: u32,
    idle_timeout: Duration,
    mut on_chunk: impl FnMut(&str),
) -> Result<ReportOutput, DossierError> {
    let blocks: Vec<String> = documents.iter().map(prompts::document_block).collect();
    let prompt = prompts::report_prompt(question, &blocks.join("\n\n"));
    let model = effective_model(requested_model, &prompt, policy);

    tracing::info!(
        model = %model,
        documents = documents.len(),
        "synthesizing report"
    );

    let mut stream = llm
        .complete_streamed(CompletionRequest {
            model,
            prompt,
            system: None,
            temperature,
            max_tokens,
        })
        .await
        .map_err(|e| DossierError::ReportFailed {
            message: e.to_string(),
            partial_chars: 0,
        })?;

    let mut markdown = String::new();
    let mut usage = TokenUsage::default();

    loop {
        match tokio::time::timeout(idle_timeout, stream.next()).await {
            Err(_) => {
                return Err(DossierError::ReportFailed {
                    message: format!("stream stalled for {}s", idle_timeout.as_secs()),
                    partial_chars: markdown.chars().count(),
                });
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                return Err(DossierError::ReportFailed {
                    message: e.to_string(),
                    partial_chars: markdown.chars().count(),
                });
            }
            Ok(Some(Ok(chunk))) => {
                if let Some(u) = chunk.usage {
                    usage = u;
                }
                if !chunk.delta.is_empty() {
                    on_chunk(&chunk.delta);
                    markdown.push_str(&chunk.delta);
                }
            }
        }
    }

    if markdown.trim().is_empty() {
        return Err(DossierError::ReportFailed {
            message: "stream ended without content".into(),
            partial_chars: 0,
        });
    }

    Ok(ReportOutput { markdown, usage })
}
