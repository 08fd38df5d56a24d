// src/research/analyze.rs — Document Analyzer stage

use super::parallel::map_bounded;
use super::prompts;
use super::StageCall;
use crate::corpus::Document;
use crate::provider::{CompletionRequest, TokenUsage};

/// Analyze each document's full text against the question.
///
/// The output is index-aligned with `documents` — misalignment here would
/// silently attribute an analysis to the wrong document. A failed or empty
/// item yields `None` at its index and degrades only that document.
pub async fn analyze_documents(
    call: &StageCall<'_>,
    question: &str,
    documents: &[Document],
    width: usize,
    notify: impl Fn(usize, usize),
) -> (Vec<Option<String>>, TokenUsage) {
    let requests: Vec<CompletionRequest> = documents
        .iter()
        .map(|doc| CompletionRequest {
            model: call.model.to_string(),
            prompt: prompts::analysis_prompt(question, doc),
            system: None,
            temperature: call.temperature,
            max_tokens: call.max_tokens,
        })
        .collect();

    let results = map_bounded(
        requests,
        width,
        |request| call.llm.complete(request),
        notify,
    )
    .await;

    let mut usage = TokenUsage::default();
    let analyses = documents
        .iter()
        .zip(results)
        .map(|(doc, result)| match result {
            Ok(completion) => {
                usage.add(&completion.usage);
                let text = completion.text.trim();
                if text.is_empty() {
                    tracing::warn!(document_id = %doc.id, "empty analysis, document skipped");
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(document_id = %doc.id, "analysis failed, document skipped: {e}");
                None
            }
        })
        .collect();

    (analyses, usage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::DossierError;
    use crate::provider::{ChunkStream, Completion, LlmProvider, StructuredRequest};
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn id(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<Completion, DossierError> {
            // Make the analysis text identify which document prompt it saw
            if request.prompt.contains("Body d-fail") {
                return Err(DossierError::Provider {
                    provider: "echo".into(),
                    message: "simulated failure".into(),
                    retriable: false,
                });
            }
            let marker = request
                .prompt
                .lines()
                .find(|l| l.starts_with("Body "))
                .unwrap_or("")
                .to_string();
            Ok(Completion {
                text: format!("analysis of {marker}"),
                usage: TokenUsage {
                    input_tokens: 2,
                    output_tokens: 2,
                },
            })
        }

        async fn complete_structured(
            &self,
            _request: StructuredRequest,
        ) -> Result<Completion, DossierError> {
            unimplemented!("analysis is a free-text call")
        }

        async fn complete_streamed(
            &self,
            _request: CompletionRequest,
        ) -> Result<ChunkStream, DossierError> {
            unimplemented!("analysis is a free-text call")
        }
    }

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            title: format!("Title {id}"),
            text: format!("Body {id}"),
            date: "1890-01-01".into(),
            link: format!("https://records.example/{id}"),
        }
    }

    #[tokio::test]
    async fn test_analyses_aligned_with_input_order() {
        let call = StageCall {
            llm: &EchoProvider,
            model: "m",
            temperature: 0.1,
            max_tokens: 512,
        };
        let docs = vec![doc("d1"), doc("d2"), doc("d3")];
        let (analyses, usage) = analyze_documents(&call, "q", &docs, 2, |_, _| {}).await;

        assert_eq!(analyses.len(), 3);
        assert_eq!(analyses[0].as_deref(), Some("analysis of Body d1"));
        assert_eq!(analyses[1].as_deref(), Some("analysis of Body d2"));
        assert_eq!(analyses[2].as_deref(), Some("analysis of Body d3"));
        assert_eq!(usage.total(), 12);
    }

    #[tokio::test]
    async fn test_failed_item_yields_none_in_place() {
        let call = StageCall {
            llm: &EchoProvider,
            model: "m",
            temperature: 0.1,
            max_tokens: 512,
        };
        let docs = vec![doc("d1"), doc("d-fail"), doc("d3")];
        let (analyses, _) = analyze_documents(&call, "q", &docs, 2, |_, _| {}).await;

        assert!(analyses[0].is_some());
        assert!(analyses[1].is_none());
        assert_eq!(analyses[2].as_deref(), Some("analysis of Body d3"));
    }

    #[tokio::test]
    async fn test_no_documents() {
        let call = StageCall {
            llm: &EchoProvider,
            model: "m",
            temperature: 0.1,
            max_tokens: 512,
        };
        let (analyses, usage) = analyze_documents(&call, "q", &[], 2, |_, _| {}).await;
        assert!(analyses.is_empty());
        assert_eq!(usage.total(), 0);
    }
}
