// tests/workflow_test.rs — State-machine scenarios with mock collaborators

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use dossier::corpus::{Document, DocumentStore};
use dossier::infra::config::{StageModels, TemperatureConfig, WorkflowConfig};
use dossier::infra::errors::DossierError;
use dossier::provider::{
    ChunkStream, Completion, CompletionRequest, LlmProvider, StructuredRequest, TokenUsage,
};
use dossier::research::types::{RunOutcome, StarvedStage};
use dossier::research::workflow::{ResearchWorkflow, WorkflowSettings};
use dossier::search::{Embedder, Passage, SearchIndex};

/// Routes structured calls by their schema: the queries, relevance, and
/// reflection stages each declare a distinctive property.
struct MockProvider {
    /// One batch of queries per iteration, popped per call.
    queries: Mutex<VecDeque<Vec<String>>>,
    /// Passage text fragment → relevance verdict (raw JSON value).
    relevance: HashMap<String, serde_json::Value>,
    /// One reflection verdict per iteration, popped per call.
    reflections: Mutex<VecDeque<serde_json::Value>>,
    /// Document text fragment → canned analysis.
    analyses: HashMap<String, String>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            queries: Mutex::new(VecDeque::new()),
            relevance: HashMap::new(),
            reflections: Mutex::new(VecDeque::new()),
            analyses: HashMap::new(),
        }
    }

    fn with_query_batches(self, batches: Vec<Vec<&str>>) -> Self {
        *self.queries.lock().unwrap() = batches
            .into_iter()
            .map(|b| b.into_iter().map(String::from).collect())
            .collect();
        self
    }

    fn with_relevance(mut self, needle: &str, verdict: serde_json::Value) -> Self {
        self.relevance.insert(needle.to_string(), verdict);
        self
    }

    fn with_reflections(self, verdicts: Vec<serde_json::Value>) -> Self {
        *self.reflections.lock().unwrap() = verdicts.into();
        self
    }

    fn with_analysis(mut self, needle: &str, analysis: &str) -> Self {
        self.analyses.insert(needle.to_string(), analysis.to_string());
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, DossierError> {
        let analysis = self
            .analyses
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, a)| a.clone())
            .unwrap_or_else(|| panic!("no canned analysis for prompt"));
        Ok(Completion {
            text: analysis,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 10,
            },
        })
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<Completion, DossierError> {
        let properties = &request.schema["properties"];

        let text = if properties.get("queries").is_some() {
            let batch = self
                .queries
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            serde_json::json!({ "queries": batch }).to_string()
        } else if properties.get("relevance").is_some() {
            let verdict = self
                .relevance
                .iter()
                .find(|(needle, _)| request.prompt.contains(needle.as_str()))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| panic!("no canned relevance verdict for prompt"));
            serde_json::json!({ "reasoning": "canned", "relevance": verdict }).to_string()
        } else if properties.get("finished").is_some() {
            let verdict = self
                .reflections
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(serde_json::json!(false));
            serde_json::json!({ "reflection": "canned reflection", "finished": verdict })
                .to_string()
        } else {
            panic!("unrecognized schema in structured call");
        };

        Ok(Completion {
            text,
            usage: TokenUsage {
                input_tokens: 5,
                output_tokens: 5,
            },
        })
    }

    async fn complete_streamed(
        &self,
        _request: CompletionRequest,
    ) -> Result<ChunkStream, DossierError> {
        unimplemented!("the workflow never streams")
    }
}

struct MockIndex {
    /// Query text → ranked passages.
    responses: HashMap<String, Vec<Passage>>,
}

#[async_trait]
impl SearchIndex for MockIndex {
    async fn hybrid_search(
        &self,
        query: &str,
        _vector: &[f32],
        _limit: usize,
        _auto_limit: usize,
    ) -> Result<Vec<Passage>, DossierError> {
        Ok(self.responses.get(query).cloned().unwrap_or_default())
    }

    async fn ready(&self) -> Result<(), DossierError> {
        Ok(())
    }
}

struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DossierError> {
        Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

fn passage(doc: &str, pid: &str, text: &str) -> Passage {
    Passage {
        document_id: doc.into(),
        text: text.into(),
        passage_id: pid.into(),
    }
}

fn document(id: &str) -> Document {
    Document {
        id: id.into(),
        title: format!("Record {id}"),
        text: format!("Full text of {id}"),
        date: "1893-03-14".into(),
        link: format!("https://records.example/{id}"),
    }
}

fn settings(iterative: bool, max_iterations: u32) -> WorkflowSettings {
    WorkflowSettings {
        models: StageModels {
            query_generation: "mock-lite".into(),
            relevance: "mock-lite".into(),
            analysis: "mock-mid".into(),
            reflection: "mock-mid".into(),
            report: "mock-big".into(),
        },
        limits: WorkflowConfig {
            max_queries: 5,
            search_limit: 30,
            auto_limit: 5,
            max_iterations,
            iterative,
        },
        temperature: TemperatureConfig::default(),
        max_output_tokens: 2048,
        parallel_width: 4,
    }
}

fn workflow(
    provider: MockProvider,
    index: MockIndex,
    corpus: Vec<Document>,
    settings: WorkflowSettings,
) -> ResearchWorkflow {
    ResearchWorkflow::new(
        Arc::new(provider),
        Arc::new(index),
        Arc::new(MockEmbedder),
        Arc::new(DocumentStore::from_documents(corpus)),
        settings,
    )
}

#[tokio::test]
async fn test_single_iteration_end_to_end() {
    // p1, p2 belong to d1; p3 to d2. p1 and p3 are relevant, p2 is not.
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["tax decisions council"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_relevance("passage two", serde_json::json!(false))
        .with_relevance("passage three", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1")
        .with_analysis("Full text of d2", "A2");
    let index = MockIndex {
        responses: [(
            "tax decisions council".to_string(),
            vec![
                passage("d1", "p1", "passage one"),
                passage("d1", "p2", "passage two"),
                passage("d2", "p3", "passage three"),
            ],
        )]
        .into(),
    };

    let mut wf = workflow(
        provider,
        index,
        vec![document("d1"), document("d2")],
        settings(false, 3),
    );
    let result = wf
        .run("What did the council decide about taxes?")
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.queries, vec!["tax decisions council"]);
    assert_eq!(result.passage_ids, vec!["p1", "p2", "p3"]);
    assert_eq!(result.relevant_document_ids, vec!["d1", "d2"]);

    let pairs: Vec<(&str, &str)> = result
        .documents
        .iter()
        .map(|d| (d.document_id.as_str(), d.analysis.as_str()))
        .collect();
    assert_eq!(pairs, vec![("d1", "A1"), ("d2", "A2")]);
    assert!(result.usage.total() > 0);
}

#[tokio::test]
async fn test_zero_queries_starves_without_panicking() {
    let provider = MockProvider::new().with_query_batches(vec![vec![]]);
    let index = MockIndex {
        responses: HashMap::new(),
    };

    let mut wf = workflow(provider, index, vec![document("d1")], settings(false, 3));
    let result = wf.run("anything").await.unwrap();

    assert_eq!(result.outcome, RunOutcome::Starved(StarvedStage::Queries));
    assert!(result.documents.is_empty());
    assert!(result.passage_ids.is_empty());
    assert_eq!(result.iterations, 1);
}

#[tokio::test]
async fn test_reflection_finished_stops_after_first_iteration() {
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q0"], vec!["q1"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1")
        .with_reflections(vec![serde_json::json!(true)]);
    let index = MockIndex {
        responses: [("q0".to_string(), vec![passage("d1", "p1", "passage one")])].into(),
    };

    let mut wf = workflow(provider, index, vec![document("d1")], settings(true, 3));
    let result = wf.run("question").await.unwrap();

    assert_eq!(result.outcome, RunOutcome::Converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.queries, vec!["q0"]);
}

#[tokio::test]
async fn test_two_iterations_dedup_and_exhaustion() {
    // Iteration 1 re-retrieves p1 and adds a second passage for d1; only the
    // brand-new d3 may be analyzed again.
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q-a"], vec!["q-b"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_relevance("passage two", serde_json::json!(true))
        .with_relevance("passage three", serde_json::json!(true))
        .with_relevance("passage four", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1")
        .with_analysis("Full text of d2", "A2")
        .with_analysis("Full text of d3", "A3")
        .with_reflections(vec![serde_json::json!(false), serde_json::json!(false)]);
    let index = MockIndex {
        responses: [
            (
                "q-a".to_string(),
                vec![
                    passage("d1", "p1", "passage one"),
                    passage("d2", "p2", "passage two"),
                ],
            ),
            (
                "q-b".to_string(),
                vec![
                    passage("d1", "p1", "passage one"),
                    passage("d1", "p3", "passage three"),
                    passage("d3", "p4", "passage four"),
                ],
            ),
        ]
        .into(),
    };

    let mut wf = workflow(
        provider,
        index,
        vec![document("d1"), document("d2"), document("d3")],
        settings(true, 2),
    );
    let result = wf.run("question").await.unwrap();

    assert_eq!(result.outcome, RunOutcome::Exhausted);
    assert_eq!(result.iterations, 2);

    // Union of retrieved passage ids has no duplicates
    let mut ids = result.passage_ids.clone();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), result.passage_ids.len());
    assert_eq!(result.passage_ids, vec!["p1", "p2", "p3", "p4"]);

    // No document appears twice in the accumulated collection
    let doc_ids: Vec<&str> = result
        .documents
        .iter()
        .map(|d| d.document_id.as_str())
        .collect();
    assert_eq!(doc_ids, vec!["d1", "d2", "d3"]);
}

#[tokio::test]
async fn test_all_seen_passages_starve_search() {
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q-a"], vec!["q-b"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1")
        .with_reflections(vec![serde_json::json!(false)]);
    // Both iterations retrieve the same single passage
    let index = MockIndex {
        responses: [
            ("q-a".to_string(), vec![passage("d1", "p1", "passage one")]),
            ("q-b".to_string(), vec![passage("d1", "p1", "passage one")]),
        ]
        .into(),
    };

    let mut wf = workflow(provider, index, vec![document("d1")], settings(true, 3));
    let result = wf.run("question").await.unwrap();

    assert_eq!(result.outcome, RunOutcome::Starved(StarvedStage::Search));
    assert_eq!(result.iterations, 2);
    // The starved run still returns what iteration 0 accumulated
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].document_id, "d1");
}

#[tokio::test]
async fn test_no_relevant_passages_starves_relevance() {
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q0"]])
        .with_relevance("passage one", serde_json::json!(false))
        .with_relevance("passage two", serde_json::json!("maybe"));
    let index = MockIndex {
        responses: [(
            "q0".to_string(),
            vec![
                passage("d1", "p1", "passage one"),
                passage("d2", "p2", "passage two"),
            ],
        )]
        .into(),
    };

    let mut wf = workflow(
        provider,
        index,
        vec![document("d1"), document("d2")],
        settings(false, 3),
    );
    let result = wf.run("question").await.unwrap();

    // Unknown verdicts are discarded, not retried
    assert_eq!(result.outcome, RunOutcome::Starved(StarvedStage::Relevance));
    assert!(result.documents.is_empty());
    // Passage bookkeeping still recorded the retrieval
    assert_eq!(result.passage_ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_unknown_reflection_never_converges() {
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q0"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1")
        // Not a boolean and not boolean-like: normalizes to Unknown
        .with_reflections(vec![serde_json::json!("perhaps")]);
    let index = MockIndex {
        responses: [("q0".to_string(), vec![passage("d1", "p1", "passage one")])].into(),
    };

    let mut wf = workflow(provider, index, vec![document("d1")], settings(true, 1));
    let result = wf.run("question").await.unwrap();

    // Ambiguity must not end the run early as success; the budget ends it
    assert_eq!(result.outcome, RunOutcome::Exhausted);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.documents.len(), 1);
}

#[tokio::test]
async fn test_progress_sink_observes_stages() {
    let provider = MockProvider::new()
        .with_query_batches(vec![vec!["q0"]])
        .with_relevance("passage one", serde_json::json!(true))
        .with_analysis("Full text of d1", "A1");
    let index = MockIndex {
        responses: [("q0".to_string(), vec![passage("d1", "p1", "passage one")])].into(),
    };

    let statuses: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    let mut wf = workflow(provider, index, vec![document("d1")], settings(false, 3))
        .with_progress(move |status, _step| sink.lock().unwrap().push(status.to_string()));

    wf.run("question").await.unwrap();

    let seen = statuses.lock().unwrap();
    assert!(seen.iter().any(|s| s.contains("Generating search queries")));
    assert!(seen.iter().any(|s| s.contains("Running 1 search")));
    assert!(seen.iter().any(|s| s.contains("Assessing relevance")));
    assert!(seen.iter().any(|s| s.contains("Analyzing 1 relevant")));
    assert!(seen.iter().any(|s| s.contains("Iteration complete")));
}
