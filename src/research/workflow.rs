// src/research/workflow.rs — Research workflow orchestrator
//
// Drives query generation → search → relevance → analysis → reflection and
// owns all cross-iteration bookkeeping. Stages fan out internally; the
// orchestrator itself is strictly sequential and does no blocking I/O of
// its own.

use std::collections::HashSet;
use std::sync::Arc;

use super::analyze::analyze_documents;
use super::queries::{generate_queries, QueryHistory};
use super::reflect::assess_progress;
use super::relevance::filter_relevant;
use super::types::{
    AnalyzedDocument, IterationOutcome, ProgressSink, RunOutcome, RunResult, StarvedStage,
};
use super::StageCall;
use crate::corpus::{Document, DocumentStore};
use crate::infra::config::{Config, StageModels, TemperatureConfig, WorkflowConfig};
use crate::infra::errors::DossierError;
use crate::provider::{LlmProvider, TokenUsage};
use crate::search::{dispatch_searches, Embedder, SearchIndex};
use crate::util::dedup_preserving_order;

/// Everything beyond the collaborators the workflow needs for one run.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub models: StageModels,
    pub limits: WorkflowConfig,
    pub temperature: TemperatureConfig,
    pub max_output_tokens: u32,
    pub parallel_width: usize,
}

impl WorkflowSettings {
    pub fn from_config(config: &Config, fast: bool) -> Self {
        Self {
            models: config.stage_models(fast),
            limits: config.workflow_limits(fast),
            temperature: config.llm.temperature.clone(),
            max_output_tokens: config.llm.max_output_tokens,
            parallel_width: config.parallel.max_workers,
        }
    }
}

/// Cross-iteration bookkeeping, exclusively owned by the workflow and
/// mutated only between stage invocations. The seen-id sets only grow.
struct IterationState {
    seen_queries: Vec<String>,
    seen_passage_ids: HashSet<String>,
    passage_id_order: Vec<String>,
    seen_document_ids: HashSet<String>,
    document_id_order: Vec<String>,
    considerations: Vec<String>,
    analyses: Vec<String>,
    documents: Vec<AnalyzedDocument>,
    iteration: u32,
    usage: TokenUsage,
}

impl IterationState {
    fn new() -> Self {
        Self {
            seen_queries: Vec::new(),
            seen_passage_ids: HashSet::new(),
            passage_id_order: Vec::new(),
            seen_document_ids: HashSet::new(),
            document_id_order: Vec::new(),
            considerations: Vec::new(),
            analyses: Vec::new(),
            documents: Vec::new(),
            iteration: 0,
            usage: TokenUsage::default(),
        }
    }
}

pub struct ResearchWorkflow {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchIndex>,
    embedder: Arc<dyn Embedder>,
    corpus: Arc<DocumentStore>,
    settings: WorkflowSettings,
    run_id: String,
    state: IterationState,
    on_progress: Option<ProgressSink>,
}

impl ResearchWorkflow {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchIndex>,
        embedder: Arc<dyn Embedder>,
        corpus: Arc<DocumentStore>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            llm,
            search,
            embedder,
            corpus,
            settings,
            run_id: uuid::Uuid::new_v4().to_string(),
            state: IterationState::new(),
            on_progress: None,
        }
    }

    /// Set an observational progress callback: (status line, step increment).
    pub fn with_progress(mut self, cb: impl Fn(&str, u32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, status: &str, step: u32) {
        if let Some(cb) = &self.on_progress {
            cb(status, step);
        }
    }

    fn stage_call<'a>(&'a self, model: &'a str, temperature: f32) -> StageCall<'a> {
        StageCall {
            llm: self.llm.as_ref(),
            model,
            temperature,
            max_tokens: self.settings.max_output_tokens,
        }
    }

    /// Documents accumulated so far, in accumulation order.
    pub fn documents(&self) -> &[AnalyzedDocument] {
        &self.state.documents
    }

    /// Drive iterations until a terminal state is reached.
    pub async fn run(&mut self, question: &str) -> Result<RunResult, DossierError> {
        let outcome = loop {
            match self.run_iteration(question).await? {
                IterationOutcome::Continuing => continue,
                IterationOutcome::Converged => break RunOutcome::Converged,
                IterationOutcome::Exhausted => break RunOutcome::Exhausted,
                IterationOutcome::Starved(stage) => break RunOutcome::Starved(stage),
            }
        };
        Ok(self.results(outcome))
    }

    /// Run one full query → search → filter → analyze (→ reflect) pass.
    pub async fn run_iteration(
        &mut self,
        question: &str,
    ) -> Result<IterationOutcome, DossierError> {
        let outcome = self.iteration_inner(question).await?;
        self.state.iteration += 1;
        Ok(outcome)
    }

    async fn iteration_inner(
        &mut self,
        question: &str,
    ) -> Result<IterationOutcome, DossierError> {
        let first_iteration = self.state.iteration == 0;
        let limits = self.settings.limits.clone();
        let width = self.settings.parallel_width;

        // Step 1: generate search queries
        self.emit("Generating search queries...", 1);
        let (new_queries, usage) = {
            let call = self.stage_call(
                &self.settings.models.query_generation,
                self.settings.temperature.high,
            );
            generate_queries(
                &call,
                question,
                limits.max_queries,
                QueryHistory {
                    previous_queries: &self.state.seen_queries,
                    considerations: &self.state.considerations,
                },
                first_iteration,
            )
            .await?
        };
        self.state.usage.add(&usage);
        self.state.seen_queries.extend(new_queries.iter().cloned());

        if new_queries.is_empty() {
            self.emit("No search queries produced", 0);
            return Ok(IterationOutcome::Starved(StarvedStage::Queries));
        }

        // Step 2: execute searches
        self.emit(
            &format!("Running {} search queries...", new_queries.len()),
            1,
        );
        let passages = dispatch_searches(
            self.search.as_ref(),
            self.embedder.as_ref(),
            &new_queries,
            limits.search_limit,
            limits.auto_limit,
            &self.state.seen_passage_ids,
        )
        .await?;
        for p in &passages {
            self.state.seen_passage_ids.insert(p.passage_id.clone());
            self.state.passage_id_order.push(p.passage_id.clone());
        }

        if passages.is_empty() {
            self.emit("No new search results found", 0);
            return Ok(IterationOutcome::Starved(StarvedStage::Search));
        }

        // Step 3: check relevance
        self.emit(
            &format!("Assessing relevance of {} passages...", passages.len()),
            1,
        );
        let (kept, usage) = {
            let call = self.stage_call(
                &self.settings.models.relevance,
                self.settings.temperature.low,
            );
            filter_relevant(&call, question, passages, width, |done, total| {
                tracing::debug!(done, total, "relevance progress");
            })
            .await
        };
        self.state.usage.add(&usage);

        let mut relevant_ids =
            dedup_preserving_order(kept.iter().map(|p| p.document_id.clone()));
        relevant_ids.retain(|id| !self.state.seen_document_ids.contains(id));

        if relevant_ids.is_empty() {
            self.emit("No relevant documents found", 0);
            return Ok(IterationOutcome::Starved(StarvedStage::Relevance));
        }

        self.state
            .seen_document_ids
            .extend(relevant_ids.iter().cloned());
        self.state
            .document_id_order
            .extend(relevant_ids.iter().cloned());

        // Step 4: analyze the full documents behind the relevant passages
        let documents: Vec<Document> = relevant_ids
            .iter()
            .filter_map(|id| {
                let doc = self.corpus.get(id);
                if doc.is_none() {
                    tracing::warn!(document_id = %id, "document missing from corpus");
                }
                doc.cloned()
            })
            .collect();

        self.emit(
            &format!("Analyzing {} relevant documents...", documents.len()),
            1,
        );
        let (analyses, usage) = {
            let call = self.stage_call(
                &self.settings.models.analysis,
                self.settings.temperature.low,
            );
            analyze_documents(&call, question, &documents, width, |done, total| {
                tracing::debug!(done, total, "analysis progress");
            })
            .await
        };
        self.state.usage.add(&usage);

        for (doc, analysis) in documents.iter().zip(analyses) {
            if let Some(text) = analysis {
                self.state.analyses.push(text.clone());
                self.state.documents.push(AnalyzedDocument::new(doc, text));
            }
        }

        if !limits.iterative {
            self.emit("Iteration complete", 1);
            return Ok(IterationOutcome::Converged);
        }

        // Step 5: reflect on the state of the research
        self.emit("Reflecting on research status...", 1);
        let (reflection, usage) = {
            let call = self.stage_call(
                &self.settings.models.reflection,
                self.settings.temperature.low,
            );
            assess_progress(&call, question, &self.state.analyses).await?
        };
        self.state.usage.add(&usage);

        if let Some(text) = reflection.text {
            self.state.considerations.push(text);
        }

        // Unknown must never end a run early: only an explicit `true` converges.
        if reflection.finished.is_true() {
            self.emit("Research complete", 1);
            Ok(IterationOutcome::Converged)
        } else if self.state.iteration + 1 >= limits.max_iterations {
            self.emit("Iteration budget exhausted", 1);
            Ok(IterationOutcome::Exhausted)
        } else {
            self.emit("Further iteration required", 1);
            Ok(IterationOutcome::Continuing)
        }
    }

    fn results(&self, outcome: RunOutcome) -> RunResult {
        RunResult {
            run_id: self.run_id.clone(),
            finished_at: chrono::Utc::now(),
            outcome,
            documents: self.state.documents.clone(),
            queries: self.state.seen_queries.clone(),
            passage_ids: self.state.passage_id_order.clone(),
            relevant_document_ids: self.state.document_id_order.clone(),
            iterations: self.state.iteration,
            usage: self.state.usage.clone(),
        }
    }
}
