// src/research/types.rs — Research domain types

use serde::{Deserialize, Serialize};

use crate::corpus::Document;
use crate::provider::TokenUsage;

/// A document that survived relevance filtering, with its question-anchored
/// analysis. Appended once and never overwritten later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedDocument {
    pub document_id: String,
    pub title: String,
    pub text: String,
    pub date: String,
    pub link: String,
    pub analysis: String,
}

impl AnalyzedDocument {
    pub fn new(doc: &Document, analysis: String) -> Self {
        Self {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            text: doc.text.clone(),
            date: doc.date.clone(),
            link: doc.link.clone(),
            analysis,
        }
    }
}

/// Which stage produced zero results and ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarvedStage {
    Queries,
    Search,
    Relevance,
}

impl std::fmt::Display for StarvedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StarvedStage::Queries => write!(f, "query generation"),
            StarvedStage::Search => write!(f, "search"),
            StarvedStage::Relevance => write!(f, "relevance filtering"),
        }
    }
}

/// Outcome of a single iteration. `Continuing` asks the driver to re-invoke
/// with the next iteration index; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Continuing,
    Converged,
    Exhausted,
    Starved(StarvedStage),
}

/// Terminal state of a whole run. Every variant carries the same result
/// shape — convergence never implies non-empty output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Accumulated evidence was judged sufficient (or the run is non-iterative).
    Converged,
    /// The iteration budget ran out with reflection still unsatisfied.
    Exhausted,
    /// A stage produced zero results.
    Starved(StarvedStage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub outcome: RunOutcome,
    /// Accumulated documents with analyses, in accumulation order.
    pub documents: Vec<AnalyzedDocument>,
    /// Every query issued over the run, in order.
    pub queries: Vec<String>,
    /// Every passage id retrieved over the run, first-seen order.
    pub passage_ids: Vec<String>,
    /// Every document id that passed relevance filtering, first-seen order.
    pub relevant_document_ids: Vec<String>,
    /// Iterations executed (including the terminal one).
    pub iterations: u32,
    pub usage: TokenUsage,
}

/// The synthesized report. Produced by a single streamed call; a failed or
/// empty stream yields an error instead of a value of this type.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub markdown: String,
    pub usage: TokenUsage,
}

/// Observational progress callback: (status line, step increment).
pub type ProgressSink = Box<dyn Fn(&str, u32) + Send + Sync>;
