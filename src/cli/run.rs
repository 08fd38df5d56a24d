// src/cli/run.rs — Wires the collaborators and drives a research run

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::corpus::DocumentStore;
use crate::infra::config::Config;
use crate::infra::errors::DossierError;
use crate::provider::budget::BudgetPolicy;
use crate::provider::openrouter::OpenRouterProvider;
use crate::provider::retry::{RetryPolicy, RetryingProvider};
use crate::provider::LlmProvider;
use crate::research::report::synthesize_report;
use crate::research::types::{RunOutcome, RunResult};
use crate::research::workflow::{ResearchWorkflow, WorkflowSettings};
use crate::search::embedder::HttpEmbedder;
use crate::search::weaviate::WeaviateIndex;
use crate::search::{Embedder, SearchIndex};

struct Collaborators {
    /// Raw provider for the one unretried report call.
    raw_llm: Arc<dyn LlmProvider>,
    /// Retrying wrapper used by every workflow stage.
    retrying_llm: Arc<dyn LlmProvider>,
    index: Arc<dyn SearchIndex>,
    embedder: Arc<dyn Embedder>,
    corpus: Arc<DocumentStore>,
}

/// Construct every external collaborator and fail fast on anything fatal:
/// missing credentials, unreadable corpus, unreachable search index.
async fn assemble(cli: &Cli, config: &Config) -> anyhow::Result<Collaborators> {
    let api_key = config.api_key()?;

    let raw_llm: Arc<dyn LlmProvider> = Arc::new(
        OpenRouterProvider::new(api_key, &config.llm.base_url)
            .with_reasoning_effort(config.llm.reasoning_effort.clone()),
    );
    let retrying_llm: Arc<dyn LlmProvider> = Arc::new(RetryingProvider::new(
        raw_llm.clone(),
        RetryPolicy::from(&config.retry),
    ));

    let index: Arc<dyn SearchIndex> = Arc::new(WeaviateIndex::new(
        &config.search.url,
        &config.search.collection,
    ));

    let embeddings_api_key = config
        .search
        .embeddings_api_key_env
        .as_ref()
        .and_then(|env| std::env::var(env).ok());
    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(
        &config.search.embeddings_url,
        &config.search.embeddings_model,
        embeddings_api_key,
    ));

    let corpus_path = cli
        .corpus
        .clone()
        .unwrap_or_else(|| config.corpus.path.clone());
    let corpus = Arc::new(DocumentStore::load(Path::new(&corpus_path))?);
    if corpus.is_empty() {
        return Err(DossierError::Corpus(format!("corpus at {corpus_path} is empty")).into());
    }

    index.ready().await?;

    Ok(Collaborators {
        raw_llm,
        retrying_llm,
        index,
        embedder,
        corpus,
    })
}

fn describe_outcome(result: &RunResult) -> String {
    match result.outcome {
        RunOutcome::Converged => "research converged".into(),
        RunOutcome::Exhausted => "iteration budget exhausted".into(),
        RunOutcome::Starved(stage) => format!("run starved at {stage}"),
    }
}

pub async fn run_research(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let question = cli.question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("no question given; run `dossier \"<question>\"`");
    }

    let collab = assemble(cli, config).await?;

    let mut settings = WorkflowSettings::from_config(config, cli.fast);
    if cli.iterative {
        settings.limits.iterative = true;
    }
    if let Some(n) = cli.max_iterations {
        settings.limits.max_iterations = n;
    }

    let mut workflow = ResearchWorkflow::new(
        collab.retrying_llm.clone(),
        collab.index.clone(),
        collab.embedder.clone(),
        collab.corpus.clone(),
        settings,
    );
    if !cli.quiet {
        workflow = workflow.with_progress(|status, _step| eprintln!("→ {status}"));
    }

    let result = workflow.run(&question).await?;

    if !cli.quiet {
        eprintln!(
            "─ {} after {} iteration(s): {} queries, {} passages, {} documents, {} tokens",
            describe_outcome(&result),
            result.iterations,
            result.queries.len(),
            result.passage_ids.len(),
            result.documents.len(),
            result.usage.total(),
        );
    }

    if result.documents.is_empty() {
        eprintln!("No relevant documents were found; skipping the report.");
        return Ok(());
    }

    let models = config.stage_models(cli.fast);
    let report = synthesize_report(
        collab.raw_llm.as_ref(),
        &question,
        &result.documents,
        &models.report,
        &BudgetPolicy::from_config(&config.models, &config.llm),
        config.llm.temperature.base,
        config.llm.max_output_tokens,
        Duration::from_secs(config.llm.stream_idle_timeout_secs),
        |chunk| {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        },
    )
    .await?;

    println!();
    if !cli.quiet {
        eprintln!("─ report: {} tokens", report.usage.total());
    }

    Ok(())
}

/// `dossier check` — probe each collaborator and report what is broken.
pub async fn run_check(config: &Config) -> anyhow::Result<()> {
    let mut failed = false;

    match config.api_key() {
        Ok(_) => eprintln!("✓ provider API key present ({})", config.llm.api_key_env),
        Err(e) => {
            failed = true;
            eprintln!("✗ {e}");
        }
    }

    match DocumentStore::load(Path::new(&config.corpus.path)) {
        Ok(store) => eprintln!(
            "✓ corpus at {} ({} documents)",
            config.corpus.path,
            store.len()
        ),
        Err(e) => {
            failed = true;
            eprintln!("✗ {e}");
        }
    }

    let index = WeaviateIndex::new(&config.search.url, &config.search.collection);
    match index.ready().await {
        Ok(()) => eprintln!("✓ search index ready at {}", config.search.url),
        Err(e) => {
            failed = true;
            eprintln!("✗ {e}");
        }
    }

    let embedder = HttpEmbedder::new(
        &config.search.embeddings_url,
        &config.search.embeddings_model,
        config
            .search
            .embeddings_api_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok()),
    );
    match embedder.embed(&["connectivity probe".to_string()]).await {
        Ok(_) => eprintln!(
            "✓ embeddings endpoint at {}",
            config.search.embeddings_url
        ),
        Err(e) => {
            failed = true;
            eprintln!("✗ {e}");
        }
    }

    if failed {
        anyhow::bail!("one or more checks failed");
    }
    Ok(())
}
