// src/cli/mod.rs — CLI definition (clap derive)

pub mod run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dossier",
    about = "Deep research over a private document corpus",
    version
)]
pub struct Cli {
    /// Research question (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Keep iterating until reflection judges the evidence sufficient
    #[arg(short, long)]
    pub iterative: bool,

    /// Iteration budget for --iterative runs
    #[arg(short = 'n', long)]
    pub max_iterations: Option<u32>,

    /// Run every stage on the cheap model with tighter search limits
    #[arg(long)]
    pub fast: bool,

    /// Suppress progress output (only emit the report)
    #[arg(long)]
    pub quiet: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Corpus JSON path (overrides the config)
    #[arg(long)]
    pub corpus: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the provider credentials, corpus, and search index
    Check,
}
