//! Command-line interface definition using clap.

use std::path::PathBuf;

use athena_cluster::{ClusterSelectionMethod, ProcessorConfig};
use clap::{Args, Parser, Subcommand};

fn version_string() -> &'static str {
    static VERSION: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION.get_or_init(|| {
        format!(
            "{} ({}, {})",
            env!("CARGO_PKG_VERSION"),
            env!("ATHENA_GIT_HASH"),
            env!("ATHENA_BUILD_DATE")
        )
    })
}

/// Athena - topic clustering and summaries for chat history
#[derive(Parser, Debug)]
#[command(name = "athena")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use offline hash embeddings even if an API key is configured
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print engagement and lexical scores for every message
    Score {
        /// JSON file holding an array of messages
        input: PathBuf,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Cluster messages by topic and print the representatives
    Cluster {
        /// JSON file holding an array of messages
        input: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Also list messages whose composite score is an outlier
        #[arg(long)]
        highlights: bool,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Summarize messages with the configured chat model
    Summarize {
        /// JSON file holding an array of messages
        input: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Persona name used in the system prompt
        #[arg(long, env = "ATHENA_PERSONA", default_value = "Athena")]
        persona: String,

        /// Summarize every message without clustering first
        #[arg(long)]
        no_cluster: bool,

        /// Also generate follow-up questions
        #[arg(long)]
        follow_up: bool,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Pipeline overrides shared by clustering commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Engagement a message must exceed to skip the fallback
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Texts per embedding request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// HDBSCAN cluster selection epsilon
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// HDBSCAN minimum cluster size
    #[arg(long)]
    pub min_cluster_size: Option<usize>,

    /// Cluster selection method (leaf or eom)
    #[arg(long)]
    pub selection: Option<ClusterSelectionMethod>,
}

impl TuningArgs {
    /// Apply the overrides on top of the default configuration.
    pub fn config(&self) -> ProcessorConfig {
        let mut config = ProcessorConfig::default();
        if let Some(threshold) = self.threshold {
            config = config.with_engagement_threshold(threshold);
        }
        if let Some(size) = self.batch_size {
            config = config.with_embedding_batch_size(size);
        }
        let mut hdbscan = config.hdbscan.clone();
        if let Some(epsilon) = self.epsilon {
            hdbscan = hdbscan.with_epsilon(epsilon);
        }
        if let Some(size) = self.min_cluster_size {
            hdbscan = hdbscan.with_min_cluster_size(size);
        }
        if let Some(method) = self.selection {
            hdbscan = hdbscan.with_selection_method(method);
        }
        config.with_hdbscan(hdbscan)
    }
}

/// Output format for every command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Log filter for our crates based on verbosity.
    pub fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("athena={level}")
    }
}
