use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fileflow_core::sorting::SortCriterion;

#[derive(Debug, Parser)]
#[command(name = "fileflow", about = "FileFlow workflow automation CLI")]
pub struct Cli {
    /// TOML or JSON config file; defaults plus FILEFLOW_* overrides when absent.
    #[arg(long, env = "FILEFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base directory for relative workflow directories.
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// File and rule inputs shared by every command that touches records.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// YAML or JSON list of file records.
    #[arg(long)]
    pub files: Option<PathBuf>,

    /// YAML or JSON list of sorting rules.
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load config, workflows and rules and report problems.
    Validate {
        #[command(flatten)]
        data: DataArgs,
    },
    /// List loaded workflows.
    Workflows,
    /// Run one workflow by name or id and print the execution record.
    Run {
        workflow: String,
        #[command(flatten)]
        data: DataArgs,
        /// JSON object passed as the trigger payload.
        #[arg(long)]
        payload: Option<String>,
        /// Restrict the run to these file ids.
        #[arg(long = "file-id")]
        file_ids: Vec<String>,
    },
    /// Fire a named event and wait for the workflows it started.
    Emit {
        event_type: String,
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        payload: Option<String>,
    },
    /// Run the scheduler until interrupted, printing lifecycle events.
    Serve {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Order file records by rules and/or explicit criteria.
    Sort {
        #[command(flatten)]
        data: DataArgs,
        /// `field[:asc|desc]`; the last one given is the primary key.
        #[arg(long = "by")]
        criteria: Vec<SortCriterion>,
        /// Sort with the suggested criteria for this category instead.
        #[arg(long, conflicts_with = "criteria")]
        category: Option<String>,
    },
    /// Assign each file record a category from the rules.
    Classify {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Show suggested sort criteria for a category.
    Suggest { category: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
