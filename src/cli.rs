use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::query::chapters::ChapterView;

/// Change hierarchy graph engine for code review.
///
/// change-story reads a serialized hierarchy of diff hunks and the aggregators grouping
/// them, and turns it into a navigable narrative, alternate chapter views, community
/// clusters, and generation dependency sets.
#[derive(Parser, Debug)]
#[command(
    name = "change-story",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log engine progress to stderr (overrides RUST_LOG with `debug`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of `change-story.toml` next to the hierarchy file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for query results.
#[derive(Clone, Debug, ValueEnum, Default)]
pub enum OutputFormat {
    /// Compact one-line-per-result format (default).
    #[default]
    Compact,
    /// Human-readable columnar table with optional ANSI color when stdout is a terminal.
    Table,
    /// Structured JSON suitable for programmatic consumption.
    Json,
}

/// Pruned story selected with `chapters --view`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    /// Usage patterns not nested in another usage pattern.
    Requirements,
    /// Common components that cite no context hunk.
    CommonHunks,
    /// Similar components.
    Similar,
    /// Every common component.
    CommonNodes,
}

impl From<ViewArg> for ChapterView {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Requirements => ChapterView::Requirements,
            ViewArg::CommonHunks => ChapterView::CommonHunks,
            ViewArg::Similar => ChapterView::Similar,
            ViewArg::CommonNodes => ChapterView::CommonNodes,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hierarchy overview: node and edge counts by type, story length.
    Stats {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// The linear narrative: aggregator chapters in postorder, heaviest branch first.
    Story {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Mark the chapter showing this node id as the current one.
        #[arg(long)]
        at: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Alternate granularity views nesting the story under significant roots.
    ///
    /// Without --view, all four views are printed.
    Chapters {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Which root-selection view to print.
        #[arg(long, value_enum)]
        view: Option<ViewArg>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Partition every node into communities by structural connectivity.
    Clusters {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Override the shuffle seed from config.
        #[arg(long)]
        seed: Option<u32>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Summarize one node: type, parents, branch weight, descendant hunk generations.
    Inspect {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Node id.
        id: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Nodes whose descriptions must be generated before this node's.
    Deps {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Node id.
        id: String,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Find nodes by id, title, or hunk file path (regex).
    Find {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Regex pattern.
        pattern: String,

        /// Case-insensitive pattern matching.
        #[arg(short = 'i', long)]
        case_insensitive: bool,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Set a node's title and/or description and write the snapshot back.
    Describe {
        /// Path to the hierarchy JSON file.
        file: PathBuf,

        /// Node id.
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Write the snapshot here instead of overwriting the input file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
