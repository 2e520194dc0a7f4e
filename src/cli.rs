use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "bookgraph",
    version,
    about = "Turn plain-text books into chapters, viewpoints and evidence"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Parse(ParseArgs),
    Ingest(IngestArgs),
    Query(QueryArgs),
    Status(StatusArgs),
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    /// Directory holding the book files; defaults to `<cache_root>/library`.
    #[arg(long)]
    pub library_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long)]
    pub pipeline_config: Option<PathBuf>,

    #[arg(long)]
    pub catalog_path: Option<PathBuf>,

    #[arg(long)]
    pub max_viewpoints_per_chapter: Option<usize>,

    #[arg(long)]
    pub fallback_chunk_size: Option<usize>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Summary,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    pub output: OutputFormat,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub library_dir: Option<PathBuf>,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    /// Only ingest books whose title or filename matches; repeatable.
    #[arg(long = "target-book")]
    pub target_books: Vec<String>,

    /// Fail the run when any single book fails to parse or store.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub keyword: Option<String>,

    #[arg(long)]
    pub book_id: Option<String>,

    #[arg(long)]
    pub chapter_id: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// List the paragraphs of `--chapter-id` instead of searching evidence.
    #[arg(long, default_value_t = false)]
    pub paragraphs: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = ".cache/bookgraph")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}
