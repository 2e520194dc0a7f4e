use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::{build_pipeline, default_db_path, inventory, read_document_source};
use crate::model::{
    BookEntry, BookIngestReport, BookInventoryManifest, IngestCounts, IngestPaths,
    IngestRunManifest,
};
use crate::pipeline::{DocumentPipeline, ParseStats, SegmentStrategyKind, ensure_extractable};
use crate::store::{DB_SCHEMA_VERSION, StoredCounts, book_id_for, open_store, store_document};
use crate::util::{ensure_directory, now_utc_string, read_json, utc_compact_string, write_json_pretty};

mod run;
#[cfg(test)]
mod tests;

pub use run::run;

use run::*;
