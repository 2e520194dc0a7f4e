use serde::{Deserialize, Serialize};

use crate::pipeline::{DocumentFormat, ParseStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    pub filename: String,
    pub title: String,
    pub format: DocumentFormat,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub book_count: usize,
    pub books: Vec<BookEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub inventory_manifest_path: String,
    pub catalog_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub book_count: usize,
    pub selected_book_count: usize,
    pub books_stored: usize,
    pub books_failed: usize,
    pub books_replaced: usize,
    pub chapters_inserted: usize,
    pub paragraphs_inserted: usize,
    pub viewpoints_inserted: usize,
    pub evidence_inserted: usize,
    pub evidence_unlinked: usize,
    pub known_book_segmentations: usize,
    pub pattern_segmentations: usize,
    pub fallback_segmentations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookIngestReport {
    pub book_id: String,
    pub filename: String,
    pub title: String,
    pub status: String,
    pub stats: Option<ParseStats>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub books: Vec<BookIngestReport>,
    pub warnings: Vec<String>,
}
