use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::pipeline::ParsedDocument;
use crate::text::sha256_hex;
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

mod read;
mod schema;
#[cfg(test)]
mod tests;
mod write;

pub use read::{
    EvidenceFilter, EvidenceHit, ParagraphRow, chapter_paragraphs, list_books, search_evidence,
    table_counts,
};
pub use schema::{configure_connection, ensure_schema};
pub use write::{StoredCounts, store_document};

/// Opens (creating if needed) the book database and brings its schema up to date.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

/// Keyed on the library filename: stable across re-ingests of the same file,
/// distinct for `x.txt` and `x.md` even though both are titled `x`.
pub fn book_id_for(filename: &str) -> String {
    let digest = sha256_hex(filename.trim().as_bytes());
    format!("book-{}", &digest[..16])
}
