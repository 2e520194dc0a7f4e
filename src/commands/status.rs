use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::{default_catalog_path, default_db_path, inventory};
use crate::model::BookInventoryManifest;
use crate::store::{list_books, table_counts};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let inventory_path = inventory::default_manifest_path(&args.cache_root);
    let catalog_path = default_catalog_path(&args.cache_root);
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));

    info!(cache_root = %args.cache_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: BookInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            book_count = inventory.book_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    if catalog_path.exists() {
        info!(path = %catalog_path.display(), "reference catalog present");
    } else {
        info!(path = %catalog_path.display(), "reference catalog missing; bundled catalog in use");
    }

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let counts = table_counts(&connection)?;
    info!(
        path = %db_path.display(),
        books = counts.books,
        chapters = counts.chapters,
        paragraphs = counts.paragraphs,
        viewpoints = counts.viewpoints,
        evidence = counts.evidence,
        evidence_linked = counts.evidence_linked,
        "database status"
    );

    for book in list_books(&connection)? {
        info!(
            book_id = %book.book_id,
            title = %book.title,
            language = %book.language,
            strategy = %book.segment_strategy.unwrap_or_default(),
            chapters = book.chapter_count,
            paragraphs = book.paragraph_count,
            viewpoints = book.viewpoint_count,
            ingested_at = %book.ingested_at,
            "book"
        );
    }

    Ok(())
}
