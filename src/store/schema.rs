use super::*;

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS books (
              book_id TEXT PRIMARY KEY,
              document_id TEXT NOT NULL,
              title TEXT NOT NULL,
              format TEXT NOT NULL,
              source_path TEXT NOT NULL,
              source_sha256 TEXT NOT NULL,
              language TEXT NOT NULL,
              total_words INTEGER NOT NULL DEFAULT 0,
              chapter_count INTEGER NOT NULL DEFAULT 0,
              paragraph_count INTEGER NOT NULL DEFAULT 0,
              viewpoint_count INTEGER NOT NULL DEFAULT 0,
              ingested_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chapters (
              chapter_id TEXT PRIMARY KEY,
              book_id TEXT NOT NULL,
              chapter_number INTEGER NOT NULL,
              title TEXT NOT NULL,
              content TEXT NOT NULL,
              word_count INTEGER NOT NULL DEFAULT 0,
              FOREIGN KEY(book_id) REFERENCES books(book_id)
            );

            CREATE TABLE IF NOT EXISTS paragraphs (
              paragraph_id TEXT PRIMARY KEY,
              chapter_id TEXT NOT NULL,
              book_id TEXT NOT NULL,
              paragraph_number INTEGER NOT NULL,
              content TEXT NOT NULL,
              word_count INTEGER NOT NULL DEFAULT 0,
              FOREIGN KEY(chapter_id) REFERENCES chapters(chapter_id)
            );

            CREATE TABLE IF NOT EXISTS viewpoints (
              viewpoint_id TEXT PRIMARY KEY,
              chapter_id TEXT NOT NULL,
              book_id TEXT NOT NULL,
              viewpoint_order INTEGER NOT NULL,
              content TEXT NOT NULL,
              original_text TEXT NOT NULL,
              context TEXT NOT NULL,
              keywords_json TEXT NOT NULL,
              score REAL NOT NULL,
              FOREIGN KEY(chapter_id) REFERENCES chapters(chapter_id)
            );

            CREATE TABLE IF NOT EXISTS evidence (
              evidence_id TEXT PRIMARY KEY,
              viewpoint_id TEXT NOT NULL,
              chapter_id TEXT NOT NULL,
              book_id TEXT NOT NULL,
              paragraph_id TEXT,
              paragraph_number INTEGER,
              evidence_text TEXT NOT NULL,
              context_before TEXT,
              context_after TEXT,
              keywords_json TEXT NOT NULL,
              score REAL NOT NULL,
              FOREIGN KEY(viewpoint_id) REFERENCES viewpoints(viewpoint_id),
              FOREIGN KEY(chapter_id) REFERENCES chapters(chapter_id)
            );
            ",
        )
        .context("failed to create book schema")?;

    ensure_column_exists(connection, "books", "author TEXT")?;
    ensure_column_exists(connection, "books", "segment_strategy TEXT")?;
    ensure_column_exists(connection, "books", "parse_stats_json TEXT")?;

    connection
        .execute_batch(
            "
            CREATE INDEX IF NOT EXISTS idx_chapters_book_number ON chapters(book_id, chapter_number);
            CREATE INDEX IF NOT EXISTS idx_paragraphs_chapter_number ON paragraphs(chapter_id, paragraph_number);
            CREATE INDEX IF NOT EXISTS idx_paragraphs_book ON paragraphs(book_id);
            CREATE INDEX IF NOT EXISTS idx_viewpoints_chapter ON viewpoints(chapter_id, viewpoint_order);
            CREATE INDEX IF NOT EXISTS idx_evidence_book_chapter ON evidence(book_id, chapter_id);
            CREATE INDEX IF NOT EXISTS idx_evidence_viewpoint ON evidence(viewpoint_id);
            ",
        )
        .context("failed to create book indexes")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    debug!(schema_version = DB_SCHEMA_VERSION, "book schema ready");
    Ok(())
}

fn ensure_column_exists(
    connection: &Connection,
    table_name: &str,
    column_definition: &str,
) -> Result<()> {
    let Some(column_name) = column_definition.split_whitespace().next() else {
        bail!("invalid column definition: {column_definition}");
    };

    let pragma_sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to inspect schema for table {table_name}"))?;

    let mut rows = statement.query([])?;
    while let Some(row) = rows.next()? {
        let existing_name: String = row.get(1)?;
        if existing_name == column_name {
            return Ok(());
        }
    }

    let alter_sql = format!("ALTER TABLE {table_name} ADD COLUMN {column_definition}");
    connection
        .execute(&alter_sql, [])
        .with_context(|| format!("failed to add column {column_name} on {table_name}"))?;

    Ok(())
}
