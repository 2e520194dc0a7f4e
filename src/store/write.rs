use super::*;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StoredCounts {
    pub chapters: usize,
    pub paragraphs: usize,
    pub viewpoints: usize,
    pub evidence: usize,
    pub replaced_previous: bool,
}

/// Replaces everything stored for `book_id` with the parsed graph. The whole
/// write is one transaction: on error nothing of the new parse is visible and
/// the previous rows survive.
pub fn store_document(
    connection: &mut Connection,
    book_id: &str,
    source_path: &str,
    parsed: &ParsedDocument,
) -> Result<StoredCounts> {
    let tx = connection.transaction()?;

    let replaced_previous = tx
        .query_row(
            "SELECT 1 FROM books WHERE book_id = ?1",
            [book_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .context("failed to look up existing book")?
        .is_some();

    for table in ["evidence", "viewpoints", "paragraphs", "chapters", "books"] {
        tx.execute(&format!("DELETE FROM {table} WHERE book_id = ?1"), [book_id])
            .with_context(|| format!("failed to clear {table} rows for {book_id}"))?;
    }

    let document = &parsed.document;
    let stats_json =
        serde_json::to_string(&parsed.stats).context("failed to serialize parse stats")?;
    tx.execute(
        "
        INSERT INTO books(
          book_id, document_id, title, author, format, source_path, source_sha256,
          language, total_words, chapter_count, paragraph_count, viewpoint_count,
          segment_strategy, parse_stats_json, ingested_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ",
        params![
            book_id,
            document.document_id.to_string(),
            &document.title,
            document.author.as_deref(),
            document.format.as_str(),
            source_path,
            &document.source_sha256,
            &document.language,
            document.total_words as i64,
            parsed.chapters.len() as i64,
            parsed.paragraph_count() as i64,
            parsed.viewpoint_count() as i64,
            parsed.stats.chapter_detection.strategy.as_str(),
            stats_json,
            now_utc_string(),
        ],
    )
    .with_context(|| format!("failed to insert book {book_id}"))?;

    let mut counts = StoredCounts {
        replaced_previous,
        ..StoredCounts::default()
    };

    {
        let mut chapter_statement = tx.prepare(
            "
            INSERT INTO chapters(chapter_id, book_id, chapter_number, title, content, word_count)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )?;
        let mut paragraph_statement = tx.prepare(
            "
            INSERT INTO paragraphs(paragraph_id, chapter_id, book_id, paragraph_number, content, word_count)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )?;
        let mut viewpoint_statement = tx.prepare(
            "
            INSERT INTO viewpoints(
              viewpoint_id, chapter_id, book_id, viewpoint_order, content, original_text,
              context, keywords_json, score
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )?;

        for chapter in &parsed.chapters {
            let chapter_words = chapter
                .paragraphs
                .iter()
                .map(|paragraph| paragraph.word_count)
                .sum::<usize>();
            chapter_statement
                .execute(params![
                    chapter.chapter_id.to_string(),
                    book_id,
                    chapter.chapter_number as i64,
                    &chapter.title,
                    &chapter.content,
                    chapter_words as i64,
                ])
                .with_context(|| format!("failed to insert chapter {}", chapter.chapter_number))?;
            counts.chapters += 1;

            for paragraph in &chapter.paragraphs {
                paragraph_statement.execute(params![
                    paragraph.paragraph_id.to_string(),
                    chapter.chapter_id.to_string(),
                    book_id,
                    paragraph.paragraph_number as i64,
                    &paragraph.content,
                    paragraph.word_count as i64,
                ])?;
                counts.paragraphs += 1;
            }

            for (index, viewpoint) in chapter.viewpoints.iter().enumerate() {
                let keywords_json = serde_json::to_string(&viewpoint.keywords)
                    .context("failed to serialize viewpoint keywords")?;
                viewpoint_statement.execute(params![
                    viewpoint.viewpoint_id.to_string(),
                    chapter.chapter_id.to_string(),
                    book_id,
                    (index + 1) as i64,
                    &viewpoint.content,
                    &viewpoint.original_text,
                    &viewpoint.context,
                    keywords_json,
                    viewpoint.score,
                ])?;
                counts.viewpoints += 1;
            }
        }

        let mut evidence_statement = tx.prepare(
            "
            INSERT INTO evidence(
              evidence_id, viewpoint_id, chapter_id, book_id, paragraph_id, paragraph_number,
              evidence_text, context_before, context_after, keywords_json, score
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )?;
        for record in &parsed.evidence {
            let keywords_json = serde_json::to_string(&record.keywords)
                .context("failed to serialize evidence keywords")?;
            evidence_statement.execute(params![
                record.evidence_id.to_string(),
                record.viewpoint_id.to_string(),
                record.chapter_id.to_string(),
                book_id,
                record.paragraph_id.map(|id| id.to_string()),
                record.paragraph_number.map(|number| number as i64),
                &record.evidence_text,
                record.context_before.as_deref(),
                record.context_after.as_deref(),
                keywords_json,
                record.score,
            ])?;
            counts.evidence += 1;
        }
    }

    tx.commit()
        .with_context(|| format!("failed to commit book {book_id}"))?;

    info!(
        book_id,
        chapters = counts.chapters,
        paragraphs = counts.paragraphs,
        viewpoints = counts.viewpoints,
        evidence = counts.evidence,
        replaced = counts.replaced_previous,
        "stored book"
    );
    Ok(counts)
}
