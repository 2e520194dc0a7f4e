use super::*;

#[derive(Debug, Clone, Serialize)]
pub struct BookRow {
    pub book_id: String,
    pub title: String,
    pub author: Option<String>,
    pub language: String,
    pub segment_strategy: Option<String>,
    pub chapter_count: i64,
    pub paragraph_count: i64,
    pub viewpoint_count: i64,
    pub ingested_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphRow {
    pub paragraph_id: String,
    pub chapter_id: String,
    pub paragraph_number: i64,
    pub content: String,
    pub word_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceFilter {
    pub keyword: Option<String>,
    pub book_id: Option<String>,
    pub chapter_id: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvidenceHit {
    pub evidence_id: String,
    pub book_id: String,
    pub book_title: String,
    pub chapter_id: String,
    pub chapter_number: i64,
    pub chapter_title: String,
    pub viewpoint_id: String,
    pub viewpoint: String,
    pub paragraph_id: Option<String>,
    pub paragraph_number: Option<i64>,
    pub evidence_text: String,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    pub keywords: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TableCounts {
    pub books: i64,
    pub chapters: i64,
    pub paragraphs: i64,
    pub viewpoints: i64,
    pub evidence: i64,
    pub evidence_linked: i64,
}

pub fn list_books(connection: &Connection) -> Result<Vec<BookRow>> {
    let mut statement = connection.prepare(
        "
        SELECT book_id, title, author, language, segment_strategy,
               chapter_count, paragraph_count, viewpoint_count, ingested_at
        FROM books
        ORDER BY title ASC, book_id ASC
        ",
    )?;

    let rows = statement.query_map([], |row| {
        Ok(BookRow {
            book_id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            language: row.get(3)?,
            segment_strategy: row.get(4)?,
            chapter_count: row.get(5)?,
            paragraph_count: row.get(6)?,
            viewpoint_count: row.get(7)?,
            ingested_at: row.get(8)?,
        })
    })?;

    rows.collect::<rusqlite::Result<Vec<BookRow>>>()
        .context("failed to read books")
}

pub fn chapter_paragraphs(connection: &Connection, chapter_id: &str) -> Result<Vec<ParagraphRow>> {
    let mut statement = connection.prepare(
        "
        SELECT paragraph_id, chapter_id, paragraph_number, content, word_count
        FROM paragraphs
        WHERE chapter_id = ?1
        ORDER BY paragraph_number ASC
        ",
    )?;

    let rows = statement.query_map([chapter_id], |row| {
        Ok(ParagraphRow {
            paragraph_id: row.get(0)?,
            chapter_id: row.get(1)?,
            paragraph_number: row.get(2)?,
            content: row.get(3)?,
            word_count: row.get(4)?,
        })
    })?;

    rows.collect::<rusqlite::Result<Vec<ParagraphRow>>>()
        .with_context(|| format!("failed to read paragraphs for chapter {chapter_id}"))
}

/// Evidence whose text contains `keyword`, in reading order (book title,
/// chapter number, viewpoint order). Absent filters match everything.
pub fn search_evidence(connection: &Connection, filter: &EvidenceFilter) -> Result<Vec<EvidenceHit>> {
    let mut statement = connection.prepare(
        "
        SELECT e.evidence_id, e.book_id, b.title, e.chapter_id, c.chapter_number, c.title,
               e.viewpoint_id, v.content, e.paragraph_id, e.paragraph_number,
               e.evidence_text, e.context_before, e.context_after, e.keywords_json, e.score
        FROM evidence e
        JOIN books b ON b.book_id = e.book_id
        JOIN chapters c ON c.chapter_id = e.chapter_id
        JOIN viewpoints v ON v.viewpoint_id = e.viewpoint_id
        WHERE (?1 IS NULL OR instr(e.evidence_text, ?1) > 0)
          AND (?2 IS NULL OR e.book_id = ?2)
          AND (?3 IS NULL OR e.chapter_id = ?3)
        ORDER BY b.title ASC, c.chapter_number ASC, v.viewpoint_order ASC
        LIMIT ?4
        ",
    )?;

    let rows = statement.query_map(
        params![
            filter.keyword.as_deref(),
            filter.book_id.as_deref(),
            filter.chapter_id.as_deref(),
            filter.limit as i64,
        ],
        |row| {
            let keywords_json: String = row.get(13)?;
            Ok((
                EvidenceHit {
                    evidence_id: row.get(0)?,
                    book_id: row.get(1)?,
                    book_title: row.get(2)?,
                    chapter_id: row.get(3)?,
                    chapter_number: row.get(4)?,
                    chapter_title: row.get(5)?,
                    viewpoint_id: row.get(6)?,
                    viewpoint: row.get(7)?,
                    paragraph_id: row.get(8)?,
                    paragraph_number: row.get(9)?,
                    evidence_text: row.get(10)?,
                    context_before: row.get(11)?,
                    context_after: row.get(12)?,
                    keywords: Vec::new(),
                    score: row.get(14)?,
                },
                keywords_json,
            ))
        },
    )?;

    let mut hits = Vec::<EvidenceHit>::new();
    for row in rows {
        let (mut hit, keywords_json) = row.context("failed to read evidence row")?;
        hit.keywords = serde_json::from_str(&keywords_json).with_context(|| {
            format!("invalid keywords_json for evidence {}", hit.evidence_id)
        })?;
        hits.push(hit);
    }

    debug!(hits = hits.len(), "evidence search complete");
    Ok(hits)
}

pub fn table_counts(connection: &Connection) -> Result<TableCounts> {
    Ok(TableCounts {
        books: query_count(connection, "SELECT COUNT(*) FROM books")?,
        chapters: query_count(connection, "SELECT COUNT(*) FROM chapters")?,
        paragraphs: query_count(connection, "SELECT COUNT(*) FROM paragraphs")?,
        viewpoints: query_count(connection, "SELECT COUNT(*) FROM viewpoints")?,
        evidence: query_count(connection, "SELECT COUNT(*) FROM evidence")?,
        evidence_linked: query_count(
            connection,
            "SELECT COUNT(*) FROM evidence WHERE paragraph_id IS NOT NULL",
        )?,
    })
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to run count query: {sql}"))
}
