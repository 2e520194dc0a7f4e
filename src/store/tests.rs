use super::read::TableCounts;
use super::*;
use crate::catalog::ReferenceCatalog;
use crate::pipeline::{DocumentFormat, DocumentPipeline, DocumentSource, PipelineConfig};

const SAMPLE: &str = "第一章 引言\n这是引言内容。正义是最高的美德。\n第二章 正文\n这是正文内容。";

fn parse(title: &str, text: &str) -> ParsedDocument {
    let pipeline = DocumentPipeline::new(PipelineConfig::default(), ReferenceCatalog::empty())
        .expect("pipeline should build");
    pipeline.parse(&DocumentSource {
        title: title.to_string(),
        author: Some("佚名".to_string()),
        format: DocumentFormat::Txt,
        bytes: text.as_bytes().to_vec(),
    })
}

fn memory_store() -> Connection {
    let connection = Connection::open_in_memory().expect("in-memory DB should open");
    ensure_schema(&connection).expect("schema should apply");
    connection
}

#[test]
fn store_document_writes_the_full_graph() {
    let mut connection = memory_store();
    let parsed = parse("样书", SAMPLE);

    let counts = store_document(&mut connection, "book-a", "library/样书.txt", &parsed)
        .expect("store should succeed");
    assert_eq!(counts.chapters, 2);
    assert_eq!(counts.paragraphs, 2);
    assert_eq!(counts.viewpoints, 3);
    assert_eq!(counts.evidence, 3);
    assert!(!counts.replaced_previous);

    let totals = table_counts(&connection).expect("counts should load");
    assert_eq!(totals.books, 1);
    assert_eq!(totals.chapters, 2);
    assert_eq!(totals.evidence, 3);
    assert_eq!(totals.evidence_linked, 3);

    let books = list_books(&connection).expect("books should load");
    assert_eq!(books[0].title, "样书");
    assert_eq!(books[0].author.as_deref(), Some("佚名"));
    assert_eq!(books[0].segment_strategy.as_deref(), Some("pattern"));
}

#[test]
fn storing_again_replaces_previous_rows() {
    let mut connection = memory_store();
    store_document(&mut connection, "book-a", "a.txt", &parse("样书", SAMPLE))
        .expect("first store should succeed");
    let counts = store_document(&mut connection, "book-a", "a.txt", &parse("样书", SAMPLE))
        .expect("second store should succeed");

    assert!(counts.replaced_previous);
    let totals = table_counts(&connection).expect("counts should load");
    assert_eq!(totals.books, 1);
    assert_eq!(totals.chapters, 2);
    assert_eq!(totals.viewpoints, 3);
}

#[test]
fn search_evidence_filters_by_keyword_book_and_limit() {
    let mut connection = memory_store();
    store_document(&mut connection, "book-a", "a.txt", &parse("甲书", SAMPLE))
        .expect("store should succeed");
    store_document(&mut connection, "book-b", "b.txt", &parse("乙书", SAMPLE))
        .expect("store should succeed");

    let all = search_evidence(
        &connection,
        &EvidenceFilter {
            limit: 50,
            ..EvidenceFilter::default()
        },
    )
    .expect("search should succeed");
    assert_eq!(all.len(), 6);
    assert_eq!(all[0].book_title, "乙书");

    let justice = search_evidence(
        &connection,
        &EvidenceFilter {
            keyword: Some("正义".to_string()),
            book_id: Some("book-a".to_string()),
            limit: 50,
            ..EvidenceFilter::default()
        },
    )
    .expect("search should succeed");
    assert_eq!(justice.len(), 1);
    assert_eq!(justice[0].chapter_number, 1);
    assert_eq!(justice[0].paragraph_number, Some(1));
    assert!(justice[0].keywords.contains(&"正义".to_string()));

    let limited = search_evidence(
        &connection,
        &EvidenceFilter {
            limit: 2,
            ..EvidenceFilter::default()
        },
    )
    .expect("search should succeed");
    assert_eq!(limited.len(), 2);
}

#[test]
fn chapter_paragraphs_come_back_in_order() {
    let mut connection = memory_store();
    let parsed = parse("样书", "第一章 开端\n第一段文字。\n第二段文字。\n第三段文字。");
    store_document(&mut connection, "book-a", "a.txt", &parsed).expect("store should succeed");

    let chapter_id = parsed.chapters[0].chapter_id.to_string();
    let paragraphs = chapter_paragraphs(&connection, &chapter_id).expect("paragraphs should load");
    let numbers = paragraphs
        .iter()
        .map(|paragraph| paragraph.paragraph_number)
        .collect::<Vec<i64>>();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(paragraphs[1].content, "第二段文字。");
}

#[test]
fn open_store_creates_schema_on_disk() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let db_path = directory.path().join("books.sqlite");

    let connection = open_store(&db_path).expect("store should open");
    ensure_schema(&connection).expect("schema should reapply cleanly");
    let version: String = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("schema version should be recorded");
    assert_eq!(version, DB_SCHEMA_VERSION);
    assert_eq!(table_counts(&connection).expect("counts should load"), TableCounts::default());
}

#[test]
fn book_ids_are_stable_per_filename() {
    assert_eq!(book_id_for("乡土中国.txt"), book_id_for("  乡土中国.txt "));
    assert_ne!(book_id_for("乡土中国.txt"), book_id_for("乡土中国.md"));
    assert!(book_id_for("论语.txt").starts_with("book-"));
}
