use super::run::build_report;
use super::*;
use crate::catalog::ReferenceCatalog;
use crate::pipeline::{DocumentFormat, DocumentPipeline, DocumentSource, PipelineConfig};
use crate::store::{ensure_schema, store_document};

fn stored_connection() -> Connection {
    let mut connection = Connection::open_in_memory().expect("in-memory DB should open");
    ensure_schema(&connection).expect("schema should apply");

    let pipeline = DocumentPipeline::new(PipelineConfig::default(), ReferenceCatalog::empty())
        .expect("pipeline should build");
    let parsed = pipeline.parse(&DocumentSource {
        title: "样书".to_string(),
        author: None,
        format: DocumentFormat::Txt,
        bytes: "第一章 引言\n引言第一段。\n引言第二段。\n引言第三段。\n第二章 正文\n这是正文内容。"
            .as_bytes()
            .to_vec(),
    });
    store_document(&mut connection, "book-a", "a.txt", &parsed).expect("store should succeed");
    connection
}

fn violations(connection: &Connection, name: &str) -> i64 {
    collect_structural_invariants(connection)
        .expect("checks should run")
        .into_iter()
        .find(|check| check.name == name)
        .map(|check| check.violations)
        .expect("check should exist")
}

#[test]
fn freshly_stored_books_pass_every_check() {
    let connection = stored_connection();
    let report = build_report(&connection, ":memory:").expect("report should build");

    assert_eq!(report.status, "pass");
    assert_eq!(report.violations_total, 0);
    assert!(report.checks.iter().all(InvariantCheck::passed));
}

#[test]
fn numbering_gaps_are_reported() {
    let connection = stored_connection();
    connection
        .execute(
            "UPDATE paragraphs SET paragraph_number = 7 WHERE paragraph_number = 2",
            [],
        )
        .expect("update should succeed");

    assert_eq!(violations(&connection, "paragraph_numbering_contiguous"), 1);
    assert!(violations(&connection, "evidence_paragraph_in_chapter") > 0);
}

#[test]
fn dangling_viewpoints_are_reported() {
    let connection = stored_connection();
    // Databases written without foreign key enforcement can hold dangling rows.
    connection
        .pragma_update(None, "foreign_keys", "OFF")
        .expect("foreign keys should switch off");
    connection
        .execute(
            "UPDATE viewpoints SET chapter_id = 'missing' WHERE viewpoint_order = 1",
            [],
        )
        .expect("update should succeed");

    assert_eq!(violations(&connection, "viewpoints_reference_chapters"), 2);
    assert_eq!(violations(&connection, "evidence_references_viewpoints"), 2);
}

#[test]
fn context_on_unlinked_evidence_is_reported() {
    let connection = stored_connection();
    connection
        .execute(
            "UPDATE evidence SET paragraph_id = NULL, paragraph_number = NULL",
            [],
        )
        .expect("update should succeed");

    let report = build_report(&connection, ":memory:").expect("report should build");
    assert_eq!(report.status, "fail");
    assert!(violations(&connection, "unlinked_evidence_has_no_context") > 0);
}
