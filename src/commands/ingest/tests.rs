use std::fs;

use super::*;
use crate::cli::PipelineArgs;
use crate::store::{list_books, table_counts};

fn book(title: &str, filename: &str) -> BookEntry {
    BookEntry {
        filename: filename.to_string(),
        title: title.to_string(),
        format: crate::pipeline::DocumentFormat::Txt,
        size_bytes: 0,
        sha256: String::new(),
    }
}

fn ingest_args(cache_root: &Path, strict: bool) -> IngestArgs {
    IngestArgs {
        cache_root: cache_root.to_path_buf(),
        library_dir: None,
        inventory_manifest_path: None,
        ingest_manifest_path: Some(cache_root.join("manifests").join("ingest_run.json")),
        db_path: None,
        refresh_inventory: false,
        target_books: Vec::new(),
        strict,
        pipeline: PipelineArgs {
            pipeline_config: None,
            catalog_path: None,
            max_viewpoints_per_chapter: None,
            fallback_chunk_size: None,
        },
    }
}

fn seed_library(cache_root: &Path) {
    let library = cache_root.join("library");
    fs::create_dir_all(&library).expect("library should be created");
    fs::write(
        library.join("样书.txt"),
        "第一章 引言\n这是引言内容。\n第二章 正文\n这是正文内容。",
    )
    .expect("book should be written");
    fs::write(library.join("空白.txt"), "  \n\n 12 \n").expect("book should be written");
}

#[test]
fn select_books_matches_title_filename_or_stem() {
    let books = vec![book("乡土中国", "xiangtu.txt"), book("论语", "lunyu.md")];

    assert_eq!(select_books(&books, &[]).len(), 2);
    let by_title = select_books(&books, &["论语".to_string()]);
    assert_eq!(by_title[0].filename, "lunyu.md");
    let by_stem = select_books(&books, &["xiangtu".to_string()]);
    assert_eq!(by_stem[0].title, "乡土中国");
    assert!(select_books(&books, &["孟子".to_string()]).is_empty());
}

#[test]
fn render_ingest_command_includes_pipeline_flags() {
    let mut args = ingest_args(Path::new(".cache/bookgraph"), true);
    args.ingest_manifest_path = None;
    args.target_books = vec!["论语".to_string()];
    args.pipeline.max_viewpoints_per_chapter = Some(3);
    args.pipeline.catalog_path = Some(PathBuf::from("catalog/known_books.json"));

    assert_eq!(
        render_ingest_command(&args),
        "bookgraph ingest --cache-root .cache/bookgraph --catalog-path catalog/known_books.json --strict --target-book 论语 --max-viewpoints-per-chapter 3"
    );
}

#[test]
fn run_status_reflects_failures_and_strictness() {
    let mut counts = IngestCounts::default();
    assert_eq!(run_status(&counts, true), "completed");
    counts.books_failed = 1;
    assert_eq!(run_status(&counts, false), "completed_with_warnings");
    assert_eq!(run_status(&counts, true), "failed");
}

#[test]
fn ingest_skips_books_without_content() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let cache_root = directory.path();
    seed_library(cache_root);

    run(ingest_args(cache_root, false)).expect("non-strict ingest should succeed");

    let connection = Connection::open(default_db_path(cache_root)).expect("db should open");
    let books = list_books(&connection).expect("books should load");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "样书");
    assert_eq!(table_counts(&connection).expect("counts should load").chapters, 2);

    let raw = fs::read_to_string(cache_root.join("manifests").join("ingest_run.json"))
        .expect("manifest should exist");
    let manifest: serde_json::Value = serde_json::from_str(&raw).expect("manifest should parse");
    assert_eq!(manifest["status"], "completed_with_warnings");
    assert_eq!(manifest["counts"]["books_stored"], 1);
    assert_eq!(manifest["counts"]["books_failed"], 1);
    assert_eq!(manifest["counts"]["pattern_segmentations"], 1);
    assert!(cache_root.join("manifests").join("book_inventory.json").exists());
}

#[test]
fn strict_ingest_fails_on_any_bad_book() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let cache_root = directory.path();
    seed_library(cache_root);

    let error = run(ingest_args(cache_root, true)).expect_err("strict ingest should fail");
    assert!(error.to_string().contains("strict mode"));

    let raw = fs::read_to_string(cache_root.join("manifests").join("ingest_run.json"))
        .expect("manifest should still be written");
    assert!(raw.contains("\"status\": \"failed\""));
}

#[test]
fn reingesting_replaces_the_stored_book() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let cache_root = directory.path();
    seed_library(cache_root);

    let mut args = ingest_args(cache_root, false);
    args.target_books = vec!["样书".to_string()];
    run(args.clone()).expect("first ingest should succeed");
    run(args).expect("second ingest should succeed");

    let connection = Connection::open(default_db_path(cache_root)).expect("db should open");
    let counts = table_counts(&connection).expect("counts should load");
    assert_eq!(counts.books, 1);
    assert_eq!(counts.chapters, 2);
    assert_eq!(counts.paragraphs, 2);
}

#[test]
fn same_titled_files_are_stored_as_separate_books() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let cache_root = directory.path();
    let library = cache_root.join("library");
    fs::create_dir_all(&library).expect("library should be created");
    fs::write(
        library.join("样书.txt"),
        "第一章 引言\n这是引言内容。\n第二章 正文\n这是正文内容。",
    )
    .expect("book should be written");
    fs::write(
        library.join("样书.md"),
        "第一章 开端\n这是开端内容。\n第二章 结尾\n这是结尾内容。",
    )
    .expect("book should be written");

    run(ingest_args(cache_root, true)).expect("strict ingest should succeed");

    let connection = Connection::open(default_db_path(cache_root)).expect("db should open");
    let books = list_books(&connection).expect("books should load");
    assert_eq!(books.len(), 2);
    assert_ne!(books[0].book_id, books[1].book_id);
    assert_eq!(table_counts(&connection).expect("counts should load").chapters, 4);

    let raw = fs::read_to_string(cache_root.join("manifests").join("ingest_run.json"))
        .expect("manifest should exist");
    let manifest: serde_json::Value = serde_json::from_str(&raw).expect("manifest should parse");
    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["counts"]["books_stored"], 2);
    assert_eq!(manifest["counts"]["books_replaced"], 0);
}

#[test]
fn changed_sources_are_recorded_as_warnings() {
    let directory = tempfile::tempdir().expect("tempdir should be created");
    let cache_root = directory.path();
    seed_library(cache_root);

    let mut args = ingest_args(cache_root, false);
    args.target_books = vec!["样书".to_string()];
    run(args.clone()).expect("first ingest should succeed");

    fs::write(
        cache_root.join("library").join("样书.txt"),
        "第一章 引言\n改写后的引言内容。\n第二章 正文\n改写后的正文内容。",
    )
    .expect("book should be rewritten");
    run(args).expect("second ingest should succeed");

    let raw = fs::read_to_string(cache_root.join("manifests").join("ingest_run.json"))
        .expect("manifest should exist");
    let manifest: serde_json::Value = serde_json::from_str(&raw).expect("manifest should parse");
    let warnings = manifest["warnings"]
        .as_array()
        .expect("warnings should be an array");
    assert_eq!(warnings.len(), 1);
    let warning = warnings[0].as_str().expect("warning should be a string");
    assert!(warning.starts_with("样书.txt: sha256 differs from inventory"));
    assert_eq!(manifest["counts"]["books_replaced"], 1);
}
