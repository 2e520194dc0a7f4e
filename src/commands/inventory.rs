use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{BookEntry, BookInventoryManifest};
use crate::pipeline::DocumentFormat;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let library_dir = library_dir_for(&args.cache_root, args.library_dir.as_deref());
    let manifest = build_manifest(&library_dir)?;

    if args.dry_run {
        info!(
            book_count = manifest.book_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| default_manifest_path(&args.cache_root));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(book_count = manifest.book_count, "inventory completed");

    Ok(())
}

pub fn library_dir_for(cache_root: &Path, library_dir: Option<&Path>) -> PathBuf {
    library_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cache_root.join("library"))
}

pub fn default_manifest_path(cache_root: &Path) -> PathBuf {
    cache_root.join("manifests").join("book_inventory.json")
}

pub fn build_manifest(library_dir: &Path) -> Result<BookInventoryManifest> {
    let mut book_paths = discover_books(library_dir)?;
    book_paths.sort();

    if book_paths.is_empty() {
        bail!("no books found in {}", library_dir.display());
    }

    let mut books = Vec::with_capacity(book_paths.len());
    for (path, format) in book_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;
        let title = title_from_path(&path)
            .with_context(|| format!("cannot derive a title from {}", path.display()))?;
        let size_bytes = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();

        books.push(BookEntry {
            filename,
            title,
            format,
            size_bytes,
            sha256: sha256_file(&path)?,
        });
    }

    books.sort_by(|a, b| a.title.cmp(&b.title).then(a.filename.cmp(&b.filename)));

    Ok(BookInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: library_dir.display().to_string(),
        book_count: books.len(),
        books,
    })
}

/// The file stem, trimmed; `None` for stems that are empty or not UTF-8.
pub fn title_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .map(ToOwned::to_owned)
}

pub fn format_for_path(path: &Path) -> Option<DocumentFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension)
}

fn discover_books(library_dir: &Path) -> Result<Vec<(PathBuf, DocumentFormat)>> {
    let mut books = Vec::new();

    let entries = fs::read_dir(library_dir)
        .with_context(|| format!("failed to read {}", library_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", library_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        if let Some(format) = format_for_path(&path) {
            books.push((path, format));
        }
    }

    Ok(books)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_manifest_lists_supported_books_by_title() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        fs::write(directory.path().join("论语.txt"), "学而第一").expect("write should succeed");
        fs::write(directory.path().join("乡土中国.md"), "# 乡土本色").expect("write should succeed");
        fs::write(directory.path().join("cover.jpg"), [0_u8, 1, 2]).expect("write should succeed");

        let manifest = build_manifest(directory.path()).expect("manifest should build");
        assert_eq!(manifest.book_count, 2);
        let titles = manifest
            .books
            .iter()
            .map(|book| book.title.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(titles, vec!["乡土中国", "论语"]);
        assert_eq!(manifest.books[0].format, DocumentFormat::Markdown);
        assert_eq!(manifest.books[1].size_bytes, "学而第一".len() as u64);
    }

    #[test]
    fn build_manifest_keeps_every_format_of_a_title() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        fs::write(directory.path().join("样书.txt"), "正文").expect("write should succeed");
        fs::write(directory.path().join("样书.md"), "正文").expect("write should succeed");

        let manifest = build_manifest(directory.path()).expect("manifest should build");
        let entries = manifest
            .books
            .iter()
            .map(|book| (book.filename.as_str(), book.format))
            .collect::<Vec<(&str, DocumentFormat)>>();
        assert_eq!(
            entries,
            vec![("样书.md", DocumentFormat::Markdown), ("样书.txt", DocumentFormat::Txt)]
        );
    }

    #[test]
    fn build_manifest_rejects_empty_libraries() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let error = build_manifest(directory.path()).expect_err("empty library should fail");
        assert!(error.to_string().contains("no books found"));
    }

    #[test]
    fn format_for_path_is_case_insensitive() {
        assert_eq!(format_for_path(Path::new("a/B.HTM")), Some(DocumentFormat::Html));
        assert_eq!(format_for_path(Path::new("notes.pdf")), None);
        assert_eq!(title_from_path(Path::new("dir/  .txt")), None);
    }
}
