use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ordered chapter-title lists for previously catalogued works, used as a
/// high-confidence segmentation shortcut.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceCatalog {
    #[serde(default = "default_catalog_version")]
    pub catalog_version: u32,
    #[serde(default)]
    pub books: Vec<KnownBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownBook {
    pub name: String,
    pub titles: Vec<String>,
}

const BUNDLED_CATALOG: &str = include_str!("../catalog/known_books.json");

fn default_catalog_version() -> u32 {
    1
}

impl ReferenceCatalog {
    #[cfg(test)]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read reference catalog {}", path.display()))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("failed to parse reference catalog {}", path.display()))?;

        info!(
            path = %path.display(),
            books = catalog.books.len(),
            "loaded reference catalog"
        );
        Ok(catalog)
    }

    /// The catalog compiled into the binary from `catalog/known_books.json`.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG.as_bytes()).context("failed to parse bundled reference catalog")
    }

    /// A missing catalog file falls back to the bundled one; point the path at
    /// a catalog with no books to turn known-book matching off.
    pub fn load_or_bundled(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let catalog = Self::bundled()?;
        info!(
            path = %path.display(),
            books = catalog.books.len(),
            "reference catalog missing; using bundled catalog"
        );
        Ok(catalog)
    }

    fn from_json(raw: &[u8]) -> Result<Self> {
        let catalog: ReferenceCatalog = serde_json::from_slice(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for book in &self.books {
            if book.name.trim().is_empty() {
                bail!("reference catalog contains a book with an empty name");
            }
            if book.titles.iter().all(|title| title.trim().is_empty()) {
                bail!("reference catalog book '{}' has no titles", book.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn bundled_catalog_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("catalog")
            .join("known_books.json");
        let catalog = ReferenceCatalog::load(&path).expect("bundled catalog should load");

        assert_eq!(catalog.catalog_version, 1);
        let names = catalog
            .books
            .iter()
            .map(|book| book.name.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(names, vec!["乡土中国", "论语"]);
        assert_eq!(catalog.books[0].titles.len(), 14);
        assert_eq!(catalog.books[1].titles.len(), 20);
    }

    #[test]
    fn missing_catalog_falls_back_to_bundled() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let catalog = ReferenceCatalog::load_or_bundled(&directory.path().join("absent.json"))
            .expect("missing catalog should not fail");

        assert_eq!(catalog.books.len(), 2);
        assert_eq!(catalog.books[1].name, "论语");
    }

    #[test]
    fn empty_catalog_file_disables_known_books() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let path = directory.path().join("catalog.json");
        fs::write(&path, r#"{ "catalog_version": 1, "books": [] }"#)
            .expect("catalog should be written");

        let catalog = ReferenceCatalog::load_or_bundled(&path).expect("catalog should load");
        assert!(catalog.books.is_empty());
    }

    #[test]
    fn books_without_titles_are_rejected() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let path = directory.path().join("catalog.json");
        fs::write(&path, r#"{ "books": [ { "name": "空书", "titles": [" "] } ] }"#)
            .expect("catalog should be written");

        let error = ReferenceCatalog::load(&path).expect_err("empty titles should be rejected");
        assert!(format!("{error:#}").contains("has no titles"));
    }
}
