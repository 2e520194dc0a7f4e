use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::ReferenceCatalog;
use crate::cli::PipelineArgs;
use crate::pipeline::{DocumentPipeline, DocumentSource, PipelineConfig};

pub mod ingest;
pub mod inventory;
pub mod parse;
pub mod query;
pub mod status;
pub mod validate;

pub fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join("bookgraph.sqlite")
}

pub fn default_catalog_path(cache_root: &Path) -> PathBuf {
    cache_root.join("catalog").join("known_books.json")
}

/// Config file first, then individual flag overrides on top.
pub fn resolve_pipeline_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.pipeline_config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(limit) = args.max_viewpoints_per_chapter {
        config.viewpoints.max_per_chapter = limit;
    }
    if let Some(chunk_size) = args.fallback_chunk_size {
        config.segmenter.fallback_chunk_size = chunk_size;
    }

    Ok(config)
}

pub fn build_pipeline(cache_root: &Path, args: &PipelineArgs) -> Result<(DocumentPipeline, PathBuf)> {
    let config = resolve_pipeline_config(args)?;
    let catalog_path = args
        .catalog_path
        .clone()
        .unwrap_or_else(|| default_catalog_path(cache_root));
    let catalog = ReferenceCatalog::load_or_bundled(&catalog_path)?;

    info!(
        catalog = %catalog_path.display(),
        known_books = catalog.books.len(),
        max_viewpoints = config.viewpoints.max_per_chapter,
        fallback_chunk_size = config.segmenter.fallback_chunk_size,
        "pipeline configured"
    );

    let pipeline = DocumentPipeline::new(config, catalog)?;
    Ok((pipeline, catalog_path))
}

pub fn read_document_source(path: &Path, title: String, author: Option<String>) -> Result<DocumentSource> {
    let format = inventory::format_for_path(path)
        .with_context(|| format!("unsupported book format: {}", path.display()))?;
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    Ok(DocumentSource {
        title,
        author,
        format,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_pipeline_config_file() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let config_path = directory.path().join("pipeline.json");
        fs::write(
            &config_path,
            r#"{ "viewpoints": { "max_per_chapter": 8 }, "segmenter": { "fallback_chunk_size": 4 } }"#,
        )
        .expect("config should be written");

        let from_file = resolve_pipeline_config(&PipelineArgs {
            pipeline_config: Some(config_path.clone()),
            catalog_path: None,
            max_viewpoints_per_chapter: None,
            fallback_chunk_size: None,
        })
        .expect("config should load");
        assert_eq!(from_file.viewpoints.max_per_chapter, 8);
        assert_eq!(from_file.viewpoints.max_keywords, 5);
        assert_eq!(from_file.segmenter.fallback_chunk_size, 4);
        assert_eq!(from_file.segmenter.boundary_min_score, 4);

        let overridden = resolve_pipeline_config(&PipelineArgs {
            pipeline_config: Some(config_path),
            catalog_path: None,
            max_viewpoints_per_chapter: Some(2),
            fallback_chunk_size: None,
        })
        .expect("config should load");
        assert_eq!(overridden.viewpoints.max_per_chapter, 2);
        assert_eq!(overridden.segmenter.fallback_chunk_size, 4);
    }

    #[test]
    fn missing_catalog_path_uses_bundled_known_books() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let (pipeline, catalog_path) = build_pipeline(
            directory.path(),
            &PipelineArgs {
                pipeline_config: None,
                catalog_path: None,
                max_viewpoints_per_chapter: None,
                fallback_chunk_size: None,
            },
        )
        .expect("pipeline should build");
        assert!(!catalog_path.exists());

        let text = ["乡土本色", "文字下乡", "再论文字下乡", "差序格局", "维系着私人的道德", "家族", "男女有别"]
            .iter()
            .map(|title| format!("{title}\n\n关于{title}的正文写得足够长，不会被误认为是章节标题，也不会被当成页眉。"))
            .collect::<Vec<String>>()
            .join("\n\n");
        let parsed = pipeline.parse(&DocumentSource {
            title: "乡土中国".to_string(),
            author: None,
            format: crate::pipeline::DocumentFormat::Txt,
            bytes: text.into_bytes(),
        });

        let detection = &parsed.stats.chapter_detection;
        assert_eq!(detection.strategy, crate::pipeline::SegmentStrategyKind::KnownBook);
        assert_eq!(detection.known_book_hit.as_deref(), Some("乡土中国"));
        assert_eq!(parsed.chapters.len(), 7);
    }

    #[test]
    fn read_document_source_rejects_unknown_formats() {
        let directory = tempfile::tempdir().expect("tempdir should be created");
        let path = directory.path().join("scan.pdf");
        fs::write(&path, b"%PDF").expect("file should be written");

        let error = read_document_source(&path, "scan".to_string(), None)
            .expect_err("pdf should be rejected");
        assert!(error.to_string().contains("unsupported book format"));
    }
}
