use anyhow::{Result, bail};
use tracing::info;
use uuid::Uuid;

use super::config::PipelineConfig;
use super::evidence::EvidenceLinker;
use super::normalize::Normalizer;
use super::paragraphs::build_paragraphs;
use super::segment::ChapterSegmenter;
use super::types::{Chapter, Document, DocumentSource, Evidence, ParseStats, ParsedDocument};
use super::viewpoints::ViewpointExtractor;
use crate::catalog::ReferenceCatalog;
use crate::text::{char_len, count_words, detect_language, sha256_hex};

/// Normalize, segment, split, extract, link. Holds compiled rules only; each
/// `parse` call allocates fresh output and shares nothing with other calls.
#[derive(Debug)]
pub struct DocumentPipeline {
    normalizer: Normalizer,
    segmenter: ChapterSegmenter,
    extractor: ViewpointExtractor,
    linker: EvidenceLinker,
}

impl DocumentPipeline {
    pub fn new(config: PipelineConfig, catalog: ReferenceCatalog) -> Result<Self> {
        Ok(Self {
            normalizer: Normalizer::new(config.normalizer)?,
            segmenter: ChapterSegmenter::new(config.segmenter, catalog)?,
            extractor: ViewpointExtractor::new(config.viewpoints),
            linker: EvidenceLinker::new(&config.evidence),
        })
    }

    pub fn parse(&self, source: &DocumentSource) -> ParsedDocument {
        let raw_text = source.decoded_text();
        let (text, report) = self.normalizer.normalize_with_report(&raw_text);
        let segmentation = self.segmenter.segment(&text);

        let mut chapters = Vec::<Chapter>::with_capacity(segmentation.chapters.len());
        let mut evidence = Vec::<Evidence>::new();
        for (index, draft) in segmentation.chapters.into_iter().enumerate() {
            let chapter_id = Uuid::new_v4();
            let paragraphs = build_paragraphs(chapter_id, &draft.content);
            let viewpoints = self.extractor.extract(chapter_id, &draft.content);
            evidence.extend(self.linker.link(&viewpoints, &paragraphs));

            chapters.push(Chapter {
                chapter_id,
                chapter_number: index + 1,
                title: draft.title,
                content: draft.content,
                paragraphs,
                viewpoints,
            });
        }

        let evidence_linked = evidence
            .iter()
            .filter(|record| record.paragraph_id.is_some())
            .count();
        let stats = ParseStats {
            raw_chars: char_len(&raw_text),
            cleaned_chars: char_len(&text),
            raw_lines: non_blank_line_count(&raw_text),
            cleaned_lines: non_blank_line_count(&text),
            noise_lines_removed: report.noise_lines_removed,
            repeated_lines_removed: report.repeated_lines_removed,
            chapters_detected: chapters.len(),
            paragraphs_detected: chapters.iter().map(|chapter| chapter.paragraphs.len()).sum(),
            viewpoints_extracted: chapters.iter().map(|chapter| chapter.viewpoints.len()).sum(),
            evidence_linked,
            evidence_unlinked: evidence.len() - evidence_linked,
            chapter_detection: segmentation.stats,
        };

        let document = Document {
            document_id: Uuid::new_v4(),
            title: source.title.clone(),
            author: source.author.clone(),
            format: source.format,
            source_sha256: sha256_hex(&source.bytes),
            language: detect_language(&text).to_string(),
            total_words: count_words(&text),
        };

        info!(
            title = %document.title,
            strategy = stats.chapter_detection.strategy.as_str(),
            chapters = stats.chapters_detected,
            paragraphs = stats.paragraphs_detected,
            viewpoints = stats.viewpoints_extracted,
            evidence_linked = stats.evidence_linked,
            "parsed document"
        );

        ParsedDocument {
            document,
            chapters,
            evidence,
            stats,
        }
    }
}

/// Zero chapters means the source had no extractable text; callers treat
/// that as a per-document failure rather than storing an empty book.
pub fn ensure_extractable(parsed: &ParsedDocument) -> Result<()> {
    if !parsed.has_content() {
        bail!(
            "document '{}' had no extractable content",
            parsed.document.title
        );
    }
    Ok(())
}

fn non_blank_line_count(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}
