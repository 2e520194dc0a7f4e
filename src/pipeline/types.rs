use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Txt,
    Markdown,
    Html,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Txt => "txt",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Html => "html",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(DocumentFormat::Txt),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "html" | "htm" | "xhtml" => Some(DocumentFormat::Html),
            _ => None,
        }
    }
}

/// Raw input handed over by the format-specific extraction layer.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub title: String,
    pub author: Option<String>,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl DocumentSource {
    pub fn decoded_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub document_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub format: DocumentFormat,
    pub source_sha256: String,
    pub language: String,
    pub total_words: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub chapter_id: Uuid,
    pub chapter_number: usize,
    pub title: String,
    pub content: String,
    pub paragraphs: Vec<Paragraph>,
    pub viewpoints: Vec<Viewpoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paragraph {
    pub paragraph_id: Uuid,
    pub chapter_id: Uuid,
    pub paragraph_number: usize,
    pub content: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Viewpoint {
    pub viewpoint_id: Uuid,
    pub chapter_id: Uuid,
    pub content: String,
    pub original_text: String,
    pub context: String,
    pub keywords: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub evidence_id: Uuid,
    pub chapter_id: Uuid,
    pub viewpoint_id: Uuid,
    pub paragraph_id: Option<Uuid>,
    pub paragraph_number: Option<usize>,
    pub evidence_text: String,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    pub keywords: Vec<String>,
    pub score: f64,
}

/// A chapter before paragraphs and viewpoints are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStrategyKind {
    KnownBook,
    Pattern,
    FallbackParagraph,
}

impl SegmentStrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStrategyKind::KnownBook => "known_book",
            SegmentStrategyKind::Pattern => "pattern",
            SegmentStrategyKind::FallbackParagraph => "fallback_paragraph",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentStats {
    pub strategy: SegmentStrategyKind,
    pub boundaries_found: usize,
    pub known_book_hit: Option<String>,
    pub fallback: bool,
    pub major_heading_merge: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseStats {
    pub raw_chars: usize,
    pub cleaned_chars: usize,
    pub raw_lines: usize,
    pub cleaned_lines: usize,
    pub noise_lines_removed: usize,
    pub repeated_lines_removed: usize,
    pub chapters_detected: usize,
    pub paragraphs_detected: usize,
    pub viewpoints_extracted: usize,
    pub evidence_linked: usize,
    pub evidence_unlinked: usize,
    pub chapter_detection: SegmentStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub document: Document,
    pub chapters: Vec<Chapter>,
    pub evidence: Vec<Evidence>,
    pub stats: ParseStats,
}

impl ParsedDocument {
    pub fn has_content(&self) -> bool {
        !self.chapters.is_empty()
    }

    pub fn paragraph_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|chapter| chapter.paragraphs.len())
            .sum()
    }

    pub fn viewpoint_count(&self) -> usize {
        self.chapters
            .iter()
            .map(|chapter| chapter.viewpoints.len())
            .sum()
    }
}
