use std::fmt::Debug;

use tracing::debug;
use uuid::Uuid;

use super::config::EvidenceConfig;
use super::types::{Evidence, Paragraph, Viewpoint};
use crate::text::char_prefix;

/// Provenance score attached to each evidence record. The baseline is a
/// constant; a relevance model can replace it without touching the linker.
pub trait EvidenceScorer: Debug + Send + Sync {
    fn score(&self, viewpoint: &Viewpoint, paragraph: Option<&Paragraph>) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantScore(pub f64);

impl EvidenceScorer for ConstantScore {
    fn score(&self, _viewpoint: &Viewpoint, _paragraph: Option<&Paragraph>) -> f64 {
        self.0
    }
}

#[derive(Debug)]
pub struct EvidenceLinker {
    probe_chars: usize,
    scorer: Box<dyn EvidenceScorer>,
}

impl EvidenceLinker {
    pub fn new(config: &EvidenceConfig) -> Self {
        Self::with_scorer(config.probe_chars, Box::new(ConstantScore(config.baseline_score)))
    }

    pub fn with_scorer(probe_chars: usize, scorer: Box<dyn EvidenceScorer>) -> Self {
        Self {
            probe_chars,
            scorer,
        }
    }

    /// One evidence record per viewpoint, in viewpoint order. Unmatched
    /// viewpoints keep their own text and carry no paragraph or context.
    pub fn link(&self, viewpoints: &[Viewpoint], paragraphs: &[Paragraph]) -> Vec<Evidence> {
        viewpoints
            .iter()
            .map(|viewpoint| self.link_one(viewpoint, paragraphs))
            .collect()
    }

    fn link_one(&self, viewpoint: &Viewpoint, paragraphs: &[Paragraph]) -> Evidence {
        let snippet = if viewpoint.original_text.is_empty() {
            viewpoint.content.as_str()
        } else {
            viewpoint.original_text.as_str()
        };
        let match_index = find_paragraph(snippet, paragraphs, self.probe_chars);
        let matched = match_index.map(|index| &paragraphs[index]);

        if matched.is_none() {
            debug!(viewpoint_id = %viewpoint.viewpoint_id, "no paragraph matched viewpoint");
        }

        let context_before = match_index
            .and_then(|index| index.checked_sub(1))
            .map(|index| paragraphs[index].content.clone());
        let context_after = match_index
            .and_then(|index| paragraphs.get(index + 1))
            .map(|paragraph| paragraph.content.clone());

        Evidence {
            evidence_id: Uuid::new_v4(),
            chapter_id: viewpoint.chapter_id,
            viewpoint_id: viewpoint.viewpoint_id,
            paragraph_id: matched.map(|paragraph| paragraph.paragraph_id),
            paragraph_number: matched.map(|paragraph| paragraph.paragraph_number),
            evidence_text: snippet.to_string(),
            context_before,
            context_after,
            keywords: viewpoint.keywords.clone(),
            score: self.scorer.score(viewpoint, matched),
        }
    }
}

/// Index of the first paragraph containing the snippet's leading chars.
pub fn find_paragraph(snippet: &str, paragraphs: &[Paragraph], probe_chars: usize) -> Option<usize> {
    let probe = char_prefix(snippet.trim(), probe_chars);
    if probe.is_empty() {
        return None;
    }

    paragraphs
        .iter()
        .position(|paragraph| paragraph.content.contains(probe))
}
