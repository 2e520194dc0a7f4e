use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use super::config::SegmenterConfig;
use super::paragraphs::split_paragraphs;
use super::segment_rules::SegmentRules;
use super::types::{ChapterDraft, SegmentStats, SegmentStrategyKind};
use crate::catalog::{KnownBook, ReferenceCatalog};
use crate::text::char_len;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub line_index: usize,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub chapters: Vec<ChapterDraft>,
    pub stats: SegmentStats,
}

/// One way of cutting normalized text into chapters. Returning `None` hands
/// the text to the next strategy in the chain.
pub trait SegmentStrategy: Debug + Send + Sync {
    fn kind(&self) -> SegmentStrategyKind;
    fn try_segment(&self, text: &str) -> Option<Segmentation>;
}

#[derive(Debug)]
pub struct ChapterSegmenter {
    strategies: Vec<Box<dyn SegmentStrategy>>,
}

impl ChapterSegmenter {
    pub fn new(config: SegmenterConfig, catalog: ReferenceCatalog) -> Result<Self> {
        let rules = Arc::new(SegmentRules::new(config.major_heading_max_chars)?);
        let config = Arc::new(config);

        Ok(Self::with_strategies(vec![
            Box::new(KnownBookStrategy {
                books: catalog.books,
                rules: Arc::clone(&rules),
                config: Arc::clone(&config),
            }),
            Box::new(HeuristicPatternStrategy::new(rules, Arc::clone(&config))),
            Box::new(FixedChunkStrategy { config }),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn SegmentStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn segment(&self, text: &str) -> Segmentation {
        for strategy in &self.strategies {
            if let Some(segmentation) = strategy.try_segment(text) {
                info!(
                    strategy = strategy.kind().as_str(),
                    boundaries = segmentation.stats.boundaries_found,
                    chapters = segmentation.chapters.len(),
                    known_book = segmentation.stats.known_book_hit.as_deref().unwrap_or(""),
                    "segmented chapters"
                );
                return segmentation;
            }
            debug!(strategy = strategy.kind().as_str(), "segmentation strategy declined");
        }

        Segmentation {
            chapters: Vec::new(),
            stats: empty_fallback_stats(),
        }
    }
}

fn empty_fallback_stats() -> SegmentStats {
    SegmentStats {
        strategy: SegmentStrategyKind::FallbackParagraph,
        boundaries_found: 0,
        known_book_hit: None,
        fallback: true,
        major_heading_merge: false,
    }
}

#[derive(Debug)]
pub struct KnownBookStrategy {
    books: Vec<KnownBook>,
    rules: Arc<SegmentRules>,
    config: Arc<SegmenterConfig>,
}

impl KnownBookStrategy {
    fn match_book(&self, book: &KnownBook, lines: &[&str]) -> Option<Vec<Boundary>> {
        let targets = book
            .titles
            .iter()
            .map(|title| (self.rules.normalize_known_title(title), title.trim()))
            .filter(|(normalized, _)| !normalized.is_empty())
            .collect::<Vec<(String, &str)>>();
        if targets.is_empty() {
            return None;
        }

        // A table of contents repeats every title ahead of the text, so each
        // title keeps only its last occurrence.
        let mut last_seen = HashMap::<&str, usize>::new();
        for (line_index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let normalized_line = self.rules.normalize_known_title(line);
            if normalized_line.is_empty() {
                continue;
            }

            if let Some(title) = self.find_title(&normalized_line, &targets) {
                last_seen.insert(title, line_index);
            }
        }

        let mut boundaries = last_seen
            .iter()
            .map(|(title, line_index)| Boundary {
                line_index: *line_index,
                title: title.to_string(),
            })
            .collect::<Vec<Boundary>>();
        boundaries.sort_by_key(|boundary| boundary.line_index);

        let required = self.required_hits(targets.len());
        debug!(
            book = %book.name,
            titles_found = boundaries.len(),
            required,
            "known-book match attempt"
        );
        if boundaries.len() >= required {
            Some(boundaries)
        } else {
            None
        }
    }

    /// Exact match first, then the longest title the line starts with when
    /// only a short index follows ("学而第一").
    fn find_title<'a>(&self, normalized_line: &str, targets: &[(String, &'a str)]) -> Option<&'a str> {
        if let Some((_, title)) = targets
            .iter()
            .find(|(normalized, _)| normalized == normalized_line)
        {
            return Some(*title);
        }

        let line_len = char_len(normalized_line);
        targets
            .iter()
            .filter(|(normalized, _)| {
                normalized_line.starts_with(normalized.as_str())
                    && line_len <= char_len(normalized) + self.config.known_book_suffix_slack
            })
            .max_by_key(|(normalized, _)| char_len(normalized))
            .map(|(_, title)| *title)
    }

    fn required_hits(&self, title_count: usize) -> usize {
        let by_ratio = (title_count as f64 * self.config.known_book_min_ratio).ceil() as usize;
        by_ratio
            .max(self.config.known_book_min_hits)
            .min(title_count)
    }
}

impl SegmentStrategy for KnownBookStrategy {
    fn kind(&self) -> SegmentStrategyKind {
        SegmentStrategyKind::KnownBook
    }

    fn try_segment(&self, text: &str) -> Option<Segmentation> {
        let lines = text.split('\n').map(str::trim).collect::<Vec<&str>>();

        for book in &self.books {
            let Some(boundaries) = self.match_book(book, &lines) else {
                continue;
            };

            let (chapters, merged) = chapters_from_boundaries(&lines, &boundaries, &self.rules);
            if chapters.is_empty() {
                continue;
            }

            info!(book = %book.name, titles = boundaries.len(), "matched known book");
            return Some(Segmentation {
                chapters,
                stats: SegmentStats {
                    strategy: SegmentStrategyKind::KnownBook,
                    boundaries_found: boundaries.len(),
                    known_book_hit: Some(book.name.clone()),
                    fallback: false,
                    major_heading_merge: merged,
                },
            });
        }

        None
    }
}

#[derive(Debug)]
pub struct HeuristicPatternStrategy {
    rules: Arc<SegmentRules>,
    config: Arc<SegmenterConfig>,
}

impl HeuristicPatternStrategy {
    pub fn new(rules: Arc<SegmentRules>, config: Arc<SegmenterConfig>) -> Self {
        Self { rules, config }
    }

    pub fn score_line(&self, lines: &[&str], index: usize) -> u32 {
        let line = lines[index];
        let config = &self.config;
        let mut score = 0;

        let length = char_len(line);
        if (1..=config.short_line_chars).contains(&length) {
            score += config.short_line_score;
        } else if length <= config.medium_line_chars {
            score += config.medium_line_score;
        }

        if self.rules.matches_title_pattern(line) {
            score += config.title_pattern_score;
        }
        if self.rules.has_structural_keyword(line) {
            score += config.structural_keyword_score;
        }

        let previous_blank = index == 0 || lines[index - 1].is_empty();
        let next_blank = lines.get(index + 1).is_none_or(|next| next.is_empty());
        if previous_blank {
            score += config.blank_neighbor_score;
        }
        if next_blank {
            score += config.blank_neighbor_score;
        }

        score
    }

    fn find_boundaries(&self, lines: &[&str]) -> Vec<Boundary> {
        (0..lines.len())
            .filter(|index| !self.rules.is_noise_line(lines[*index]))
            .filter(|index| self.score_line(lines, *index) >= self.config.boundary_min_score)
            .map(|line_index| Boundary {
                line_index,
                title: self.rules.display_title(lines[line_index]),
            })
            .collect()
    }
}

impl SegmentStrategy for HeuristicPatternStrategy {
    fn kind(&self) -> SegmentStrategyKind {
        SegmentStrategyKind::Pattern
    }

    fn try_segment(&self, text: &str) -> Option<Segmentation> {
        let lines = text.split('\n').map(str::trim).collect::<Vec<&str>>();
        let boundaries = self.find_boundaries(&lines);
        if boundaries.is_empty() {
            return None;
        }

        let (chapters, merged) = chapters_from_boundaries(&lines, &boundaries, &self.rules);
        if chapters.is_empty() {
            return None;
        }

        Some(Segmentation {
            chapters,
            stats: SegmentStats {
                strategy: SegmentStrategyKind::Pattern,
                boundaries_found: boundaries.len(),
                known_book_hit: None,
                fallback: false,
                major_heading_merge: merged,
            },
        })
    }
}

/// Last resort: fixed-size groups of paragraphs. Always answers, even with
/// zero chapters for content-free text.
#[derive(Debug)]
pub struct FixedChunkStrategy {
    config: Arc<SegmenterConfig>,
}

impl SegmentStrategy for FixedChunkStrategy {
    fn kind(&self) -> SegmentStrategyKind {
        SegmentStrategyKind::FallbackParagraph
    }

    fn try_segment(&self, text: &str) -> Option<Segmentation> {
        let paragraphs = split_paragraphs(text);
        let chunk_size = self.config.fallback_chunk_size.max(1);

        let chapters = paragraphs
            .chunks(chunk_size)
            .enumerate()
            .map(|(index, chunk)| ChapterDraft {
                title: format!("{} {}", self.config.fallback_title_prefix, index + 1),
                content: chunk.join("\n\n"),
            })
            .collect::<Vec<ChapterDraft>>();

        Some(Segmentation {
            chapters,
            stats: empty_fallback_stats(),
        })
    }
}

/// Cuts the text between consecutive boundaries, then folds minor headings
/// into the preceding major heading. Falls back to one chapter per boundary
/// when no major heading produces content.
pub fn chapters_from_boundaries(
    lines: &[&str],
    boundaries: &[Boundary],
    rules: &SegmentRules,
) -> (Vec<ChapterDraft>, bool) {
    let merged = merge_under_major_headings(lines, boundaries, rules);
    if !merged.is_empty() {
        return (merged, true);
    }

    let chapters = boundaries
        .iter()
        .enumerate()
        .filter_map(|(index, boundary)| {
            let body = boundary_body(lines, boundaries, index);
            chapter_draft(&boundary.title, body)
        })
        .collect();
    (chapters, false)
}

fn merge_under_major_headings(
    lines: &[&str],
    boundaries: &[Boundary],
    rules: &SegmentRules,
) -> Vec<ChapterDraft> {
    let mut chapters = Vec::<ChapterDraft>::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for (index, boundary) in boundaries.iter().enumerate() {
        let body = boundary_body(lines, boundaries, index);

        if rules.is_major_heading(&boundary.title) {
            if let Some((title, body_lines)) = current.take() {
                chapters.extend(chapter_draft(&title, &body_lines));
            }
            current = Some((boundary.title.clone(), body.to_vec()));
            continue;
        }

        // Minor sections before the first major heading are front matter.
        if let Some((_, body_lines)) = current.as_mut() {
            body_lines.push(lines[boundary.line_index]);
            body_lines.extend_from_slice(body);
        }
    }

    if let Some((title, body_lines)) = current.take() {
        chapters.extend(chapter_draft(&title, &body_lines));
    }

    chapters
}

fn boundary_body<'a>(lines: &'a [&'a str], boundaries: &[Boundary], index: usize) -> &'a [&'a str] {
    let start = boundaries[index].line_index + 1;
    let end = boundaries
        .get(index + 1)
        .map(|next| next.line_index)
        .unwrap_or(lines.len());
    if start >= end {
        return &[];
    }
    &lines[start..end]
}

fn chapter_draft(title: &str, body: &[&str]) -> Option<ChapterDraft> {
    let content = body.join("\n").trim().to_string();
    if content.is_empty() {
        return None;
    }
    Some(ChapterDraft {
        title: title.to_string(),
        content,
    })
}
