use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the whole structuring pipeline. Every heuristic threshold
/// lives here so it can be overridden from a JSON file or tested in isolation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub normalizer: NormalizerConfig,
    pub segmenter: SegmenterConfig,
    pub viewpoints: ViewpointConfig,
    pub evidence: EvidenceConfig,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read pipeline config {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse pipeline config {}", path.display()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Repeated lines longer than this are treated as content, not running headers.
    pub repeated_line_max_chars: usize,
    pub repeated_line_min_count: usize,
    /// Share of all lines (blank included) a repeated line must reach.
    pub repeated_line_min_rate: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            repeated_line_max_chars: 30,
            repeated_line_min_count: 3,
            repeated_line_min_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Lines at or under this length score the full short-line bonus.
    pub short_line_chars: usize,
    pub medium_line_chars: usize,
    pub short_line_score: u32,
    pub medium_line_score: u32,
    pub title_pattern_score: u32,
    pub structural_keyword_score: u32,
    pub blank_neighbor_score: u32,
    pub boundary_min_score: u32,
    /// Known-book matches need at least this many distinct titles (capped at the list length).
    pub known_book_min_hits: usize,
    pub known_book_min_ratio: f64,
    /// How many extra chars a line may carry after a known title ("学而第一").
    pub known_book_suffix_slack: usize,
    pub fallback_chunk_size: usize,
    pub fallback_title_prefix: String,
    pub major_heading_max_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            short_line_chars: 20,
            medium_line_chars: 30,
            short_line_score: 2,
            medium_line_score: 1,
            title_pattern_score: 3,
            structural_keyword_score: 2,
            blank_neighbor_score: 1,
            boundary_min_score: 4,
            known_book_min_hits: 3,
            known_book_min_ratio: 0.5,
            known_book_suffix_slack: 4,
            fallback_chunk_size: 10,
            fallback_title_prefix: "段落".to_string(),
            major_heading_max_chars: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewpointConfig {
    pub max_per_chapter: usize,
    pub max_keywords: usize,
    pub context_max_chars: usize,
}

impl Default for ViewpointConfig {
    fn default() -> Self {
        Self {
            max_per_chapter: 5,
            max_keywords: 5,
            context_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub probe_chars: usize,
    pub baseline_score: f64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            probe_chars: 15,
            baseline_score: 1.0,
        }
    }
}
