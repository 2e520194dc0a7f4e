use anyhow::{Context, Result};
use regex::Regex;

const NUMERALS: &str = "一二三四五六七八九十百千零〇两";

/// Chapter-title shapes that earn the pattern bonus in heuristic scoring.
fn title_pattern_sources() -> Vec<String> {
    vec![
        r"^第【\d+】段".to_string(),
        format!(r"^第[{NUMERALS}\d]+章"),
        format!(r"^第[{NUMERALS}\d]+卷"),
        format!(r"^第[{NUMERALS}\d]+篇"),
        format!(r"^第[{NUMERALS}\d]+节"),
        format!(r"^\p{{Han}}{{1,3}}第[{NUMERALS}\d]+[卷篇章期]"),
        r"^(?i:chapter)\s*\d+".to_string(),
        r"^(?i:chapter)\s+[IVXLC]+\b".to_string(),
        r"^(?i:part)\s+\d+".to_string(),
        r"^(?i:part)\s+[IVXLC]+\b".to_string(),
        format!(r"^[{NUMERALS}\d]+\.\s"),
        format!(r"^[{NUMERALS}]+、"),
    ]
}

/// Compiled line rules shared by the segmentation strategies.
#[derive(Debug)]
pub struct SegmentRules {
    title_patterns: Vec<Regex>,
    structural_keyword: Regex,
    footnote_line: Regex,
    numeric_line: Regex,
    dashed_page_line: Regex,
    page_label_line: Regex,
    numbered_section_title: Regex,
    known_title_punctuation: Regex,
    known_title_markers: Regex,
    major_rules: MajorHeadingRules,
}

/// Rules for telling a top-level heading (volume, chapter, part) from a
/// minor sub-heading. Kept apart from the boundary patterns: boundary
/// detection wants recall, this wants precision.
#[derive(Debug)]
struct MajorHeadingRules {
    keyword: Regex,
    ordinal_list: Regex,
    prefixed_ordinal: Regex,
    trailing_ordinal: Regex,
    max_trailing_chars: usize,
}

impl SegmentRules {
    pub fn new(major_heading_max_chars: usize) -> Result<Self> {
        let title_patterns = title_pattern_sources()
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile chapter title regex {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            title_patterns,
            structural_keyword: Regex::new(r"章|卷|篇|节|Chapter|CHAPTER|Part|PART")
                .context("failed to compile structural keyword regex")?,
            footnote_line: Regex::new(r"^(?:[①-⑳]|\[\d+\])")
                .context("failed to compile footnote regex")?,
            numeric_line: Regex::new(r"^\d+$").context("failed to compile numeric line regex")?,
            dashed_page_line: Regex::new(r"^-?\s*\d+\s*-?$")
                .context("failed to compile dashed page regex")?,
            page_label_line: Regex::new(r"^第?\s*\d+\s*页$")
                .context("failed to compile page label regex")?,
            numbered_section_title: Regex::new(r"^第【\d+】段[:：](.+)$")
                .context("failed to compile numbered section regex")?,
            known_title_punctuation: Regex::new(r"[\s\u{3000}·•\-—―–:：.。]+")
                .context("failed to compile known title punctuation regex")?,
            known_title_markers: Regex::new(r"(?i)chapter|volume|part|section|[第章节卷篇]")
                .context("failed to compile known title marker regex")?,
            major_rules: MajorHeadingRules {
                keyword: Regex::new(r"(?i)[卷章篇]|\b(?:chapter|part|volume)\b")
                    .context("failed to compile major keyword regex")?,
                ordinal_list: Regex::new(&format!(r"^第[{NUMERALS}]+、"))
                    .context("failed to compile major ordinal list regex")?,
                prefixed_ordinal: Regex::new(&format!(r"^\p{{Han}}{{1,3}}第[{NUMERALS}\d]+"))
                    .context("failed to compile major prefixed ordinal regex")?,
                trailing_ordinal: Regex::new(&format!(r"第[{NUMERALS}\d]+$"))
                    .context("failed to compile major trailing ordinal regex")?,
                max_trailing_chars: major_heading_max_chars,
            },
        })
    }

    /// Lines that can never be chapter titles: blanks, footnotes, page numbers.
    pub fn is_noise_line(&self, line: &str) -> bool {
        line.is_empty()
            || self.footnote_line.is_match(line)
            || self.numeric_line.is_match(line)
            || self.dashed_page_line.is_match(line)
            || self.page_label_line.is_match(line)
    }

    pub fn matches_title_pattern(&self, line: &str) -> bool {
        self.title_patterns.iter().any(|pattern| pattern.is_match(line))
    }

    pub fn has_structural_keyword(&self, line: &str) -> bool {
        self.structural_keyword.is_match(line)
    }

    /// `第【3】段：第二卷` is titled by the part after the colon.
    pub fn display_title(&self, line: &str) -> String {
        self.numbered_section_title
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| line.to_string())
    }

    /// Canonical form used to compare lines against catalog titles.
    pub fn normalize_known_title(&self, raw: &str) -> String {
        let without_punctuation = self.known_title_punctuation.replace_all(raw, "");
        self.known_title_markers
            .replace_all(&without_punctuation, "")
            .to_lowercase()
    }

    pub fn is_major_heading(&self, title: &str) -> bool {
        let rules = &self.major_rules;
        rules.keyword.is_match(title)
            || rules.ordinal_list.is_match(title)
            || rules.prefixed_ordinal.is_match(title)
            || (rules.trailing_ordinal.is_match(title)
                && title.chars().count() <= rules.max_trailing_chars)
    }
}
