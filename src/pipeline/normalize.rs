use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use super::config::NormalizerConfig;
use crate::text::char_len;

/// Every pass only ever removes text, so this bound is never reached on real
/// input; it only caps pathological cases.
const MAX_NORMALIZE_PASSES: usize = 16;

const BOILERPLATE_PATTERNS: &[&str] = &[
    r"版权所有[^\n]*",
    r"(?i)copyright\s*(?:©|\(c\))[^\n]*?\d{4}",
    r"(?i)isbn[\s:：]*[\dx][\dx-]*",
    r"(?:责任编辑|封面设计|出版发行|印刷|版次|印次)\s*[:：][^\n]*",
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationReport {
    pub passes: usize,
    pub noise_lines_removed: usize,
    pub repeated_lines_removed: usize,
}

#[derive(Debug)]
pub struct Normalizer {
    config: NormalizerConfig,
    tag: Regex,
    boilerplate: Vec<Regex>,
    blank_run: Regex,
    numeric_line: Regex,
    dashed_page_line: Regex,
    page_label_line: Regex,
    roman_line: Regex,
    punctuation_line: Regex,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        let boilerplate = BOILERPLATE_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile boilerplate regex {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            config,
            tag: Regex::new(r"<[^>]+>").context("failed to compile tag regex")?,
            boilerplate,
            blank_run: Regex::new(r"\n{3,}").context("failed to compile blank run regex")?,
            numeric_line: Regex::new(r"^\d+$").context("failed to compile numeric line regex")?,
            dashed_page_line: Regex::new(r"^-?\s*\d+\s*-?$")
                .context("failed to compile dashed page regex")?,
            page_label_line: Regex::new(r"(?i)^(?:page\s*\d+|第?\s*\d+\s*页)$")
                .context("failed to compile page label regex")?,
            roman_line: Regex::new(r"^[IVXLCDM]+$").context("failed to compile roman regex")?,
            punctuation_line: Regex::new(r"^[\W_]+$")
                .context("failed to compile punctuation line regex")?,
        })
    }

    /// Runs the cleaning pass until the text stops changing, so the result is
    /// a fixed point: normalizing it again returns it unchanged.
    pub fn normalize_with_report(&self, raw_text: &str) -> (String, NormalizationReport) {
        let mut report = NormalizationReport::default();
        let mut current = raw_text.to_string();

        while report.passes < MAX_NORMALIZE_PASSES {
            let next = self.normalize_once(&current, &mut report);
            report.passes += 1;
            if next == current {
                break;
            }
            current = next;
        }

        debug!(
            passes = report.passes,
            noise_lines_removed = report.noise_lines_removed,
            repeated_lines_removed = report.repeated_lines_removed,
            "normalized text"
        );
        (current, report)
    }

    fn normalize_once(&self, text: &str, report: &mut NormalizationReport) -> String {
        let mut text = self.tag.replace_all(text, "").into_owned();
        for pattern in &self.boilerplate {
            text = pattern.replace_all(&text, "").into_owned();
        }

        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let text = self.collapse_blank_runs(&text);
        let text = self.trim_lines(&text);
        let text = self.remove_noise_lines(&text, report);
        self.trim_lines(&text)
    }

    fn collapse_blank_runs(&self, text: &str) -> String {
        self.blank_run.replace_all(text, "\n\n").into_owned()
    }

    fn trim_lines(&self, text: &str) -> String {
        let joined = text.split('\n').map(str::trim).collect::<Vec<&str>>().join("\n");
        let collapsed = self.collapse_blank_runs(&joined);
        collapsed.trim().to_string()
    }

    fn remove_noise_lines(&self, text: &str, report: &mut NormalizationReport) -> String {
        if text.is_empty() {
            return String::new();
        }

        let lines = text.split('\n').map(str::trim).collect::<Vec<&str>>();
        let total = lines.len().max(1);
        let mut counts = HashMap::<&str, usize>::new();
        for line in lines.iter().copied().filter(|line| !line.is_empty()) {
            *counts.entry(line).or_insert(0) += 1;
        }

        let mut kept = Vec::<&str>::with_capacity(lines.len());
        for line in lines {
            if line.is_empty() {
                kept.push(line);
                continue;
            }

            if self.is_noise_line(line) {
                report.noise_lines_removed += 1;
                continue;
            }

            let count = counts.get(line).copied().unwrap_or(0);
            if self.is_repeated_line(line, count, total) {
                report.repeated_lines_removed += 1;
                continue;
            }

            kept.push(line);
        }

        kept.join("\n")
    }

    pub fn is_noise_line(&self, line: &str) -> bool {
        self.numeric_line.is_match(line)
            || self.dashed_page_line.is_match(line)
            || self.page_label_line.is_match(line)
            || self.roman_line.is_match(line)
            || self.punctuation_line.is_match(line)
    }

    fn is_repeated_line(&self, line: &str, count: usize, total: usize) -> bool {
        char_len(line) <= self.config.repeated_line_max_chars
            && count >= self.config.repeated_line_min_count
            && (count as f64 / total as f64) >= self.config.repeated_line_min_rate
    }
}
