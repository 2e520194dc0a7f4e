use std::collections::{HashMap, HashSet};

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use super::config::ViewpointConfig;
use super::types::Viewpoint;
use crate::text::{char_len, char_prefix, tokenize_words};

const CJK_TERMINATORS: &[char] = &['。', '！', '？', '；'];
const TRAILING_MARKS: &[char] = &['.', '!', '?', ';'];
const CLOSING_MARKS: &[char] = &['”', '’', '」', '』', '）', ')', '"', '\'', '》'];
const OPENING_MARKS: &[char] = &['“', '‘', '「', '『', '（', '(', '《'];

/// Unicode sentence boundaries (UAX #29) within each line, refined by
/// [`split_on_terminators`] for the CJK terminators and semicolons the
/// Unicode rules leave alone. An opening quote that the Unicode rules attach
/// to the end of a sentence moves to the start of the next one.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::<String>::new();

    for line in text.lines() {
        let mut carried = String::new();
        for segment in line.unicode_sentences() {
            let segment = format!("{carried}{}", segment.trim());
            let body = segment.trim_end_matches(OPENING_MARKS);
            carried = segment[body.len()..].to_string();
            sentences.extend(split_on_terminators(body));
        }
    }

    sentences
}

/// Splits on `。！？；` and on `;` followed by whitespace. Repeated
/// terminators and trailing closing quotes stay with their sentence.
pub fn split_on_terminators(text: &str) -> Vec<String> {
    let chars = text.chars().collect::<Vec<char>>();
    let mut sentences = Vec::<String>::new();
    let mut current = String::new();
    let mut index = 0usize;

    while index < chars.len() {
        let character = chars[index];
        index += 1;
        current.push(character);

        let ends_sentence = CJK_TERMINATORS.contains(&character)
            || (character == ';' && chars.get(index).is_none_or(|next| next.is_whitespace()));
        if !ends_sentence {
            continue;
        }

        while let Some(next) = chars.get(index).copied() {
            let absorbs = CJK_TERMINATORS.contains(&next)
                || TRAILING_MARKS.contains(&next)
                || CLOSING_MARKS.contains(&next);
            if !absorbs {
                break;
            }
            current.push(next);
            index += 1;
        }
        push_sentence(&mut current, &mut sentences);
    }

    push_sentence(&mut current, &mut sentences);
    sentences
}

fn push_sentence(current: &mut String, sentences: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSentence {
    pub index: usize,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ViewpointExtractor {
    config: ViewpointConfig,
}

impl ViewpointExtractor {
    pub fn new(config: ViewpointConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, chapter_id: Uuid, chapter_text: &str) -> Vec<Viewpoint> {
        self.extract_with_limit(chapter_id, chapter_text, self.config.max_per_chapter)
    }

    pub fn extract_with_limit(
        &self,
        chapter_id: Uuid,
        chapter_text: &str,
        max_per_chapter: usize,
    ) -> Vec<Viewpoint> {
        let sentences = split_sentences(chapter_text);
        let word_lists = sentences
            .iter()
            .map(|sentence| tokenize_words(sentence))
            .collect::<Vec<Vec<String>>>();
        let document_frequency = document_frequency(&word_lists);

        let selected = rank_sentences(&sentences, &word_lists, &document_frequency, max_per_chapter);
        debug!(
            chapter_id = %chapter_id,
            sentences = sentences.len(),
            selected = selected.len(),
            "extracted key sentences"
        );

        selected
            .into_iter()
            .map(|sentence| {
                let keywords = extract_keywords(
                    &word_lists[sentence.index],
                    &document_frequency,
                    sentences.len(),
                    self.config.max_keywords,
                );
                Viewpoint {
                    viewpoint_id: Uuid::new_v4(),
                    chapter_id,
                    context: context_window(&sentence.text, self.config.context_max_chars),
                    content: sentence.text.clone(),
                    original_text: sentence.text,
                    keywords,
                    score: sentence.score,
                }
            })
            .collect()
    }
}

/// Number of sentences containing each word, not total occurrences.
pub fn document_frequency(word_lists: &[Vec<String>]) -> HashMap<String, usize> {
    let mut frequency = HashMap::<String, usize>::new();
    for words in word_lists {
        let unique = words.iter().collect::<HashSet<&String>>();
        for word in unique {
            *frequency.entry(word.clone()).or_insert(0) += 1;
        }
    }
    frequency
}

/// Mean document frequency of a sentence's words, highest first. Ties keep
/// sentence order. Chapters with no more sentences than the limit return
/// every sentence with a uniform score.
pub fn rank_sentences(
    sentences: &[String],
    word_lists: &[Vec<String>],
    document_frequency: &HashMap<String, usize>,
    limit: usize,
) -> Vec<ScoredSentence> {
    if sentences.len() <= limit {
        return sentences
            .iter()
            .enumerate()
            .map(|(index, text)| ScoredSentence {
                index,
                text: text.clone(),
                score: 1.0,
            })
            .collect();
    }

    let mut scored = sentences
        .iter()
        .zip(word_lists)
        .enumerate()
        .map(|(index, (text, words))| {
            let total = words
                .iter()
                .map(|word| document_frequency.get(word).copied().unwrap_or(0))
                .sum::<usize>();
            ScoredSentence {
                index,
                text: text.clone(),
                score: total as f64 / words.len().max(1) as f64,
            }
        })
        .collect::<Vec<ScoredSentence>>();

    scored.sort_by(|left, right| right.score.total_cmp(&left.score));
    scored.truncate(limit);
    scored
}

/// TF-IDF over the chapter's sentences; ties go to the earlier word.
pub fn extract_keywords(
    words: &[String],
    document_frequency: &HashMap<String, usize>,
    sentence_count: usize,
    limit: usize,
) -> Vec<String> {
    let mut term_frequency = HashMap::<&str, (usize, usize)>::new();
    for (position, word) in words.iter().enumerate() {
        let entry = term_frequency.entry(word.as_str()).or_insert((0, position));
        entry.0 += 1;
    }

    let total_sentences = sentence_count.max(1) as f64;
    let mut weighted = term_frequency
        .into_iter()
        .map(|(word, (count, first_position))| {
            let df = document_frequency.get(word).copied().unwrap_or(1).max(1) as f64;
            let idf = (total_sentences / df).ln() + 1.0;
            (word, count as f64 * idf, first_position)
        })
        .collect::<Vec<(&str, f64, usize)>>();

    weighted.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.2.cmp(&right.2)));
    weighted
        .into_iter()
        .take(limit)
        .map(|(word, _, _)| word.to_string())
        .collect()
}

pub fn context_window(sentence: &str, max_chars: usize) -> String {
    if char_len(sentence) > max_chars {
        format!("{}...", char_prefix(sentence, max_chars))
    } else {
        sentence.to_string()
    }
}
