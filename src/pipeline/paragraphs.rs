use uuid::Uuid;

use super::types::Paragraph;
use crate::text::count_words;

/// Splits text on line breaks, trimming each entry and dropping blanks.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn build_paragraphs(chapter_id: Uuid, chapter_text: &str) -> Vec<Paragraph> {
    split_paragraphs(chapter_text)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Paragraph {
            paragraph_id: Uuid::new_v4(),
            chapter_id,
            paragraph_number: index + 1,
            word_count: count_words(&content),
            content,
        })
        .collect()
}
