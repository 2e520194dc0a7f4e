use sha2::{Digest, Sha256};

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
    "them", "they", "this", "to", "was", "were", "which", "with", "you",
];

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn char_len(input: &str) -> usize {
    input.chars().count()
}

pub fn char_prefix(input: &str, count: usize) -> &str {
    match input.char_indices().nth(count) {
        Some((byte_index, _)) => &input[..byte_index],
        None => input,
    }
}

pub fn is_cjk(character: char) -> bool {
    matches!(
        character as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF | 0xF900..=0xFAFF
    )
}

/// Splits text into content words.
///
/// Latin and digit runs become lower-cased words; CJK runs have no word
/// delimiters, so they are emitted as overlapping character bigrams. Every
/// emitted word is longer than one character and contains no punctuation.
pub fn tokenize_words(text: &str) -> Vec<String> {
    let mut words = Vec::<String>::new();
    let mut latin = String::new();
    let mut cjk = Vec::<char>::new();

    for character in text.chars() {
        if is_cjk(character) {
            flush_latin(&mut latin, &mut words);
            cjk.push(character);
        } else if character.is_alphanumeric() {
            flush_cjk(&mut cjk, &mut words);
            latin.extend(character.to_lowercase());
        } else {
            flush_latin(&mut latin, &mut words);
            flush_cjk(&mut cjk, &mut words);
        }
    }

    flush_latin(&mut latin, &mut words);
    flush_cjk(&mut cjk, &mut words);
    words
}

fn flush_latin(buffer: &mut String, words: &mut Vec<String>) {
    if buffer.chars().count() > 1 && !ENGLISH_STOP_WORDS.contains(&buffer.as_str()) {
        words.push(buffer.clone());
    }
    buffer.clear();
}

fn flush_cjk(buffer: &mut Vec<char>, words: &mut Vec<String>) {
    for pair in buffer.windows(2) {
        words.push(pair.iter().collect());
    }
    buffer.clear();
}

/// CJK characters plus whitespace-separated non-CJK words.
pub fn count_words(text: &str) -> usize {
    let cjk_chars = text.chars().filter(|character| is_cjk(*character)).count();
    let other_words = text
        .split(|character: char| character.is_whitespace() || is_cjk(character))
        .filter(|word| !word.is_empty())
        .count();
    cjk_chars + other_words
}

pub fn detect_language(text: &str) -> &'static str {
    let total = char_len(text);
    if total == 0 {
        return "unknown";
    }

    let cjk_chars = text.chars().filter(|character| is_cjk(*character)).count();
    let ratio = cjk_chars as f64 / total as f64;
    if ratio > 0.3 {
        "zh"
    } else if ratio < 0.1 {
        "en"
    } else {
        "mixed"
    }
}
