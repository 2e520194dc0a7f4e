use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::cli::QueryArgs;
use crate::commands::default_db_path;
use crate::store::{EvidenceFilter, EvidenceHit, ParagraphRow, chapter_paragraphs, search_evidence};
use crate::text::normalize_whitespace;

#[derive(Debug, Serialize)]
struct EvidenceResponse<'a> {
    keyword: Option<&'a str>,
    book_id: Option<&'a str>,
    chapter_id: Option<&'a str>,
    limit: usize,
    returned: usize,
    results: &'a [EvidenceHit],
}

#[derive(Debug, Serialize)]
struct ParagraphResponse<'a> {
    chapter_id: &'a str,
    returned: usize,
    paragraphs: &'a [ParagraphRow],
}

pub fn run(args: QueryArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));
    if !db_path.exists() {
        bail!("database not found: {} (run ingest first)", db_path.display());
    }
    let connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.paragraphs {
        let Some(chapter_id) = args.chapter_id.as_deref() else {
            bail!("--paragraphs requires --chapter-id");
        };
        let paragraphs = chapter_paragraphs(&connection, chapter_id)?;
        info!(chapter_id, paragraphs = paragraphs.len(), "loaded chapter paragraphs");
        write_paragraphs(&mut output, chapter_id, &paragraphs, args.json)?;
    } else {
        let filter = evidence_filter(&args)?;
        let hits = search_evidence(&connection, &filter)?;
        info!(hits = hits.len(), limit = filter.limit, "evidence query complete");
        write_evidence(&mut output, &filter, &hits, args.json)?;
    }
    output.flush()?;
    Ok(())
}

fn evidence_filter(args: &QueryArgs) -> Result<EvidenceFilter> {
    if args.limit == 0 {
        bail!("--limit must be at least 1");
    }

    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    };
    Ok(EvidenceFilter {
        keyword: non_empty(&args.keyword),
        book_id: non_empty(&args.book_id),
        chapter_id: non_empty(&args.chapter_id),
        limit: args.limit,
    })
}

fn write_evidence(
    output: &mut impl Write,
    filter: &EvidenceFilter,
    hits: &[EvidenceHit],
    json: bool,
) -> Result<()> {
    if json {
        let response = EvidenceResponse {
            keyword: filter.keyword.as_deref(),
            book_id: filter.book_id.as_deref(),
            chapter_id: filter.chapter_id.as_deref(),
            limit: filter.limit,
            returned: hits.len(),
            results: hits,
        };
        serde_json::to_writer_pretty(&mut *output, &response)
            .context("failed to serialize evidence json output")?;
        writeln!(output)?;
        return Ok(());
    }

    writeln!(output, "Keyword: {}", filter.keyword.as_deref().unwrap_or("(any)"))?;
    writeln!(output, "Results: {}", hits.len())?;
    for (index, hit) in hits.iter().enumerate() {
        let paragraph = hit
            .paragraph_number
            .map(|number| format!("paragraph {number}"))
            .unwrap_or_else(|| "(unlinked)".to_string());
        writeln!(
            output,
            "{}.\t{}\tchapter {} {}\t{}",
            index + 1,
            hit.book_title,
            hit.chapter_number,
            hit.chapter_title,
            paragraph
        )?;
        writeln!(output, "\tviewpoint: {}", normalize_whitespace(&hit.viewpoint))?;
        writeln!(output, "\tevidence: {}", normalize_whitespace(&hit.evidence_text))?;
        if !hit.keywords.is_empty() {
            writeln!(output, "\tkeywords: {}", hit.keywords.join(", "))?;
        }
        writeln!(
            output,
            "\tscore={:.3} evidence_id={} chapter_id={}",
            hit.score, hit.evidence_id, hit.chapter_id
        )?;
    }
    Ok(())
}

fn write_paragraphs(
    output: &mut impl Write,
    chapter_id: &str,
    paragraphs: &[ParagraphRow],
    json: bool,
) -> Result<()> {
    if json {
        let response = ParagraphResponse {
            chapter_id,
            returned: paragraphs.len(),
            paragraphs,
        };
        serde_json::to_writer_pretty(&mut *output, &response)
            .context("failed to serialize paragraph json output")?;
        writeln!(output)?;
        return Ok(());
    }

    writeln!(output, "Chapter: {chapter_id}")?;
    for paragraph in paragraphs {
        writeln!(
            output,
            "{}.\t{}\t(words={})",
            paragraph.paragraph_number,
            normalize_whitespace(&paragraph.content),
            paragraph.word_count
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args() -> QueryArgs {
        QueryArgs {
            cache_root: PathBuf::from(".cache/bookgraph"),
            db_path: None,
            keyword: Some("  正义 ".to_string()),
            book_id: Some(String::new()),
            chapter_id: None,
            limit: 50,
            paragraphs: false,
            json: false,
        }
    }

    fn hit(paragraph_number: Option<i64>) -> EvidenceHit {
        EvidenceHit {
            evidence_id: "e1".to_string(),
            book_id: "book-1".to_string(),
            book_title: "理想国".to_string(),
            chapter_id: "c1".to_string(),
            chapter_number: 4,
            chapter_title: "第四卷".to_string(),
            viewpoint_id: "v1".to_string(),
            viewpoint: "正义是最高的美德。".to_string(),
            paragraph_id: paragraph_number.map(|_| "p1".to_string()),
            paragraph_number,
            evidence_text: "正义是最高的美德。".to_string(),
            context_before: None,
            context_after: None,
            keywords: vec!["正义".to_string(), "美德".to_string()],
            score: 1.0,
        }
    }

    #[test]
    fn evidence_filter_trims_and_drops_blank_values() {
        let filter = evidence_filter(&args()).expect("filter should build");
        assert_eq!(filter.keyword.as_deref(), Some("正义"));
        assert_eq!(filter.book_id, None);
        assert_eq!(filter.limit, 50);
    }

    #[test]
    fn evidence_filter_rejects_zero_limit() {
        let mut args = args();
        args.limit = 0;
        assert!(evidence_filter(&args).is_err());
    }

    #[test]
    fn text_output_marks_unlinked_evidence() {
        let filter = evidence_filter(&args()).expect("filter should build");
        let mut buffer = Vec::<u8>::new();
        write_evidence(&mut buffer, &filter, &[hit(Some(3)), hit(None)], false)
            .expect("output should render");
        let rendered = String::from_utf8(buffer).expect("output should be utf-8");

        assert!(rendered.contains("1.\t理想国\tchapter 4 第四卷\tparagraph 3"));
        assert!(rendered.contains("2.\t理想国\tchapter 4 第四卷\t(unlinked)"));
        assert!(rendered.contains("\tkeywords: 正义, 美德"));
    }

    #[test]
    fn json_output_reports_returned_count() {
        let filter = evidence_filter(&args()).expect("filter should build");
        let mut buffer = Vec::<u8>::new();
        write_evidence(&mut buffer, &filter, &[hit(Some(1))], true).expect("output should render");

        let value: serde_json::Value =
            serde_json::from_slice(&buffer).expect("output should be json");
        assert_eq!(value["returned"], 1);
        assert_eq!(value["keyword"], "正义");
        assert_eq!(value["results"][0]["paragraph_number"], 1);
    }
}
