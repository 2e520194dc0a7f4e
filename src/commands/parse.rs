use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{OutputFormat, ParseArgs};
use crate::commands::{build_pipeline, inventory, read_document_source};
use crate::pipeline::{ParsedDocument, ensure_extractable};

pub fn run(args: ParseArgs) -> Result<()> {
    let title = match args.title.clone() {
        Some(title) => title,
        None => inventory::title_from_path(&args.input)
            .with_context(|| format!("cannot derive a title from {}", args.input.display()))?,
    };

    let (pipeline, _) = build_pipeline(&args.cache_root, &args.pipeline)?;
    let source = read_document_source(&args.input, title, args.author.clone())?;
    let parsed = pipeline.parse(&source);
    ensure_extractable(&parsed)?;

    info!(input = %args.input.display(), "parse completed");

    let mut output = io::BufWriter::new(io::stdout().lock());
    match args.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut output, &parsed)
                .context("failed to serialize parse json output")?;
            writeln!(output)?;
        }
        OutputFormat::Summary => write_summary(&mut output, &parsed)?,
    }
    output.flush()?;
    Ok(())
}

fn write_summary(output: &mut impl Write, parsed: &ParsedDocument) -> Result<()> {
    let document = &parsed.document;
    let stats = &parsed.stats;
    let detection = &stats.chapter_detection;

    writeln!(output, "Title: {}", document.title)?;
    writeln!(
        output,
        "Language: {} words={} sha256={}",
        document.language, document.total_words, document.source_sha256
    )?;
    writeln!(
        output,
        "Cleaning: chars {} -> {} lines {} -> {} noise_removed={} repeated_removed={}",
        stats.raw_chars,
        stats.cleaned_chars,
        stats.raw_lines,
        stats.cleaned_lines,
        stats.noise_lines_removed,
        stats.repeated_lines_removed,
    )?;
    writeln!(
        output,
        "Segmentation: strategy={} boundaries={} known_book={} fallback={} major_merge={}",
        detection.strategy.as_str(),
        detection.boundaries_found,
        detection.known_book_hit.as_deref().unwrap_or("-"),
        detection.fallback,
        detection.major_heading_merge,
    )?;
    writeln!(
        output,
        "Evidence: linked={} unlinked={}",
        stats.evidence_linked, stats.evidence_unlinked
    )?;

    for chapter in &parsed.chapters {
        writeln!(
            output,
            "{}.\t{}\tparagraphs={} viewpoints={}",
            chapter.chapter_number,
            chapter.title,
            chapter.paragraphs.len(),
            chapter.viewpoints.len()
        )?;
        for viewpoint in &chapter.viewpoints {
            writeln!(output, "\t- [{:.3}] {}", viewpoint.score, viewpoint.context)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceCatalog;
    use crate::pipeline::{DocumentFormat, DocumentPipeline, DocumentSource, PipelineConfig};

    #[test]
    fn summary_lists_strategy_and_chapters() {
        let pipeline = DocumentPipeline::new(PipelineConfig::default(), ReferenceCatalog::empty())
            .expect("pipeline should build");
        let parsed = pipeline.parse(&DocumentSource {
            title: "样书".to_string(),
            author: None,
            format: DocumentFormat::Txt,
            bytes: "第一章 引言\n这是引言内容。\n第二章 正文\n这是正文内容。".as_bytes().to_vec(),
        });

        let mut buffer = Vec::<u8>::new();
        write_summary(&mut buffer, &parsed).expect("summary should render");
        let rendered = String::from_utf8(buffer).expect("summary should be utf-8");

        assert!(rendered.contains("strategy=pattern"));
        assert!(rendered.contains("1.\t第一章 引言\tparagraphs=1 viewpoints=1"));
        assert!(rendered.contains("\t- [1.000] 这是正文内容。"));
    }
}
