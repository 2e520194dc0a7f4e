use super::*;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let library_dir = inventory::library_dir_for(&cache_root, args.library_dir.as_deref());
    let inventory_manifest_path = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| inventory::default_manifest_path(&cache_root));
    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&cache_root));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting ingest");

    let inventory = load_or_refresh_inventory(
        &library_dir,
        &inventory_manifest_path,
        args.refresh_inventory,
    )?;
    let source_dir = PathBuf::from(&inventory.source_directory);

    let (pipeline, catalog_path) = build_pipeline(&cache_root, &args.pipeline)?;
    let mut connection = open_store(&db_path)?;

    let selected = select_books(&inventory.books, &args.target_books);
    if selected.is_empty() {
        warn!(targets = ?args.target_books, "no inventory books matched the target filter");
    }

    let mut counts = IngestCounts {
        book_count: inventory.book_count,
        selected_book_count: selected.len(),
        ..IngestCounts::default()
    };
    let mut reports = Vec::<BookIngestReport>::with_capacity(selected.len());
    let mut warnings = Vec::<String>::new();

    for entry in selected {
        let book_id = book_id_for(&entry.filename);
        match ingest_book(&pipeline, &mut connection, &source_dir, entry, &book_id) {
            Ok(ingested) => {
                record_stored_book(&mut counts, &ingested.stats, &ingested.stored);
                warnings.extend(ingested.warnings);
                reports.push(BookIngestReport {
                    book_id,
                    filename: entry.filename.clone(),
                    title: entry.title.clone(),
                    status: "stored".to_string(),
                    stats: Some(ingested.stats),
                    error: None,
                });
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(book = %entry.title, error = %reason, "book ingest failed");
                counts.books_failed += 1;
                warnings.push(format!("{}: {reason}", entry.filename));
                reports.push(BookIngestReport {
                    book_id,
                    filename: entry.filename.clone(),
                    title: entry.title.clone(),
                    status: "failed".to_string(),
                    stats: None,
                    error: Some(reason),
                });
            }
        }
    }

    let status = run_status(&counts, args.strict);
    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_ingest_command(&args),
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            inventory_manifest_path: inventory_manifest_path.display().to_string(),
            catalog_path: catalog_path.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts,
        books: reports,
        warnings,
    };

    write_json_pretty(&ingest_manifest_path, &manifest)?;
    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");

    if args.strict && manifest.counts.books_failed > 0 {
        bail!(
            "{} of {} books failed to ingest (strict mode)",
            manifest.counts.books_failed,
            manifest.counts.selected_book_count
        );
    }

    info!(
        stored = manifest.counts.books_stored,
        failed = manifest.counts.books_failed,
        chapters = manifest.counts.chapters_inserted,
        evidence = manifest.counts.evidence_inserted,
        "ingest completed"
    );
    Ok(())
}

pub(super) fn load_or_refresh_inventory(
    library_dir: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<BookInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(library_dir)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            book_count = manifest.book_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: BookInventoryManifest = read_json(inventory_manifest_path)?;
    info!(
        path = %inventory_manifest_path.display(),
        book_count = manifest.book_count,
        "loaded existing inventory manifest"
    );
    Ok(manifest)
}

/// Books named by `--target-book` (title, filename or file stem); all books
/// when no target is given.
pub(super) fn select_books<'a>(books: &'a [BookEntry], targets: &[String]) -> Vec<&'a BookEntry> {
    if targets.is_empty() {
        return books.iter().collect();
    }

    books
        .iter()
        .filter(|book| {
            let stem = inventory::title_from_path(Path::new(&book.filename));
            targets.iter().any(|target| {
                let target = target.trim();
                book.title == target
                    || book.filename == target
                    || stem.as_deref() == Some(target)
            })
        })
        .collect()
}

pub(super) struct IngestedBook {
    pub stats: ParseStats,
    pub stored: StoredCounts,
    pub warnings: Vec<String>,
}

/// Parse and store one book. Any error leaves the database as it was for
/// this book.
pub(super) fn ingest_book(
    pipeline: &DocumentPipeline,
    connection: &mut Connection,
    source_dir: &Path,
    entry: &BookEntry,
    book_id: &str,
) -> Result<IngestedBook> {
    let path = source_dir.join(&entry.filename);
    let source = read_document_source(&path, entry.title.clone(), None)?;

    let parsed = pipeline.parse(&source);
    let mut warnings = Vec::<String>::new();
    if parsed.document.source_sha256 != entry.sha256 {
        warn!(
            book = %entry.title,
            path = %path.display(),
            "book changed since inventory; storing current contents"
        );
        warnings.push(format!(
            "{}: sha256 differs from inventory ({} != {}); stored current contents",
            entry.filename, parsed.document.source_sha256, entry.sha256
        ));
    }
    ensure_extractable(&parsed)?;

    let stored = store_document(connection, book_id, &path.display().to_string(), &parsed)?;
    Ok(IngestedBook {
        stats: parsed.stats,
        stored,
        warnings,
    })
}

pub(super) fn record_stored_book(counts: &mut IngestCounts, stats: &ParseStats, stored: &StoredCounts) {
    counts.books_stored += 1;
    if stored.replaced_previous {
        counts.books_replaced += 1;
    }
    counts.chapters_inserted += stored.chapters;
    counts.paragraphs_inserted += stored.paragraphs;
    counts.viewpoints_inserted += stored.viewpoints;
    counts.evidence_inserted += stored.evidence;
    counts.evidence_unlinked += stats.evidence_unlinked;

    match stats.chapter_detection.strategy {
        SegmentStrategyKind::KnownBook => counts.known_book_segmentations += 1,
        SegmentStrategyKind::Pattern => counts.pattern_segmentations += 1,
        SegmentStrategyKind::FallbackParagraph => counts.fallback_segmentations += 1,
    }
}

pub(super) fn run_status(counts: &IngestCounts, strict: bool) -> &'static str {
    match (counts.books_failed, strict) {
        (0, _) => "completed",
        (_, true) => "failed",
        (_, false) => "completed_with_warnings",
    }
}

pub(super) fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "bookgraph".to_string(),
        "ingest".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    let optional_paths = [
        ("--library-dir", &args.library_dir),
        ("--inventory-manifest-path", &args.inventory_manifest_path),
        ("--ingest-manifest-path", &args.ingest_manifest_path),
        ("--db-path", &args.db_path),
        ("--pipeline-config", &args.pipeline.pipeline_config),
        ("--catalog-path", &args.pipeline.catalog_path),
    ];
    for (flag, value) in optional_paths {
        if let Some(path) = value {
            command.push(flag.to_string());
            command.push(path.display().to_string());
        }
    }

    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    if args.strict {
        command.push("--strict".to_string());
    }
    for target in &args.target_books {
        command.push("--target-book".to_string());
        command.push(target.clone());
    }
    if let Some(limit) = args.pipeline.max_viewpoints_per_chapter {
        command.push("--max-viewpoints-per-chapter".to_string());
        command.push(limit.to_string());
    }
    if let Some(chunk_size) = args.pipeline.fallback_chunk_size {
        command.push("--fallback-chunk-size".to_string());
        command.push(chunk_size.to_string());
    }

    command.join(" ")
}
