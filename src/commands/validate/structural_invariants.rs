use super::*;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InvariantCheck {
    pub name: &'static str,
    pub description: &'static str,
    pub violations: i64,
}

impl InvariantCheck {
    pub fn passed(&self) -> bool {
        self.violations == 0
    }
}

const CHECKS: &[(&str, &str, &str)] = &[
    (
        "chapter_numbering_contiguous",
        "books whose chapter numbers are not exactly 1..N",
        "
        SELECT COUNT(*) FROM (
          SELECT book_id
          FROM chapters
          GROUP BY book_id
          HAVING MIN(chapter_number) <> 1
              OR MAX(chapter_number) <> COUNT(*)
              OR COUNT(DISTINCT chapter_number) <> COUNT(*)
        )
        ",
    ),
    (
        "paragraph_numbering_contiguous",
        "chapters whose paragraph numbers are not exactly 1..M",
        "
        SELECT COUNT(*) FROM (
          SELECT chapter_id
          FROM paragraphs
          GROUP BY chapter_id
          HAVING MIN(paragraph_number) <> 1
              OR MAX(paragraph_number) <> COUNT(*)
              OR COUNT(DISTINCT paragraph_number) <> COUNT(*)
        )
        ",
    ),
    (
        "chapters_have_paragraphs",
        "chapters with no paragraphs",
        "
        SELECT COUNT(*)
        FROM chapters c
        LEFT JOIN paragraphs p ON p.chapter_id = c.chapter_id
        WHERE p.paragraph_id IS NULL
        ",
    ),
    (
        "chapters_reference_books",
        "chapters whose book is missing",
        "
        SELECT COUNT(*)
        FROM chapters c
        LEFT JOIN books b ON b.book_id = c.book_id
        WHERE b.book_id IS NULL
        ",
    ),
    (
        "viewpoints_reference_chapters",
        "viewpoints whose chapter is missing or belongs to another book",
        "
        SELECT COUNT(*)
        FROM viewpoints v
        LEFT JOIN chapters c ON c.chapter_id = v.chapter_id
        WHERE c.chapter_id IS NULL
           OR c.book_id <> v.book_id
        ",
    ),
    (
        "viewpoints_have_evidence",
        "viewpoints without exactly one evidence record",
        "
        SELECT COUNT(*) FROM (
          SELECT v.viewpoint_id
          FROM viewpoints v
          LEFT JOIN evidence e ON e.viewpoint_id = v.viewpoint_id
          GROUP BY v.viewpoint_id
          HAVING COUNT(e.evidence_id) <> 1
        )
        ",
    ),
    (
        "evidence_references_viewpoints",
        "evidence whose viewpoint is missing or sits in another chapter",
        "
        SELECT COUNT(*)
        FROM evidence e
        LEFT JOIN viewpoints v ON v.viewpoint_id = e.viewpoint_id
        WHERE v.viewpoint_id IS NULL
           OR v.chapter_id <> e.chapter_id
        ",
    ),
    (
        "evidence_paragraph_in_chapter",
        "linked evidence whose paragraph is missing, in another chapter, or misnumbered",
        "
        SELECT COUNT(*)
        FROM evidence e
        LEFT JOIN paragraphs p ON p.paragraph_id = e.paragraph_id
        WHERE e.paragraph_id IS NOT NULL
          AND (p.paragraph_id IS NULL
               OR p.chapter_id <> e.chapter_id
               OR p.paragraph_number IS NOT e.paragraph_number)
        ",
    ),
    (
        "unlinked_evidence_has_no_context",
        "unlinked evidence carrying a paragraph number or context",
        "
        SELECT COUNT(*)
        FROM evidence
        WHERE paragraph_id IS NULL
          AND (paragraph_number IS NOT NULL
               OR context_before IS NOT NULL
               OR context_after IS NOT NULL)
        ",
    ),
    (
        "evidence_context_matches_neighbors",
        "linked evidence whose context differs from the neighboring paragraphs",
        "
        SELECT COUNT(*)
        FROM evidence e
        LEFT JOIN paragraphs prev
          ON prev.chapter_id = e.chapter_id AND prev.paragraph_number = e.paragraph_number - 1
        LEFT JOIN paragraphs next
          ON next.chapter_id = e.chapter_id AND next.paragraph_number = e.paragraph_number + 1
        WHERE e.paragraph_id IS NOT NULL
          AND (e.context_before IS NOT prev.content
               OR e.context_after IS NOT next.content)
        ",
    ),
    (
        "book_counts_match_rows",
        "books whose stored chapter or paragraph count disagrees with their rows",
        "
        SELECT COUNT(*)
        FROM books b
        WHERE b.chapter_count <> (SELECT COUNT(*) FROM chapters c WHERE c.book_id = b.book_id)
           OR b.paragraph_count <> (SELECT COUNT(*) FROM paragraphs p WHERE p.book_id = b.book_id)
        ",
    ),
];

pub fn collect_structural_invariants(connection: &Connection) -> Result<Vec<InvariantCheck>> {
    CHECKS
        .iter()
        .map(|&(name, description, sql)| {
            Ok(InvariantCheck {
                name,
                description,
                violations: query_violation_count(connection, sql)
                    .with_context(|| format!("failed to run invariant check {name}"))?,
            })
        })
        .collect()
}

pub fn query_violation_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get::<_, i64>(0))?;
    Ok(count)
}
