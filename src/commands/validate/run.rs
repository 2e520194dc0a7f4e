use super::*;

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub db_path: String,
    pub status: String,
    pub violations_total: i64,
    pub checks: Vec<InvariantCheck>,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));
    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join("validation_report.json")
    });

    if !db_path.exists() {
        bail!("database not found: {}", db_path.display());
    }
    let connection = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let report = build_report(&connection, &db_path.display().to_string())?;
    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote validation report");

    for check in report.checks.iter().filter(|check| !check.passed()) {
        warn!(
            check = check.name,
            violations = check.violations,
            description = check.description,
            "invariant violated"
        );
    }

    if report.violations_total > 0 {
        bail!(
            "validation failed: {} violation(s) across {} check(s)",
            report.violations_total,
            report.checks.iter().filter(|check| !check.passed()).count()
        );
    }

    info!(checks = report.checks.len(), "validation passed");
    Ok(())
}

pub(super) fn build_report(connection: &Connection, db_path: &str) -> Result<ValidationReport> {
    let checks = collect_structural_invariants(connection)?;
    let violations_total = checks.iter().map(|check| check.violations).sum::<i64>();

    Ok(ValidationReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        db_path: db_path.to_string(),
        status: if violations_total == 0 { "pass" } else { "fail" }.to_string(),
        violations_total,
        checks,
    })
}
