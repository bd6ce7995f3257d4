//! CLI commands for autoxref: scan and regen. `watch` lives in its own module.

use std::io::{BufRead as _, Write as _};
use std::path::Path;
use std::process::ExitCode;

use crate::config::Config;
use crate::error;
use crate::injector::InjectStatus;
use crate::orchestrator::{self, AutoApprove, RunSummary, ScanOptions, StdinApprover};
use crate::regen::{self, RegenFile, RegenOptions, RegenReport};
use crate::report;

/// Ask a yes/no question on stderr; anything but `y`/`yes` (including EOF) is no.
fn confirm(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    return matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
}

/// One line per file that is not already compliant.
fn print_regen_file(record: &RegenFile) {
    let Some(outcome) = &record.outcome else {
        let reason = record.error.as_deref().unwrap_or("unknown error");
        println!("ERROR   {}  ({reason})", record.file);
        return;
    };

    let label = match outcome.status {
        InjectStatus::DiagnoseOnly if outcome.is_compliant => return,
        InjectStatus::SkippedIdempotent | InjectStatus::SkippedSelfReference => return,
        InjectStatus::DiagnoseOnly => "DRIFT  ",
        InjectStatus::DryRunWouldModify => "WOULD  ",
        InjectStatus::Modified => "FIXED  ",
        InjectStatus::PurgedLegacyRefs => "PURGED ",
    };

    let mut changes: Vec<String> = outcome.references_added.iter().map(|r| return format!("+{r}")).collect();
    changes.extend(outcome.references_purged.iter().map(|r| return format!("-{r}")));
    println!("{label} {}  {}", record.file, changes.join(" "));
}

fn print_regen_summary(report: &RegenReport) {
    let c = &report.counts;
    println!();
    println!(
        "{} files: {} compliant, {} non-compliant, {} errors",
        c.files, c.compliant, c.non_compliant, c.errors
    );
    if c.modified > 0 || c.purged_only > 0 {
        println!("{} rewritten, {} purged only", c.modified, c.purged_only);
    }
    if c.would_modify > 0 {
        println!("{} would be rewritten (dry run)", c.would_modify);
    }
}

fn print_scan_summary(summary: &RunSummary, apply: bool) {
    let ok = summary.files_processed.saturating_sub(summary.files_skipped_error);
    println!();
    println!(
        "{} files processed: {ok} ok, {} skipped due to errors",
        summary.files_processed, summary.files_skipped_error
    );
    println!(
        "{} candidates, {} unresolved, {} suggestions",
        summary.candidates_found, summary.unresolved, summary.suggestions_made
    );
    if apply {
        println!(
            "{} injected, {} declined, {} failed, {} not applied",
            summary.references_injected,
            summary.suggestions_declined,
            summary.injections_failed,
            summary.not_applied()
        );
    } else {
        println!(
            "{} references would be injected (dry run, pass --apply to write)",
            summary.references_would_inject
        );
    }
}

/// Run the core-standard sweep and report per file.
///
/// Exits 1 when a `full` sweep leaves any file non-compliant.
///
/// # Errors
///
/// Returns configuration errors (core standard, bad `--paths` globs) and
/// report write failures. Per-file failures are reported, not returned.
pub fn regen(
    config: &Config,
    options: &RegenOptions,
    yes: bool,
    output: Option<&Path>,
) -> Result<ExitCode, error::Error> {
    let core_refs = regen::load_core_refs(config)?;
    let files = regen::select_files(config, options)?;

    if options.writes() && !yes {
        let question = format!("Rewrite reference blocks in up to {} files?", files.len());
        if !confirm(&question) {
            eprintln!("regen: aborted, nothing written");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let report = regen::run(config, &core_refs, &files, options);
    for record in &report.files {
        print_regen_file(record);
    }
    print_regen_summary(&report);

    if let Some(path) = output {
        report::write_json(path, &report)?;
    }

    if report.strict_failure() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Detect unlinked mentions and print (or apply) the suggestions.
///
/// Always exits 0 on completion; suggestions are not a failure.
///
/// # Errors
///
/// Returns `Error::WriteFailed` / `Error::Json` if the report cannot be written.
pub fn scan(config: &Config, options: &ScanOptions, output: Option<&Path>) -> Result<ExitCode, error::Error> {
    let summary = if options.apply && options.interactive {
        orchestrator::run_scan(config, options, &mut StdinApprover)
    } else {
        orchestrator::run_scan(config, options, &mut AutoApprove)
    };

    for s in &summary.suggestions {
        println!(
            "{}:{}  {} -> {}  ({})",
            s.file, s.line_number, s.candidate_text, s.reference, s.resolved_by
        );
    }
    print_scan_summary(&summary, options.apply);

    if let Some(path) = output {
        report::write_json(path, &summary)?;
    }
    return Ok(ExitCode::SUCCESS);
}
