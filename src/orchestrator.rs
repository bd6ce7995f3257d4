//! End-to-end scan: index once, then detect, resolve, check, and inject per file.

use std::collections::HashSet;
use std::io::{BufRead as _, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backup::Backups;
use crate::checker;
use crate::config::Config;
use crate::detector::Detector;
use crate::index;
use crate::injector::{self, Mode};
use crate::paths;
use crate::resolver;
use crate::scanner;
use crate::types::{FileIndex, ResolvedBy};

/// Decides whether one suggestion gets applied.
pub trait Approver {
    fn approve(&mut self, suggestion: &Suggestion) -> bool;
}

/// Approves everything; used for non-interactive runs.
pub struct AutoApprove;

impl Approver for AutoApprove {
    fn approve(&mut self, _suggestion: &Suggestion) -> bool {
        return true;
    }
}

/// Shared, read-only state for processing one file.
struct Context<'a> {
    apply: bool,
    backups: &'a Backups,
    config: &'a Config,
    detector: &'a Detector,
    index: &'a FileIndex,
}

/// Counters and suggestions from a single file, merged into the summary.
#[derive(Default)]
struct FileReport {
    candidates_found: usize,
    declined: usize,
    failed: usize,
    injected: usize,
    skipped_error: bool,
    suggestions: Vec<Suggestion>,
    unresolved: usize,
    would_inject: usize,
}

/// Aggregated outcome of a scan run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub candidates_found: usize,
    pub files_processed: usize,
    /// Files whose content could not be read or decoded.
    pub files_skipped_error: usize,
    /// Injections that failed on backup or write.
    pub injections_failed: usize,
    pub references_injected: usize,
    /// Suggestions a dry run would have applied.
    pub references_would_inject: usize,
    pub suggestions_declined: usize,
    pub suggestions_made: usize,
    /// Sorted by file, then line.
    pub suggestions: Vec<Suggestion>,
    /// Candidates no resolver strategy could map to a file.
    pub unresolved: usize,
}

impl RunSummary {
    /// Suggestions that did not end up on disk, whatever the reason.
    pub const fn not_applied(&self) -> usize {
        return self.suggestions_made.saturating_sub(self.references_injected);
    }

    fn absorb(&mut self, report: FileReport) {
        self.files_processed = self.files_processed.saturating_add(1);
        if report.skipped_error {
            self.files_skipped_error = self.files_skipped_error.saturating_add(1);
        }
        self.candidates_found = self.candidates_found.saturating_add(report.candidates_found);
        self.unresolved = self.unresolved.saturating_add(report.unresolved);
        self.suggestions_made = self.suggestions_made.saturating_add(report.suggestions.len());
        self.references_injected = self.references_injected.saturating_add(report.injected);
        self.references_would_inject = self.references_would_inject.saturating_add(report.would_inject);
        self.injections_failed = self.injections_failed.saturating_add(report.failed);
        self.suggestions_declined = self.suggestions_declined.saturating_add(report.declined);
        self.suggestions.extend(report.suggestions);
    }
}

/// Options for one scan run.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Write accepted suggestions into files.
    pub apply: bool,
    /// Ask before each injection; forces a single worker.
    pub interactive: bool,
    /// Worker threads; 0 and 1 both mean sequential.
    pub jobs: usize,
    /// Explicit files or directories overriding `scan_paths`.
    pub paths: Option<Vec<PathBuf>>,
}

/// Prompts on stderr and reads the answer from stdin. Anything but `y`/`yes` declines.
pub struct StdinApprover;

impl Approver for StdinApprover {
    fn approve(&mut self, suggestion: &Suggestion) -> bool {
        eprint!(
            "{}:{}: add `{}` for `{}`? [y/N] ",
            suggestion.file, suggestion.line_number, suggestion.reference, suggestion.candidate_text
        );
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        return matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
    }
}

/// A resolved mention that is missing from its file's reference block.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub candidate_text: String,
    /// Source file, relative to the project root.
    pub file: String,
    pub identification_method: String,
    pub line_number: usize,
    pub preferred_link_text: String,
    /// Spelling that is (or would be) written into the block.
    pub reference: String,
    pub resolved_by: ResolvedBy,
    /// Target file, relative to the project root.
    pub target: String,
}

/// Run the whole pipeline over the configured (or given) paths.
///
/// Per-file failures are logged and counted; they never stop the run.
pub fn run_scan(config: &Config, options: &ScanOptions, approver: &mut dyn Approver) -> RunSummary {
    let index = index::build_file_index(&config.index, &config.root);

    let settings = match &options.paths {
        Some(p) => config.scan.with_paths(p.clone()),
        None => config.scan.clone(),
    };
    let files = scanner::scan(&settings, &config.root);
    log::info!("scanning {} files", files.len());

    let detector = Detector::new(config);
    let backups = Backups::new(config.backup.clone());
    let ctx = Context {
        apply: options.apply,
        backups: &backups,
        config,
        detector: &detector,
        index: &index,
    };

    let jobs = if options.interactive { 1 } else { options.jobs.max(1) };
    let mut summary = RunSummary::default();
    if jobs == 1 || files.len() < 2 {
        for file in &files {
            summary.absorb(process_file(&ctx, file, approver));
        }
    } else {
        run_parallel(&ctx, &files, jobs, &mut summary);
    }

    summary
        .suggestions
        .sort_by(|a, b| return a.file.cmp(&b.file).then(a.line_number.cmp(&b.line_number)));
    return summary;
}

/// Detect, resolve, check, and optionally inject for one file.
fn process_file(ctx: &Context<'_>, file: &Path, approver: &mut dyn Approver) -> FileReport {
    let root = ctx.config.root.as_path();
    let mut report = FileReport::default();

    let candidates = match ctx.detector.detect(file) {
        Ok(c) => c,
        Err(e) => {
            log::error!("skipping file: {e}");
            report.skipped_error = true;
            return report;
        },
    };
    report.candidates_found = candidates.len();

    let own_key = paths::comparison_key(file);
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in &candidates {
        let Some(resolved) = resolver::resolve(candidate, ctx.index, ctx.config, file, root) else {
            log::debug!(
                "{}:{}: unresolved `{}`",
                paths::relative_to_root(file, root),
                candidate.line_number,
                candidate.candidate_text
            );
            report.unresolved = report.unresolved.saturating_add(1);
            continue;
        };

        let target = resolved.resolved_absolute_path.as_path();
        let key = paths::comparison_key(target);
        if key == own_key || !seen.insert(key) {
            continue;
        }
        if checker::is_reference_present(file, target, root) {
            continue;
        }

        let suggestion = Suggestion {
            candidate_text: candidate.candidate_text.clone(),
            file: paths::relative_to_root(file, root),
            identification_method: candidate.identification_method.to_string(),
            line_number: candidate.line_number,
            preferred_link_text: resolved.preferred_link_text.clone(),
            reference: paths::reference_spelling(file, target, root),
            resolved_by: resolved.resolved_by,
            target: paths::relative_to_root(target, root),
        };
        log::debug!(
            "{}:{}: `{}` resolved by {} to {}",
            suggestion.file,
            suggestion.line_number,
            suggestion.candidate_text,
            suggestion.resolved_by,
            suggestion.target
        );

        if !ctx.apply {
            report.would_inject = report.would_inject.saturating_add(1);
        } else if !approver.approve(&suggestion) {
            report.declined = report.declined.saturating_add(1);
        } else {
            let mode = Mode::Legacy {
                entry: &suggestion.reference,
                target,
            };
            match injector::inject(file, mode, false, root, ctx.backups) {
                Ok(outcome) if outcome.content_changed => {
                    report.injected = report.injected.saturating_add(1);
                },
                Ok(outcome) => {
                    log::debug!("{}: {:?}", suggestion.file, outcome.status);
                },
                Err(e) => {
                    log::error!("injection failed: {e}");
                    report.failed = report.failed.saturating_add(1);
                },
            }
        }
        report.suggestions.push(suggestion);
    }

    return report;
}

/// Worker pool over independent files; the calling thread is the only aggregator.
fn run_parallel(ctx: &Context<'_>, files: &[PathBuf], jobs: usize, summary: &mut RunSummary) {
    let (work_tx, work_rx) = crossbeam_channel::unbounded::<&Path>();
    let (done_tx, done_rx) = crossbeam_channel::unbounded::<FileReport>();

    for file in files {
        let _ = work_tx.send(file.as_path());
    }
    drop(work_tx);

    log::debug!("processing with {jobs} workers");
    std::thread::scope(|s| {
        for _ in 0..jobs {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            s.spawn(move || {
                for file in work_rx.iter() {
                    if done_tx.send(process_file(ctx, file, &mut AutoApprove)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        for report in done_rx.iter() {
            summary.absorb(report);
        }
    });
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;

    /// Declines every suggestion and remembers what it was asked.
    struct Decline(Vec<String>);

    impl Approver for Decline {
        fn approve(&mut self, suggestion: &Suggestion) -> bool {
            self.0.push(suggestion.reference.clone());
            return false;
        }
    }

    fn project(config: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MQP.md"), "# MQP\n").unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(
            dir.path().join("docs/guide.md"),
            "See MQP for guidance.\nMQP again.\nAlso [missing](nowhere.md).\n",
        )
        .unwrap();
        let config = Config::parse(dir.path(), &dir.path().join(".autoxref.toml"), config).unwrap();
        return (dir, config);
    }

    const KNOWN: &str = "standalone_keywords = [\"MQP\"]\n[known_terms_to_paths]\nMQP = \"MQP.md\"\n";

    #[test]
    fn dry_run_suggests_once_per_target_and_writes_nothing() {
        let (dir, config) = project(KNOWN);
        let summary = run_scan(&config, &ScanOptions::default(), &mut AutoApprove);

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.suggestions_made, 1);
        assert_eq!(summary.references_would_inject, 1);
        assert_eq!(summary.references_injected, 0);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.suggestions[0].reference, "../MQP.md");
        assert_eq!(summary.suggestions[0].resolved_by, ResolvedBy::KnownTermsMap);
        assert!(!std::fs::read_to_string(dir.path().join("docs/guide.md")).unwrap().contains("@references"));
    }

    #[test]
    fn apply_injects_and_second_run_is_quiet() {
        let (dir, config) = project(KNOWN);
        let options = ScanOptions {
            apply: true,
            ..ScanOptions::default()
        };

        let first = run_scan(&config, &options, &mut AutoApprove);
        assert_eq!(first.references_injected, 1);
        let content = std::fs::read_to_string(dir.path().join("docs/guide.md")).unwrap();
        assert!(content.starts_with("@references:\n- ../MQP.md\n\n"));

        let second = run_scan(&config, &options, &mut AutoApprove);
        assert_eq!(second.suggestions_made, 0);
        assert_eq!(second.references_injected, 0);
    }

    #[test]
    fn declined_suggestions_are_counted_not_applied() {
        let (dir, config) = project(KNOWN);
        let options = ScanOptions {
            apply: true,
            interactive: true,
            jobs: 4,
            ..ScanOptions::default()
        };
        let mut decline = Decline(Vec::new());

        let summary = run_scan(&config, &options, &mut decline);
        assert_eq!(decline.0, vec!["../MQP.md".to_string()]);
        assert_eq!(summary.suggestions_declined, 1);
        assert_eq!(summary.not_applied(), 1);
        assert!(!std::fs::read_to_string(dir.path().join("docs/guide.md")).unwrap().contains("@references"));
    }

    #[test]
    fn parallel_run_matches_sequential_counts() {
        let (dir, config) = project(KNOWN);
        for n in 0..6 {
            std::fs::write(dir.path().join(format!("note{n}.md")), "MQP\n").unwrap();
        }
        let options = ScanOptions {
            jobs: 3,
            ..ScanOptions::default()
        };

        let summary = run_scan(&config, &options, &mut AutoApprove);
        assert_eq!(summary.files_processed, 8);
        assert_eq!(summary.suggestions_made, 7);
        assert_eq!(summary.suggestions[0].file, "docs/guide.md");
    }

    #[test]
    fn unreadable_file_is_skipped_with_error_count() {
        let (dir, config) = project(KNOWN);
        std::fs::write(dir.path().join("bad.md"), [0xff, 0xfe]).unwrap();

        let summary = run_scan(&config, &ScanOptions::default(), &mut AutoApprove);
        assert_eq!(summary.files_skipped_error, 1);
        assert_eq!(summary.files_processed, 3);
    }
}
