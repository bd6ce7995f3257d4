//! Core-standard sweep: make every scanned file reference the core documents.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSetBuilder};
use serde::Serialize;

use crate::backup::Backups;
use crate::config::Config;
use crate::error::Error;
use crate::frontmatter;
use crate::injector::{self, CoreRefs, InjectOutcome, InjectStatus, Mode};
use crate::paths;
use crate::scanner;

/// Counters over one sweep.
#[derive(Debug, Default, Serialize)]
pub struct RegenCounts {
    pub compliant: usize,
    pub errors: usize,
    pub files: usize,
    pub modified: usize,
    /// Files that are not in the required state after the sweep.
    pub non_compliant: usize,
    pub purged_only: usize,
    pub would_modify: usize,
}

/// Per-file record in the report.
#[derive(Debug, Serialize)]
pub struct RegenFile {
    /// Error text when the file could not be handled.
    pub error: Option<String>,
    /// Path relative to the project root.
    pub file: String,
    pub outcome: Option<InjectOutcome>,
}

/// Which standard injector mode the sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RegenMode {
    /// Report only.
    Diagnose,
    /// Ensure core references and purge the rest.
    FixCore,
    /// Like `fix-core`, and fail when anything stays non-compliant.
    Full,
}

/// Knobs for one sweep.
#[derive(Debug, Clone)]
pub struct RegenOptions {
    pub dry_run: bool,
    /// Only process files whose root-relative path matches one of these globs.
    pub globs: Vec<String>,
    /// Stop after this many files.
    pub max_files: Option<usize>,
    pub mode: RegenMode,
}

impl RegenOptions {
    /// Whether this sweep may write files.
    pub fn writes(&self) -> bool {
        return self.mode != RegenMode::Diagnose && !self.dry_run;
    }
}

/// Full result of a sweep, written as JSON with `--output`.
#[derive(Debug, Serialize)]
pub struct RegenReport {
    pub core_refs: Vec<String>,
    pub counts: RegenCounts,
    pub dry_run: bool,
    pub files: Vec<RegenFile>,
    pub mode: RegenMode,
}

impl RegenReport {
    /// Whether a `full` sweep left files behind, which fails the run.
    pub const fn strict_failure(&self) -> bool {
        return matches!(self.mode, RegenMode::Full) && self.counts.non_compliant > 0;
    }
}

/// Core references listed in the front matter of the configured standard document.
///
/// # Errors
///
/// Returns `Error::CoreStandardInvalid` when no standard is configured, it
/// cannot be read, its front matter is malformed, or it lists no `core_refs`.
pub fn load_core_refs(config: &Config) -> Result<Vec<String>, Error> {
    let Some(path) = config.core_standard.clone() else {
        return Err(Error::CoreStandardInvalid {
            path: config.root.join(crate::config::DEFAULT_CONFIG_FILE),
            reason: "`core_standard` is not set in the configuration".to_string(),
        });
    };

    let invalid = |reason: String| {
        return Error::CoreStandardInvalid {
            path: path.clone(),
            reason,
        };
    };

    let content = std::fs::read_to_string(&path).map_err(|e| return invalid(e.to_string()))?;
    let front = frontmatter::parse(&content)
        .map_err(|e| return invalid(format!("front matter is not valid YAML: {e}")))?
        .ok_or_else(|| return invalid("no front matter block".to_string()))?;
    let refs: Vec<String> = front
        .core_refs
        .ok_or_else(|| return invalid("front matter has no `core_refs` list".to_string()))?
        .into_iter()
        .map(|r| return r.trim().to_string())
        .filter(|r| return !r.is_empty())
        .collect();

    log::info!("{} core references from {}", refs.len(), path.display());
    return Ok(refs);
}

/// Run the sweep over `files`.
///
/// Files that fail are logged, recorded with their error, and counted as
/// non-compliant; the sweep always continues.
pub fn run(config: &Config, core_refs: &[String], files: &[PathBuf], options: &RegenOptions) -> RegenReport {
    let root = config.root.as_path();
    let backups = Backups::new(config.backup.clone());
    let mut counts = RegenCounts::default();
    let mut records = Vec::with_capacity(files.len());

    for file in files {
        let refs = CoreRefs {
            all_valid: core_refs.to_vec(),
            ensure: ensure_for(file, core_refs, root),
        };
        let mode = match options.mode {
            RegenMode::Diagnose => Mode::Diagnose(&refs),
            RegenMode::FixCore => Mode::FixCore(&refs),
            RegenMode::Full => Mode::Full(&refs),
        };

        counts.files = counts.files.saturating_add(1);
        let rel = paths::relative_to_root(file, root);
        match injector::inject(file, mode, options.dry_run, root, &backups) {
            Ok(outcome) => {
                tally(&mut counts, &outcome);
                records.push(RegenFile {
                    error: None,
                    file: rel,
                    outcome: Some(outcome),
                });
            },
            Err(e) => {
                log::error!("{e}");
                counts.errors = counts.errors.saturating_add(1);
                counts.non_compliant = counts.non_compliant.saturating_add(1);
                records.push(RegenFile {
                    error: Some(e.to_string()),
                    file: rel,
                    outcome: None,
                });
            },
        }
    }

    return RegenReport {
        core_refs: core_refs.to_vec(),
        counts,
        dry_run: options.dry_run,
        files: records,
        mode: options.mode,
    };
}

/// Files the sweep will visit: the configured scan, narrowed by globs and capped.
///
/// # Errors
///
/// Returns `Error::InvalidGlob` for a bad `--paths` pattern.
pub fn select_files(config: &Config, options: &RegenOptions) -> Result<Vec<PathBuf>, Error> {
    let mut files = scanner::scan(&config.scan, &config.root);

    if !options.globs.is_empty() {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.globs {
            let glob = Glob::new(pattern).map_err(|e| {
                return Error::InvalidGlob {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                };
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| {
            return Error::InvalidGlob {
                pattern: options.globs.join(", "),
                reason: e.to_string(),
            };
        })?;
        files.retain(|f| return set.is_match(paths::relative_to_root(f, &config.root)));
    }

    if let Some(max) = options.max_files {
        files.truncate(max);
    }
    return Ok(files);
}

/// Core references minus any that point at `file` itself.
fn ensure_for(file: &Path, core_refs: &[String], root: &Path) -> Vec<String> {
    return core_refs
        .iter()
        .filter(|r| return !injector::is_self_entry(file, r, root))
        .cloned()
        .collect();
}

fn tally(counts: &mut RegenCounts, outcome: &InjectOutcome) {
    if outcome.is_compliant {
        counts.compliant = counts.compliant.saturating_add(1);
    } else {
        counts.non_compliant = counts.non_compliant.saturating_add(1);
    }
    match outcome.status {
        InjectStatus::Modified => counts.modified = counts.modified.saturating_add(1),
        InjectStatus::PurgedLegacyRefs => counts.purged_only = counts.purged_only.saturating_add(1),
        InjectStatus::DryRunWouldModify => counts.would_modify = counts.would_modify.saturating_add(1),
        InjectStatus::DiagnoseOnly | InjectStatus::SkippedIdempotent | InjectStatus::SkippedSelfReference => {},
    }
}
