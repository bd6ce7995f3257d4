use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backup::Backups;
use crate::block::Document;
use crate::checker;
use crate::error::Error;
use crate::paths;

/// The reference universe for the core-standard modes.
#[derive(Debug, Clone, Default)]
pub struct CoreRefs {
    /// Every entry that may legitimately appear in a block.
    pub all_valid: Vec<String>,
    /// Entries each file must list.
    pub ensure: Vec<String>,
}

/// What an injection should do.
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    /// Report what `FixCore` would change without writing.
    Diagnose(&'a CoreRefs),
    /// Ensure the core references and purge everything outside the valid set.
    FixCore(&'a CoreRefs),
    /// `FixCore`, skipping files that are already compliant.
    Full(&'a CoreRefs),
    /// Add a single entry, creating the block when needed.
    Legacy {
        /// Spelling written into the block.
        entry: &'a str,
        /// Absolute file the entry points at.
        target: &'a Path,
    },
}

/// Result of one injection.
#[derive(Debug, Clone, Serialize)]
pub struct InjectOutcome {
    /// Backup made before the write, if any.
    pub backup: Option<PathBuf>,
    /// Whether the file on disk was rewritten.
    pub content_changed: bool,
    /// Whether the block is (or now is) in the required state.
    pub is_compliant: bool,
    /// Required entries that were absent before this call.
    pub missing_references: Vec<String>,
    /// Entries added, or that would be added.
    pub references_added: Vec<String>,
    /// Entries removed, or that would be removed.
    pub references_purged: Vec<String>,
    pub status: InjectStatus,
}

/// Outcome category of one injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectStatus {
    /// Analysis only; nothing written.
    DiagnoseOnly,
    /// A write was needed but this is a dry run.
    DryRunWouldModify,
    /// Block rewritten with at least one new entry.
    Modified,
    /// Block rewritten only to remove entries.
    PurgedLegacyRefs,
    /// Already in the required state.
    SkippedIdempotent,
    /// The entry would point at the file itself.
    SkippedSelfReference,
}

/// Entry-level changes a standard mode would make.
struct Plan {
    added: Vec<String>,
    entries: Vec<String>,
    purged: Vec<String>,
}

/// Bring `file`'s reference block in line with `mode`.
///
/// Nothing is written for `Diagnose`, for a dry run, or when the file is
/// already compliant. Otherwise the original is backed up (when enabled)
/// and then the whole file is rewritten.
///
/// # Errors
///
/// Returns `Error::ReadFailed` / `Error::Utf8` if the file cannot be read,
/// `Error::BackupFailed` if the backup fails (the file is left untouched),
/// and `Error::WriteFailed` if the rewrite fails.
pub fn inject(
    file: &Path,
    mode: Mode<'_>,
    dry_run: bool,
    root: &Path,
    backups: &Backups,
) -> Result<InjectOutcome, Error> {
    let bytes = std::fs::read(file).map_err(|source| {
        return Error::ReadFailed {
            file: file.to_path_buf(),
            source,
        };
    })?;
    let content = String::from_utf8(bytes).map_err(|_| {
        return Error::Utf8 {
            file: file.to_path_buf(),
        };
    })?;
    let mut doc = Document::new(file, &content);

    return match mode {
        Mode::Legacy { entry, target } => {
            inject_single(file, &mut doc, entry, target, dry_run, root, backups)
        },
        Mode::Diagnose(refs) => {
            let plan = plan_standard(file, &doc, refs, root);
            let compliant = plan.added.is_empty() && plan.purged.is_empty();
            Ok(InjectOutcome {
                backup: None,
                content_changed: false,
                is_compliant: compliant,
                missing_references: plan.added.clone(),
                references_added: plan.added,
                references_purged: plan.purged,
                status: InjectStatus::DiagnoseOnly,
            })
        },
        Mode::FixCore(refs) | Mode::Full(refs) => {
            let plan = plan_standard(file, &doc, refs, root);
            if plan.added.is_empty() && plan.purged.is_empty() {
                log::debug!("{} is compliant", file.display());
                return Ok(InjectOutcome {
                    backup: None,
                    content_changed: false,
                    is_compliant: true,
                    missing_references: Vec::new(),
                    references_added: Vec::new(),
                    references_purged: Vec::new(),
                    status: InjectStatus::SkippedIdempotent,
                });
            }

            let status = if plan.added.is_empty() {
                InjectStatus::PurgedLegacyRefs
            } else {
                InjectStatus::Modified
            };
            let mut outcome = InjectOutcome {
                backup: None,
                content_changed: false,
                is_compliant: false,
                missing_references: plan.added.clone(),
                references_added: plan.added,
                references_purged: plan.purged,
                status: InjectStatus::DryRunWouldModify,
            };
            if dry_run {
                return Ok(outcome);
            }

            doc.set_entries(&plan.entries);
            outcome.backup = write_with_backup(file, &doc, backups)?;
            outcome.content_changed = true;
            outcome.is_compliant = true;
            outcome.status = status;
            log::info!(
                "{}: added {:?}, purged {:?}",
                file.display(),
                outcome.references_added,
                outcome.references_purged
            );
            Ok(outcome)
        },
    };
}

fn inject_single(
    file: &Path,
    doc: &mut Document,
    entry: &str,
    target: &Path,
    dry_run: bool,
    root: &Path,
    backups: &Backups,
) -> Result<InjectOutcome, Error> {
    let mut outcome = InjectOutcome {
        backup: None,
        content_changed: false,
        is_compliant: true,
        missing_references: Vec::new(),
        references_added: Vec::new(),
        references_purged: Vec::new(),
        status: InjectStatus::SkippedIdempotent,
    };

    if paths::comparison_key(target) == paths::comparison_key(file) || is_self_entry(file, entry, root) {
        log::warn!("{}: refusing to reference itself via `{entry}`", file.display());
        outcome.status = InjectStatus::SkippedSelfReference;
        return Ok(outcome);
    }

    let existing = checker::entry_keys(file, root, &doc.entries());
    if existing.contains(&paths::comparison_key(target)) {
        return Ok(outcome);
    }

    outcome.missing_references = vec![entry.to_string()];
    outcome.references_added = vec![entry.to_string()];
    if dry_run {
        outcome.is_compliant = false;
        outcome.status = InjectStatus::DryRunWouldModify;
        return Ok(outcome);
    }

    doc.add_entry(entry);
    outcome.backup = write_with_backup(file, doc, backups)?;
    outcome.content_changed = true;
    outcome.status = InjectStatus::Modified;
    log::info!("{}: added reference {entry}", file.display());
    return Ok(outcome);
}

/// Whether `entry`, as written in `file`, names `file` itself.
pub fn is_self_entry(file: &Path, entry: &str, root: &Path) -> bool {
    if entry.eq_ignore_ascii_case(&paths::file_name(file)) {
        return true;
    }
    let own = paths::comparison_key(file);
    return checker::entry_keys(file, root, &[entry.to_string()]).contains(&own);
}

fn key(entry: &str) -> String {
    return paths::comparison_key(Path::new(entry));
}

/// Decide the final entry list for a standard mode.
///
/// Existing entries survive when they are in the valid set, are not the file
/// itself, and have not appeared earlier in the block. Ensured entries that
/// are still absent are appended in the order given.
fn plan_standard(file: &Path, doc: &Document, refs: &CoreRefs, root: &Path) -> Plan {
    let valid: HashSet<String> = refs
        .all_valid
        .iter()
        .chain(&refs.ensure)
        .map(|e| return key(e))
        .collect();

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut purged = Vec::new();

    for entry in doc.entries() {
        let k = key(&entry);
        if is_self_entry(file, &entry, root) || !valid.contains(&k) || !seen.insert(k) {
            purged.push(entry);
            continue;
        }
        entries.push(entry);
    }

    let mut added = Vec::new();
    for entry in &refs.ensure {
        if is_self_entry(file, entry, root) {
            continue;
        }
        if seen.insert(key(entry)) {
            entries.push(entry.clone());
            added.push(entry.clone());
        }
    }

    return Plan { added, entries, purged };
}

/// Back up the original, then write the rendered document over it.
fn write_with_backup(file: &Path, doc: &Document, backups: &Backups) -> Result<Option<PathBuf>, Error> {
    let backup = backups.ensure(file)?;
    std::fs::write(file, doc.render()).map_err(|source| {
        return Error::WriteFailed {
            file: file.to_path_buf(),
            source,
        };
    })?;
    return Ok(backup);
}
