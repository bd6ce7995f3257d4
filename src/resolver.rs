use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::paths;
use crate::types::{FileIndex, PotentialCandidate, ResolvedBy, ResolvedReference};

/// Map a candidate to an existing file, trying each strategy in priority order.
///
/// 1. the explicit link target, relative to the source file's directory;
/// 2. the configured known-terms table (case-insensitive);
/// 3. the file index (case-insensitive filename or title);
/// 4. a file of that exact name in one of the heuristic search directories,
///    only when the candidate text contains a `.`.
///
/// Returns `None` when nothing matches; the caller reports it as unresolved.
pub fn resolve(
    candidate: &PotentialCandidate,
    index: &FileIndex,
    config: &Config,
    source: &Path,
    root: &Path,
) -> Option<ResolvedReference> {
    if let Some(found) = resolve_explicit_link(candidate, source, root) {
        return Some(found);
    }
    if let Some(found) = resolve_known_term(candidate, config) {
        return Some(found);
    }
    if let Some(found) = resolve_from_index(candidate, index) {
        return Some(found);
    }
    return resolve_heuristic(candidate, config);
}

fn resolve_explicit_link(candidate: &PotentialCandidate, source: &Path, root: &Path) -> Option<ResolvedReference> {
    let target = candidate.original_link_target.as_deref()?;
    let base = source.parent().unwrap_or(root);
    let path = paths::anchor(base, Path::new(target));
    if !path.exists() {
        log::debug!(
            "{}:{}: link target {target} does not exist",
            source.display(),
            candidate.line_number
        );
        return None;
    }
    return Some(ResolvedReference {
        preferred_link_text: candidate.candidate_text.clone(),
        resolved_absolute_path: path,
        resolved_by: ResolvedBy::ExplicitLink,
    });
}

fn resolve_from_index(candidate: &PotentialCandidate, index: &FileIndex) -> Option<ResolvedReference> {
    let path = index.get(&candidate.candidate_text)?;
    let preferred = index
        .title_of(path)
        .map_or_else(|| return candidate.candidate_text.clone(), ToString::to_string);
    return Some(ResolvedReference {
        preferred_link_text: preferred,
        resolved_absolute_path: path.to_path_buf(),
        resolved_by: ResolvedBy::FileIndex,
    });
}

/// Probe the heuristic directories in order.
///
/// When several directories hold a file of that name the match is ambiguous;
/// every hit is logged and the first in configured order is taken.
fn resolve_heuristic(candidate: &PotentialCandidate, config: &Config) -> Option<ResolvedReference> {
    let name = candidate.candidate_text.trim();
    if !name.contains('.') {
        return None;
    }

    let hits: Vec<PathBuf> = config
        .heuristic_search_dirs
        .iter()
        .map(|dir| return paths::anchor(dir, Path::new(name)))
        .filter(|p| return p.is_file())
        .collect();

    let first = hits.first()?.clone();
    if hits.len() > 1 {
        let listed: Vec<String> = hits.iter().map(|p| return p.display().to_string()).collect();
        log::warn!(
            "{}:{}: `{name}` is ambiguous, found in {}; using {}",
            candidate.source_file_path.display(),
            candidate.line_number,
            listed.join(", "),
            first.display()
        );
    }

    return Some(ResolvedReference {
        preferred_link_text: candidate.candidate_text.clone(),
        resolved_absolute_path: first,
        resolved_by: ResolvedBy::HeuristicFilename,
    });
}

fn resolve_known_term(candidate: &PotentialCandidate, config: &Config) -> Option<ResolvedReference> {
    let wanted = candidate.candidate_text.to_lowercase();
    let (term, path) = config
        .known_terms
        .iter()
        .find(|(term, _)| return term.to_lowercase() == wanted)?;

    if !path.exists() {
        log::warn!(
            "known term `{term}` maps to {}, which does not exist",
            path.display()
        );
        return None;
    }
    return Some(ResolvedReference {
        preferred_link_text: candidate.candidate_text.clone(),
        resolved_absolute_path: path.clone(),
        resolved_by: ResolvedBy::KnownTermsMap,
    });
}
