use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::ScanSettings;
use crate::paths;

/// Walk the configured paths and return every file that passes the filters.
///
/// A file is kept when its extension (case-insensitive) is listed and its
/// root-relative path matches no exclude glob. Excluded directories are
/// pruned before descending. Unreadable entries are logged and skipped.
/// The result is sorted and free of duplicates so repeated runs diff cleanly.
pub fn scan(settings: &ScanSettings, root: &Path) -> Vec<PathBuf> {
    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    if !settings.exclude_patterns.is_empty() {
        log::debug!("excluding {}", settings.exclude_patterns.join(", "));
    }

    for start in &settings.paths {
        if !start.exists() {
            log::warn!("scan path {} does not exist, skipping", start.display());
            continue;
        }

        let walker = WalkDir::new(start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| return e.depth() == 0 || !is_excluded(settings, root, e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping unreadable entry under {}: {e}", start.display());
                    continue;
                },
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = paths::normalize(entry.path());
            if has_included_extension(settings, &path) && !is_excluded(settings, root, &path) {
                found.insert(path);
            }
        }
    }

    log::debug!("scan found {} files", found.len());
    return found.into_iter().collect();
}

/// Whether the file's extension is in the include list.
fn has_included_extension(settings: &ScanSettings, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| return e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    return settings.extensions.iter().any(|e| return *e == ext);
}

/// Whether the root-relative path matches any exclude glob.
fn is_excluded(settings: &ScanSettings, root: &Path, path: &Path) -> bool {
    let relative = paths::relative_to_root(path, root);
    return settings.exclude.is_match(relative.as_str());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::config::Config;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x\n").unwrap();
    }

    #[test]
    fn filters_by_extension_and_exclude_glob_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.md");
        write(root, "a.MD");
        write(root, "notes.txt");
        write(root, "docs/archive/old.md");
        write(root, "docs/guide.md");

        let config = Config::parse(
            root,
            &root.join(".autoxref.toml"),
            "exclude_patterns = [\"docs/archive\", \"docs/archive/**\"]",
        )
        .unwrap();

        let files = scan(&config.scan, root);
        let rel: Vec<String> = files.iter().map(|f| paths::relative_to_root(f, root)).collect();
        assert_eq!(rel, vec!["a.MD", "b.md", "docs/guide.md"]);
    }

    #[test]
    fn accepts_single_files_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "one.md");

        let config = Config::load(root, None).unwrap();
        let settings = config
            .scan
            .with_paths(vec![root.join("one.md"), root.to_path_buf(), root.join("missing")]);

        let files = scan(&settings, root);
        assert_eq!(files, vec![root.join("one.md")]);
    }
}
