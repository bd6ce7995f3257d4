use std::collections::HashSet;
use std::path::Path;

use crate::block::Document;
use crate::paths;

/// Whether `source`'s reference block already lists `target`.
///
/// Entries are compared after normalization and case folding. An entry is
/// tried relative to the source file's directory and, unless it starts with
/// `.`, relative to the project root as well. A file without a block, or one
/// that cannot be read, has no references.
pub fn is_reference_present(source: &Path, target: &Path, root: &Path) -> bool {
    let content = match std::fs::read_to_string(source) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("cannot read {} to check references: {e}", source.display());
            return false;
        },
    };

    let entries = Document::new(source, &content).entries();
    let wanted = paths::comparison_key(target);
    return entry_keys(source, root, &entries).contains(&wanted);
}

/// Every comparison key an entry list can stand for.
pub fn entry_keys(source: &Path, root: &Path, entries: &[String]) -> HashSet<String> {
    let base = source.parent().unwrap_or(root);
    let mut keys = HashSet::new();
    for entry in entries {
        let entry_path = Path::new(entry);
        keys.insert(paths::comparison_key(&paths::anchor(base, entry_path)));
        if !entry.starts_with('.') {
            keys.insert(paths::comparison_key(&paths::anchor(root, entry_path)));
        }
    }
    return keys;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn finds_source_relative_and_root_relative_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("docs")).unwrap();
        let source = root.join("docs/guide.md");
        std::fs::write(&source, "@references:\n- ../mqp.md\n- standards/Log.md\n\ntext\n").unwrap();

        assert!(is_reference_present(&source, &root.join("MQP.md"), root));
        assert!(is_reference_present(&source, &root.join("standards/Log.md"), root));
        assert!(!is_reference_present(&source, &root.join("Other.md"), root));
    }

    #[test]
    fn missing_block_or_file_means_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.md");
        std::fs::write(&source, "See MQP.\n").unwrap();

        assert!(!is_reference_present(&source, &dir.path().join("MQP.md"), dir.path()));
        assert!(!is_reference_present(&dir.path().join("gone.md"), &source, dir.path()));
    }
}
