use std::path::Path;

use crate::config::ScanSettings;
use crate::frontmatter;
use crate::scanner;
use crate::types::FileIndex;

/// Build the lookup table used by the resolver.
///
/// Every scanned file is indexed under its lower-cased filename. Markdown
/// files with a front-matter `title` are indexed under the lower-cased title
/// too. A file whose content cannot be read still gets its filename entry.
pub fn build_file_index(settings: &ScanSettings, root: &Path) -> FileIndex {
    let files = scanner::scan(settings, root);

    let entries = files.into_iter().map(|path| {
        let title = if is_markdown(&path) { read_title(&path) } else { None };
        return (path, title);
    });

    let index = FileIndex::from_entries(entries);
    if index.is_empty() {
        log::warn!("file index is empty; only links and known terms can resolve");
    } else {
        log::info!("file index built with {} entries", index.len());
    }
    return index;
}

fn is_markdown(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|e| return e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));
}

fn read_title(path: &Path) -> Option<String> {
    return match std::fs::read_to_string(path) {
        Ok(content) => frontmatter::title(&content),
        Err(e) => {
            log::warn!("cannot read {} for its title: {e}", path.display());
            None
        },
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn indexes_filenames_and_titles() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("standards")).unwrap();
        std::fs::write(
            root.join("standards/MQP.md"),
            "---\ntitle: Master Quantum Prompt\n---\nBody\n",
        )
        .unwrap();
        std::fs::write(root.join("README.md"), "# Readme\n").unwrap();

        let config = Config::load(root, None).unwrap();
        let index = build_file_index(&config.index, root);

        let mqp = root.join("standards/MQP.md");
        assert_eq!(index.get("mqp.md"), Some(mqp.as_path()));
        assert_eq!(index.get("Master Quantum Prompt"), Some(mqp.as_path()));
        assert_eq!(index.title_of(&mqp), Some("Master Quantum Prompt"));
        assert_eq!(index.get("readme.md"), Some(root.join("README.md").as_path()));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn empty_tree_gives_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert!(build_file_index(&config.index, dir.path()).is_empty());
    }
}
