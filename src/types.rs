/// Core domain types for candidates, resolutions, and the file index.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a candidate was spotted in its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentificationMethod {
    /// Matched a standalone keyword as a whole word.
    KeywordMatch,
    /// Matched a pattern with `text` and `path` groups (an existing link).
    MarkdownLink,
    /// Matched the named detection pattern.
    Regex(String),
}

impl fmt::Display for IdentificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::KeywordMatch => f.write_str("keyword_match"),
            Self::MarkdownLink => f.write_str("markdown_link"),
            Self::Regex(name) => write!(f, "regex:{name}"),
        };
    }
}

/// A detected mention that has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialCandidate {
    /// The mention as it appears, or the link text for links.
    pub candidate_text: String,
    /// Strategy that produced this candidate.
    pub identification_method: IdentificationMethod,
    /// One-based line number in the source file.
    pub line_number: usize,
    /// Explicit target when the mention is already a link.
    pub original_link_target: Option<String>,
    /// Absolute path of the file containing the mention.
    pub source_file_path: PathBuf,
}

/// Which resolver strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    /// The link target written in the source exists.
    ExplicitLink,
    /// The candidate was found in the file index by name or title.
    FileIndex,
    /// A file of that name exists in one of the common directories.
    HeuristicFilename,
    /// The candidate is a configured known term.
    KnownTermsMap,
}

impl fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExplicitLink => "explicit_link",
            Self::FileIndex => "file_index",
            Self::HeuristicFilename => "heuristic_filename",
            Self::KnownTermsMap => "known_terms_map",
        };
        return f.write_str(name);
    }
}

/// Output of successful candidate resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Text to show for the link; the front-matter title when one is known.
    pub preferred_link_text: String,
    /// Absolute, normalized path of the target file.
    pub resolved_absolute_path: PathBuf,
    /// Strategy that matched.
    pub resolved_by: ResolvedBy,
}

/// Lookup table from lower-cased filename or title to canonical path.
///
/// Built once per run and only read afterwards; there are no mutating
/// methods once construction has finished.
#[derive(Debug, Default)]
pub struct FileIndex {
    /// Lower-cased filename or title to absolute path. Last insert wins.
    entries: HashMap<String, PathBuf>,
    /// Front-matter title of each indexed file that has one.
    titles: HashMap<PathBuf, String>,
}

impl FileIndex {
    /// Assemble an index from `(path, optional title)` pairs in order.
    pub fn from_entries<I>(files: I) -> Self
    where
        I: IntoIterator<Item = (PathBuf, Option<String>)>,
    {
        let mut index = Self::default();
        for (path, title) in files {
            let name = crate::paths::file_name(&path).to_lowercase();
            if !name.is_empty() {
                index.entries.insert(name, path.clone());
            }
            if let Some(title) = title {
                index.entries.insert(title.to_lowercase(), path.clone());
                index.titles.insert(path, title);
            }
        }
        return index;
    }

    /// Case-insensitive lookup of a filename or title.
    pub fn get(&self, key: &str) -> Option<&Path> {
        return self.entries.get(&key.to_lowercase()).map(PathBuf::as_path);
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Number of keys in the index.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Front-matter title recorded for an indexed path.
    pub fn title_of(&self, path: &Path) -> Option<&str> {
        return self.titles.get(path).map(String::as_str);
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn index_keys_are_case_insensitive_and_last_write_wins() {
        let index = FileIndex::from_entries(vec![
            (PathBuf::from("/p/a/README.md"), None),
            (PathBuf::from("/p/b/readme.md"), Some("Project Guide".to_string())),
        ]);

        assert_eq!(index.get("ReadMe.md"), Some(Path::new("/p/b/readme.md")));
        assert_eq!(index.get("project guide"), Some(Path::new("/p/b/readme.md")));
        assert_eq!(index.title_of(Path::new("/p/b/readme.md")), Some("Project Guide"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn identification_method_display() {
        assert_eq!(IdentificationMethod::Regex("mqp".into()).to_string(), "regex:mqp");
        assert_eq!(IdentificationMethod::KeywordMatch.to_string(), "keyword_match");
    }
}
