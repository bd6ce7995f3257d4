use std::path::Path;

use regex::Regex;

use crate::config::Config;
use crate::error::Error;
use crate::types::{IdentificationMethod, PotentialCandidate};

/// Candidate detection with every pattern compiled once per run.
pub struct Detector {
    /// Whole-word keyword matchers with the keyword they were built from.
    keywords: Vec<(String, Regex)>,
    /// Named detection patterns that compiled.
    patterns: Vec<CompiledPattern>,
}

/// One usable detection pattern.
struct CompiledPattern {
    /// How matches of this pattern are classified.
    method: IdentificationMethod,
    /// The compiled expression.
    regex: Regex,
}

impl Detector {
    /// Compile all detection patterns and keywords from `config`.
    ///
    /// Patterns that fail to compile are logged and dropped; the rest stay usable.
    pub fn new(config: &Config) -> Self {
        let mut patterns = Vec::with_capacity(config.detection_patterns.len());
        for spec in &config.detection_patterns {
            let regex = match Regex::new(&spec.regex) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("invalid detection pattern `{}` skipped: {e}", spec.name);
                    continue;
                },
            };

            let has_link_groups = has_group(&regex, "text") && has_group(&regex, "path");
            let method = if has_link_groups || spec.kind.as_deref() == Some("markdown_link") {
                IdentificationMethod::MarkdownLink
            } else {
                IdentificationMethod::Regex(spec.name.clone())
            };
            patterns.push(CompiledPattern { method, regex });
        }

        let mut keywords = Vec::with_capacity(config.standalone_keywords.len());
        for keyword in &config.standalone_keywords {
            if keyword.trim().is_empty() {
                continue;
            }
            match Regex::new(&format!(r"\b{}\b", regex::escape(keyword))) {
                Ok(r) => keywords.push((keyword.clone(), r)),
                Err(e) => log::warn!("keyword `{keyword}` skipped: {e}"),
            }
        }

        log::debug!(
            "detector ready: {} patterns, {} keywords",
            patterns.len(),
            keywords.len()
        );
        return Self { keywords, patterns };
    }

    /// Read `path` and return every candidate mention, line by line.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailed` or `Error::Utf8` when the file cannot be read as text.
    pub fn detect(&self, path: &Path) -> Result<Vec<PotentialCandidate>, Error> {
        let bytes = std::fs::read(path).map_err(|source| {
            return Error::ReadFailed {
                file: path.to_path_buf(),
                source,
            };
        })?;
        let content = String::from_utf8(bytes).map_err(|_| {
            return Error::Utf8 {
                file: path.to_path_buf(),
            };
        })?;
        return Ok(self.detect_in(path, &content));
    }

    /// Detection over already-loaded content.
    pub fn detect_in(&self, path: &Path, content: &str) -> Vec<PotentialCandidate> {
        let mut found = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_number = idx.saturating_add(1);

            for pattern in &self.patterns {
                for caps in pattern.regex.captures_iter(line) {
                    let link = caps.name("text").zip(caps.name("path"));
                    let (text, target) = match link {
                        Some((text, target)) => (text.as_str(), Some(target.as_str().to_string())),
                        None => match caps.get(0) {
                            Some(m) => (m.as_str(), None),
                            None => continue,
                        },
                    };
                    found.push(PotentialCandidate {
                        candidate_text: text.to_string(),
                        identification_method: pattern.method.clone(),
                        line_number,
                        original_link_target: target,
                        source_file_path: path.to_path_buf(),
                    });
                }
            }

            for (keyword, regex) in &self.keywords {
                for _ in regex.find_iter(line) {
                    found.push(PotentialCandidate {
                        candidate_text: keyword.clone(),
                        identification_method: IdentificationMethod::KeywordMatch,
                        line_number,
                        original_link_target: None,
                        source_file_path: path.to_path_buf(),
                    });
                }
            }
        }

        return found;
    }
}

fn has_group(regex: &Regex, name: &str) -> bool {
    return regex.capture_names().flatten().any(|n| return n == name);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;

    fn detector(toml: &str) -> Detector {
        let config = Config::parse(Path::new("/proj"), Path::new("/proj/.autoxref.toml"), toml).unwrap();
        return Detector::new(&config);
    }

    #[test]
    fn markdown_links_carry_their_target() {
        let d = detector("");
        let found = d.detect_in(
            Path::new("/proj/a.md"),
            "intro\nSee [the prompt](docs/MQP.md#scope) and [web](https://x.io).\n",
        );

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].candidate_text, "the prompt");
        assert_eq!(found[1].original_link_target.as_deref(), Some("https://x.io"));
        assert_eq!(found[0].original_link_target.as_deref(), Some("docs/MQP.md"));
        assert_eq!(found[0].line_number, 2);
        assert_eq!(found[0].identification_method, IdentificationMethod::MarkdownLink);
    }

    #[test]
    fn keywords_match_whole_words_case_sensitively() {
        let d = detector("standalone_keywords = [\"MQP\"]\ncandidate_detection_patterns = []");
        let found = d.detect_in(Path::new("/proj/a.md"), "See MQP, not MQPX or mqp. MQP again.\n");

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.identification_method == IdentificationMethod::KeywordMatch));
    }

    #[test]
    fn invalid_pattern_is_skipped_not_fatal() {
        let d = detector(
            r#"
[[candidate_detection_patterns]]
name = "broken"
regex = "(unclosed"

[[candidate_detection_patterns]]
name = "standard"
regex = "KOIOS-[A-Z]+"
"#,
        );
        let found = d.detect_in(Path::new("/proj/a.md"), "Follow KOIOS-DOC and KOIOS-CODE.\n");

        assert_eq!(found.len(), 2);
        assert_eq!(found[1].candidate_text, "KOIOS-CODE");
        assert_eq!(found[0].identification_method.to_string(), "regex:standard");
    }

    #[test]
    fn unreadable_and_non_utf8_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bin.md");
        std::fs::write(&bad, [0xff, 0xfe, 0x00]).unwrap();
        let d = detector("");

        assert!(matches!(d.detect(&bad), Err(Error::Utf8 { .. })));
        assert!(matches!(
            d.detect(&dir.path().join("missing.md")),
            Err(Error::ReadFailed { .. })
        ));
    }
}
