//! Leading `---` front matter in markdown documents.

use serde::Deserialize;

/// Fields autoxref reads from front matter. Unknown keys are ignored.
#[derive(Deserialize, Debug, Default)]
pub struct Frontmatter {
    /// Core references listed by the standard document.
    #[serde(default, alias = "core_references")]
    pub core_refs: Option<Vec<String>>,
    /// Document title, indexed for resolution.
    #[serde(default)]
    pub title: Option<String>,
}

/// Raw text between the opening and closing `---` lines, if the document has front matter.
///
/// The first line must be exactly `---` (trailing whitespace allowed) and a
/// closing `---` line must follow.
pub fn block(content: &str) -> Option<&str> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return content.get(start..offset);
        }
        offset = offset.saturating_add(line.len());
    }
    return None;
}

/// Number of lines the front matter spans, delimiters included; zero when absent.
pub fn line_count(content: &str) -> usize {
    let Some(inner) = block(content) else {
        return 0;
    };
    return inner.lines().count().saturating_add(2);
}

/// Parse the front matter of a document.
///
/// # Errors
///
/// Returns the YAML error when front matter is present but malformed.
pub fn parse(content: &str) -> Result<Option<Frontmatter>, serde_yaml::Error> {
    let Some(inner) = block(content) else {
        return Ok(None);
    };
    if inner.trim().is_empty() {
        return Ok(Some(Frontmatter::default()));
    }
    return serde_yaml::from_str(inner).map(Some);
}

/// Title from the front matter.
///
/// Other keys do not have to be well typed. When the YAML does not parse at
/// all, the first `title:` line is taken verbatim.
pub fn title(content: &str) -> Option<String> {
    let inner = block(content)?;
    let raw = match serde_yaml::from_str::<serde_yaml::Value>(inner) {
        Ok(value) => scalar_text(value.get("title")?)?,
        Err(_) => title_line(inner)?,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    return Some(trimmed.to_string());
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    return match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };
}

fn title_line(inner: &str) -> Option<String> {
    let line = inner
        .lines()
        .find(|l| return l.get(..6).is_some_and(|k| return k.eq_ignore_ascii_case("title:")))?;
    let (_, value) = line.split_once(':')?;
    return Some(value.trim().trim_matches(['"', '\'']).to_string());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn extracts_title() {
        let doc = "---\ntitle: \"Master Quantum Prompt\"\nauthor: x\n---\n# Body\n";
        assert_eq!(title(doc).as_deref(), Some("Master Quantum Prompt"));
        assert_eq!(line_count(doc), 4);
    }

    #[test]
    fn requires_opening_and_closing_delimiters() {
        assert_eq!(block("title: x\n---\n"), None);
        assert_eq!(block("---\ntitle: x\n"), None);
        assert_eq!(line_count("plain text\n"), 0);
    }

    #[test]
    fn reads_core_refs_under_either_key() {
        let a = parse("---\ncore_refs:\n  - MQP.md\n---\n").unwrap().unwrap();
        assert_eq!(a.core_refs, Some(vec!["MQP.md".to_string()]));

        let b = parse("---\ncore_references: [ADRS_Log.md]\n---\n").unwrap().unwrap();
        assert_eq!(b.core_refs, Some(vec!["ADRS_Log.md".to_string()]));
    }

    #[test]
    fn malformed_yaml_falls_back_to_the_title_line() {
        assert_eq!(title("---\ntitle: MQP: The Prompt\n---\n").as_deref(), Some("MQP: The Prompt"));
        assert_eq!(title("---\nTitle: 'Quoted'\nbad: [\n---\n").as_deref(), Some("Quoted"));
        assert_eq!(title("---\nauthor: [unclosed\n---\n"), None);
    }

    #[test]
    fn title_survives_badly_typed_sibling_keys() {
        assert_eq!(title("---\ntitle: Guide\ncore_refs: A.md\n---\n").as_deref(), Some("Guide"));
        assert_eq!(title("---\ntitle: [a, b]\n---\n"), None);
        assert_eq!(title("---\n---\nbody\n"), None);
    }
}
