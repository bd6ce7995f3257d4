//! Reading and rewriting the `@references:` block at the top of a file.
//!
//! A block is a header line followed by one item per line:
//!
//! ```text
//! @references:
//! - MQP.md
//! - standards/ADRS_Log.md
//! ```
//!
//! The header and items may carry a comment marker (`#`, `//`, `<!-- -->`)
//! so the block stays inert in source files. Only a header at the top of the
//! file counts, after any shebang, encoding line, front matter or module
//! docstring. The block ends at the first blank line or non-item line, so the
//! blank separator written after a new block is never part of it.

use std::path::Path;

use crate::frontmatter;

/// Marker used to write a block; the file's extension picks it for new blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `# @references:` / `#   - path`
    Hash,
    /// `<!-- @references: -->` / `<!-- - path -->`
    Html,
    /// `@references:` / `- path`
    Plain,
    /// `// @references:` / `//   - path`
    Slash,
}

impl CommentStyle {
    /// Style for new blocks in a file with this path.
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| return e.to_str())
            .unwrap_or("")
            .to_lowercase();
        return match ext.as_str() {
            "py" | "sh" | "bash" | "yaml" | "yml" | "toml" | "rb" | "r" | "pl" => Self::Hash,
            "rs" | "js" | "jsx" | "ts" | "tsx" | "go" | "c" | "h" | "cpp" | "hpp" | "cc" | "java" | "kt"
            | "swift" | "cs" => Self::Slash,
            _ => Self::Plain,
        };
    }

    fn header(self, indent: &str) -> String {
        return match self {
            Self::Hash => format!("{indent}# @references:"),
            Self::Html => format!("{indent}<!-- @references: -->"),
            Self::Plain => format!("{indent}@references:"),
            Self::Slash => format!("{indent}// @references:"),
        };
    }

    fn item(self, indent: &str, entry: &str) -> String {
        return match self {
            Self::Hash => format!("{indent}#   - {entry}"),
            Self::Html => format!("{indent}<!-- - {entry} -->"),
            Self::Plain => format!("{indent}- {entry}"),
            Self::Slash => format!("{indent}//   - {entry}"),
        };
    }
}

/// Location and content of an existing block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBlock {
    /// One past the last item line (header + 1 when there are no items).
    pub end: usize,
    /// Item targets in file order, as written.
    pub entries: Vec<String>,
    /// Index of the header line.
    pub header: usize,
    /// Leading whitespace of the header, reused for items.
    pub indent: String,
    /// Marker of the existing items, used when writing new ones.
    pub style: CommentStyle,
}

/// A text file split into lines, remembering how to put it back together.
#[derive(Debug, Clone)]
pub struct Document {
    /// Whether lines were separated by `\r\n`.
    crlf: bool,
    /// Lines of leading markdown front matter.
    front_matter: usize,
    /// Lines without terminators.
    lines: Vec<String>,
    /// Whether the file is Python (docstrings are skipped on insert).
    python: bool,
    /// Style for a block created from scratch.
    style: CommentStyle,
    /// Whether the content ended with a line terminator.
    trailing_newline: bool,
}

impl Document {
    /// Split `content` read from `path`.
    pub fn new(path: &Path, content: &str) -> Self {
        let style = CommentStyle::for_path(path);
        let python = path
            .extension()
            .is_some_and(|e| return e.eq_ignore_ascii_case("py"));
        let front_matter = if style == CommentStyle::Plain {
            frontmatter::line_count(content)
        } else {
            0
        };
        return Self {
            crlf: content.contains("\r\n"),
            front_matter,
            lines: content.lines().map(String::from).collect(),
            python,
            style,
            trailing_newline: content.is_empty() || content.ends_with('\n'),
        };
    }

    /// Add one entry after the last item, creating the block when absent.
    pub fn add_entry(&mut self, entry: &str) {
        match self.block() {
            Some(block) => {
                let line = block.style.item(&block.indent, entry);
                self.lines.insert(block.end, line);
            },
            None => self.insert_block(&[entry.to_string()]),
        }
    }

    /// The reference block at the top of the file, if any.
    pub fn block(&self) -> Option<ReferenceBlock> {
        let header = self.top_header()?;
        let header_line = self.lines.get(header)?;
        let indent: String = header_line.chars().take_while(|c| return c.is_whitespace()).collect();

        let mut end = header.saturating_add(1);
        let mut entries = Vec::new();
        let mut item_style = None;

        for (idx, line) in self.lines.iter().enumerate().skip(end) {
            let (body, marker) = strip_markers(line);
            if body.is_empty() {
                break;
            }
            let Some(entry) = parse_item(body, marker, self.style != CommentStyle::Plain) else {
                break;
            };
            item_style.get_or_insert(marker.unwrap_or(CommentStyle::Plain));
            entries.push(entry);
            end = idx.saturating_add(1);
        }

        let style = item_style.unwrap_or_else(|| return strip_markers(header_line).1.unwrap_or(self.style));
        return Some(ReferenceBlock {
            end,
            entries,
            header,
            indent,
            style,
        });
    }

    /// Entries of the existing block, empty when there is none.
    pub fn entries(&self) -> Vec<String> {
        return self.block().map(|b| return b.entries).unwrap_or_default();
    }

    /// Make the block list exactly `entries`.
    ///
    /// An existing block keeps its header and marker style; an empty list
    /// removes the block entirely. With no block and no entries nothing changes.
    pub fn set_entries(&mut self, entries: &[String]) {
        let Some(block) = self.block() else {
            if !entries.is_empty() {
                self.insert_block(entries);
            }
            return;
        };

        if entries.is_empty() {
            self.lines.drain(block.header..block.end);
            let orphan_blank = self.lines.get(block.header).is_some_and(|l| return l.trim().is_empty());
            let above_blank = block.header == 0
                || self
                    .lines
                    .get(block.header.saturating_sub(1))
                    .is_some_and(|l| return l.trim().is_empty());
            if orphan_blank && above_blank {
                self.lines.remove(block.header);
            }
            return;
        }

        let items: Vec<String> = entries
            .iter()
            .map(|e| return block.style.item(&block.indent, e))
            .collect();
        self.lines.splice(block.header.saturating_add(1)..block.end, items);
    }

    /// Reassemble the file with its original line endings.
    pub fn render(&self) -> String {
        let ending = if self.crlf { "\r\n" } else { "\n" };
        let mut out = self.lines.join(ending);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(ending);
        }
        return out;
    }

    /// Line index where a new block goes: after a shebang, an encoding
    /// declaration, markdown front matter, and a Python module docstring.
    fn insertion_index(&self) -> usize {
        let mut idx = 0;
        if self.lines.first().is_some_and(|l| return l.starts_with("#!")) {
            idx = 1;
        }
        if self.lines.get(idx).is_some_and(|l| return is_encoding_line(l)) {
            idx = idx.saturating_add(1);
        }
        if idx == 0 && self.front_matter > 0 {
            idx = self.front_matter;
        }
        if self.python {
            idx = self.skip_docstring(idx);
        }
        return idx;
    }

    fn insert_block(&mut self, entries: &[String]) {
        let idx = self.insertion_index().min(self.lines.len());

        let mut block = Vec::with_capacity(entries.len().saturating_add(3));
        let prev_filled = idx > 0
            && self
                .lines
                .get(idx.saturating_sub(1))
                .is_some_and(|l| return !l.trim().is_empty());
        if prev_filled {
            block.push(String::new());
        }
        block.push(self.style.header(""));
        block.extend(entries.iter().map(|e| return self.style.item("", e)));
        if self.lines.get(idx).is_some_and(|l| return !l.trim().is_empty()) {
            block.push(String::new());
        }

        self.lines.splice(idx..idx, block);
    }

    /// Index of the header line when the first non-blank line of the top region is one.
    fn top_header(&self) -> Option<usize> {
        let start = self.insertion_index();
        let first = (start..self.lines.len())
            .find(|i| return self.lines.get(*i).is_some_and(|l| return !l.trim().is_empty()))?;
        return self.lines.get(first).is_some_and(|l| return is_header(l)).then_some(first);
    }

    /// Index just past a module docstring starting at or after `start`, or `start`.
    fn skip_docstring(&self, start: usize) -> usize {
        let Some(first) = (start..self.lines.len())
            .find(|i| return self.lines.get(*i).is_some_and(|l| return !l.trim().is_empty()))
        else {
            return start;
        };
        let Some(opening) = self.lines.get(first).map(|l| return l.trim_start()) else {
            return start;
        };
        let Some(quote) = ["\"\"\"", "'''"].into_iter().find(|q| return opening.starts_with(q)) else {
            return start;
        };

        let rest = opening.get(quote.len()..).unwrap_or("");
        if rest.contains(quote) {
            return first.saturating_add(1);
        }
        for (idx, line) in self.lines.iter().enumerate().skip(first.saturating_add(1)) {
            if line.contains(quote) {
                return idx.saturating_add(1);
            }
        }
        return start;
    }
}

fn is_encoding_line(line: &str) -> bool {
    return line.starts_with('#') && (line.contains("coding:") || line.contains("coding="));
}

fn is_header(line: &str) -> bool {
    let (body, _) = strip_markers(line);
    let body = body.trim_end_matches(':').trim_end();
    return body.eq_ignore_ascii_case("@references");
}

/// Target of an item body, or `None` if the line is not an item.
///
/// Bulleted items (`- path`, `* path`) are always accepted; markdown links
/// contribute their target. In source files a bare path behind a `#` or
/// `//` marker is accepted too.
fn parse_item(body: &str, marker: Option<CommentStyle>, allow_bare: bool) -> Option<String> {
    let bullet = body.strip_prefix("- ").or_else(|| return body.strip_prefix("* "));
    let raw = match bullet {
        Some(rest) => rest.trim(),
        None => {
            let commented = allow_bare && matches!(marker, Some(CommentStyle::Hash | CommentStyle::Slash));
            let bare_path = !body.contains(char::is_whitespace) && body.contains(['.', '/']);
            if !(commented && bare_path) {
                return None;
            }
            body
        },
    };

    let raw = raw.trim_matches('`');
    let target = link_target(raw).unwrap_or(raw).trim();
    if target.is_empty() {
        return None;
    }
    return Some(target.to_string());
}

/// `path` of a `[text](path#frag)` item.
fn link_target(raw: &str) -> Option<&str> {
    if !raw.starts_with('[') {
        return None;
    }
    let (_, after) = raw.split_once("](")?;
    let inner = after.strip_suffix(')')?;
    return Some(inner.split('#').next().unwrap_or(inner));
}

/// Remove comment markers, returning the trimmed body and which marker was found.
fn strip_markers(line: &str) -> (&str, Option<CommentStyle>) {
    let mut body = line.trim();
    let mut marker = None;

    if let Some(rest) = body.strip_prefix("<!--") {
        body = rest.trim();
        marker = Some(CommentStyle::Html);
    }
    if let Some(rest) = body.strip_suffix("-->") {
        body = rest.trim();
        marker.get_or_insert(CommentStyle::Html);
    }
    if marker.is_none() {
        if let Some(rest) = body.strip_prefix("//") {
            body = rest.trim_start_matches('/').trim();
            marker = Some(CommentStyle::Slash);
        } else if body.starts_with('#') {
            body = body.trim_start_matches('#').trim();
            marker = Some(CommentStyle::Hash);
        }
    }
    return (body, marker);
}
