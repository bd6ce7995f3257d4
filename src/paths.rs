//! Lexical path helpers shared by the scanner, resolver, and injector.
//!
//! Nothing here touches the filesystem except `absolute`, which only reads
//! the current directory. Symlinks are never resolved, so two spellings of
//! the same file compare equal only after `normalize`.

use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against `base` (when relative) and normalize it.
pub fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    return normalize(&base.join(path));
}

/// Make `path` absolute against the current directory and normalize it.
///
/// # Errors
///
/// Returns an I/O error if the current directory cannot be determined.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    return Ok(normalize(&std::path::absolute(path)?));
}

/// Case-insensitive comparison key for a path.
pub fn comparison_key(path: &Path) -> String {
    return to_posix(&normalize(path)).to_lowercase();
}

/// Final component of `path` as a string, or empty.
pub fn file_name(path: &Path) -> String {
    return path
        .file_name()
        .map(|n| return n.to_string_lossy().into_owned())
        .unwrap_or_default();
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(
                components.last(),
                Some(c) if matches!(c, Component::Normal(_))
            );
            if can_pop {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}

/// Spelling of `target` to write into the reference block of `source`.
///
/// Prefers a path relative to the source file's directory, then one relative
/// to the project root, then the absolute path. Always uses forward slashes.
pub fn reference_spelling(source: &Path, target: &Path, root: &Path) -> String {
    let source_dir = source.parent().unwrap_or(root);
    if let Some(rel) = pathdiff::diff_paths(target, source_dir) {
        return to_posix(&rel);
    }
    if let Ok(rel) = target.strip_prefix(root) {
        return to_posix(rel);
    }
    return to_posix(target);
}

/// Path relative to `root` with forward slashes, or the full path when outside it.
pub fn relative_to_root(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    return to_posix(rel);
}

/// Render a path with forward slashes regardless of platform.
pub fn to_posix(path: &Path) -> String {
    return path.to_string_lossy().replace('\\', "/");
}
