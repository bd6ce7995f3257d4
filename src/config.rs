use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::Error;
use crate::paths;

/// Default config file name, looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = ".autoxref.toml";

/// Detection pattern used when the config does not list any: markdown links
/// with a local target, capturing the link text and the target path.
const DEFAULT_LINK_PATTERN: &str = r"\[(?P<text>[^\]]+)\]\((?P<path>[^)#\s]+)(?:#[^)]*)?\)";

/// Backup behaviour before any on-disk rewrite.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Absolute directory receiving `<filename>.<timestamp>` copies.
    pub directory: PathBuf,
    /// Whether to back up at all.
    pub enabled: bool,
    /// chrono strftime format for the timestamp suffix.
    pub timestamp_format: String,
}

/// Project configuration, validated and anchored to the project root.
#[derive(Debug)]
pub struct Config {
    /// Backup settings for the injector.
    pub backup: BackupOptions,
    /// Document whose front matter lists the core references.
    pub core_standard: Option<PathBuf>,
    /// Named detection regexes, compiled later by the detector.
    pub detection_patterns: Vec<PatternSpec>,
    /// Common directories probed by heuristic filename search, in order.
    pub heuristic_search_dirs: Vec<PathBuf>,
    /// Scan settings for building the file index.
    pub index: ScanSettings,
    /// Known term to absolute path, sorted by term.
    pub known_terms: BTreeMap<String, PathBuf>,
    /// Absolute project root.
    pub root: PathBuf,
    /// Scan settings for the files to process.
    pub scan: ScanSettings,
    /// Keywords matched as whole words.
    pub standalone_keywords: Vec<String>,
}

/// One entry of `candidate_detection_patterns`.
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct PatternSpec {
    /// Free-form kind; `markdown_link` marks link patterns.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Pattern name used in diagnostics and identification methods.
    #[serde(default = "default_pattern_name")]
    pub name: String,
    /// Regex source text.
    pub regex: String,
}

/// Which files a scan visits.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Compiled exclude globs, matched against root-relative paths.
    pub exclude: GlobSet,
    /// Exclude globs as written, for logging.
    pub exclude_patterns: Vec<String>,
    /// Lower-cased extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Absolute files or directories to walk.
    pub paths: Vec<PathBuf>,
}

impl ScanSettings {
    /// Same filters, different starting paths.
    pub fn with_paths(&self, paths: Vec<PathBuf>) -> Self {
        return Self {
            exclude: self.exclude.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
            extensions: self.extensions.clone(),
            paths,
        };
    }
}

/// Raw structure of the config file, shared by TOML, YAML, and JSON.
#[derive(serde::Deserialize)]
#[serde(default)]
struct RawConfig {
    backup_options: RawBackupOptions,
    candidate_detection_patterns: Vec<PatternSpec>,
    core_standard: Option<String>,
    exclude_patterns: Vec<String>,
    heuristic_search_dirs: Option<Vec<String>>,
    include_file_extensions: Vec<String>,
    index: Option<RawScanSettings>,
    known_terms_to_paths: BTreeMap<String, String>,
    scan_paths: Vec<String>,
    standalone_keywords: Vec<String>,
}

impl Default for RawConfig {
    fn default() -> Self {
        return Self {
            backup_options: RawBackupOptions::default(),
            candidate_detection_patterns: vec![PatternSpec {
                kind: Some("markdown_link".to_string()),
                name: "markdown_link".to_string(),
                regex: DEFAULT_LINK_PATTERN.to_string(),
            }],
            core_standard: None,
            exclude_patterns: Vec::new(),
            heuristic_search_dirs: None,
            include_file_extensions: vec![".md".to_string()],
            index: None,
            known_terms_to_paths: BTreeMap::new(),
            scan_paths: vec![".".to_string()],
            standalone_keywords: Vec::new(),
        };
    }
}

/// Raw `backup_options` table.
#[derive(serde::Deserialize)]
#[serde(default)]
struct RawBackupOptions {
    directory: String,
    enabled: bool,
    timestamp_format: String,
}

impl Default for RawBackupOptions {
    fn default() -> Self {
        return Self {
            directory: ".autoxref/backups".to_string(),
            enabled: false,
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
        };
    }
}

/// Raw `index` table; unset keys fall back to the top-level scan settings.
#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct RawScanSettings {
    exclude_patterns: Option<Vec<String>>,
    include_file_extensions: Option<Vec<String>>,
    scan_paths: Option<Vec<String>>,
}

impl Config {
    /// Load config for the project at `root`.
    ///
    /// With `explicit` set, that file must exist. Otherwise `.autoxref.toml`
    /// in the root is used when present and built-in defaults when not.
    /// A file that exists but is malformed is always an error, never a
    /// silent fallback to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` for a missing explicit file,
    /// `Error::ConfigInvalid` / `Error::TomlDe` / `Error::Yaml` / `Error::Json`
    /// for malformed content, and `Error::InvalidGlob` for bad exclude patterns.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, Error> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => root.join(DEFAULT_CONFIG_FILE),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                log::debug!("no {} in {}, using defaults", DEFAULT_CONFIG_FILE, root.display());
                return Self::from_raw(root, &path, RawConfig::default());
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path });
            },
            Err(e) => {
                return Err(Error::ConfigInvalid {
                    path,
                    reason: e.to_string(),
                });
            },
        };

        let raw = parse_raw(&path, &content)?;
        log::info!("configuration loaded from {}", path.display());
        return Self::from_raw(root, &path, raw);
    }

    /// Parse config text directly; `origin` decides the format and appears in errors.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] minus the not-found case.
    #[cfg(test)]
    pub fn parse(root: &Path, origin: &Path, content: &str) -> Result<Self, Error> {
        let raw = parse_raw(origin, content)?;
        return Self::from_raw(root, origin, raw);
    }

    /// Validate and anchor a raw config.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGlob` or `Error::ConfigInvalid`.
    fn from_raw(root: &Path, origin: &Path, raw: RawConfig) -> Result<Self, Error> {
        validate_timestamp_format(origin, &raw.backup_options.timestamp_format)?;

        let scan = build_scan_settings(
            root,
            &raw.scan_paths,
            &raw.include_file_extensions,
            &raw.exclude_patterns,
        )?;

        let raw_index = raw.index.unwrap_or_default();
        let index = build_scan_settings(
            root,
            raw_index.scan_paths.as_ref().unwrap_or(&raw.scan_paths),
            raw_index
                .include_file_extensions
                .as_ref()
                .unwrap_or(&raw.include_file_extensions),
            raw_index.exclude_patterns.as_ref().unwrap_or(&raw.exclude_patterns),
        )?;

        let heuristic_search_dirs = raw
            .heuristic_search_dirs
            .as_ref()
            .unwrap_or(&raw.scan_paths)
            .iter()
            .map(|d| return paths::anchor(root, Path::new(d)))
            .collect();

        let known_terms = raw
            .known_terms_to_paths
            .into_iter()
            .map(|(term, target)| return (term, paths::anchor(root, Path::new(&target))))
            .collect();

        return Ok(Self {
            backup: BackupOptions {
                directory: paths::anchor(root, Path::new(&raw.backup_options.directory)),
                enabled: raw.backup_options.enabled,
                timestamp_format: raw.backup_options.timestamp_format,
            },
            core_standard: raw.core_standard.map(|p| return paths::anchor(root, Path::new(&p))),
            detection_patterns: raw.candidate_detection_patterns,
            heuristic_search_dirs,
            index,
            known_terms,
            root: root.to_path_buf(),
            scan,
            standalone_keywords: raw.standalone_keywords,
        });
    }
}

/// Compile one set of scan filters.
///
/// # Errors
///
/// Returns `Error::InvalidGlob` for the first pattern globset rejects.
fn build_scan_settings(
    root: &Path,
    scan_paths: &[String],
    extensions: &[String],
    exclude_patterns: &[String],
) -> Result<ScanSettings, Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in exclude_patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            return Error::InvalidGlob {
                pattern: pattern.clone(),
                reason: e.to_string(),
            };
        })?;
        builder.add(glob);
    }
    let exclude = builder.build().map_err(|e| {
        return Error::InvalidGlob {
            pattern: exclude_patterns.join(", "),
            reason: e.to_string(),
        };
    })?;

    return Ok(ScanSettings {
        exclude,
        exclude_patterns: exclude_patterns.to_vec(),
        extensions: extensions
            .iter()
            .map(|e| return e.trim_start_matches('.').to_lowercase())
            .collect(),
        paths: scan_paths
            .iter()
            .map(|p| return paths::anchor(root, Path::new(p)))
            .collect(),
    });
}

/// Serde default for a pattern without a name.
fn default_pattern_name() -> String {
    return "unnamed".to_string();
}

/// Deserialize by file extension: `.yaml`/`.yml`, `.json`, anything else as TOML.
///
/// # Errors
///
/// Returns the format-specific deserialization error.
fn parse_raw(path: &Path, content: &str) -> Result<RawConfig, Error> {
    let ext = path
        .extension()
        .and_then(|e| return e.to_str())
        .unwrap_or("")
        .to_lowercase();

    return match ext.as_str() {
        "json" => serde_json::from_str(content).map_err(|e| {
            return Error::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        }),
        "yaml" | "yml" => {
            if content.trim().is_empty() {
                return Ok(RawConfig::default());
            }
            Ok(serde_yaml::from_str(content)?)
        },
        _ => Ok(toml::from_str(content)?),
    };
}

/// Reject timestamp formats chrono cannot render or that would create subdirectories.
///
/// # Errors
///
/// Returns `Error::ConfigInvalid` naming the format.
fn validate_timestamp_format(origin: &Path, format: &str) -> Result<(), Error> {
    let has_error_item = StrftimeItems::new(format).any(|item| return matches!(item, Item::Error));
    if has_error_item || format.is_empty() || format.contains(['/', '\\']) {
        return Err(Error::ConfigInvalid {
            path: origin.to_path_buf(),
            reason: format!("backup_options.timestamp_format `{format}` is not usable in a file name"),
        });
    }
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn missing_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path(), None).unwrap();

        assert_eq!(config.scan.extensions, vec!["md".to_string()]);
        assert_eq!(config.scan.paths, vec![dir.path().to_path_buf()]);
        assert!(!config.backup.enabled);
        assert_eq!(config.detection_patterns.len(), 1);
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn parses_toml_and_anchors_paths() {
        let root = Path::new("/proj");
        let config = Config::parse(
            root,
            Path::new("/proj/.autoxref.toml"),
            r#"
scan_paths = ["docs"]
include_file_extensions = [".MD", "py"]
exclude_patterns = ["**/archive/**"]
standalone_keywords = ["MQP"]

[known_terms_to_paths]
MQP = "MQP.md"

[backup_options]
enabled = true
directory = "_bak"

[index]
scan_paths = ["."]
"#,
        )
        .unwrap();

        assert_eq!(config.scan.paths, vec![PathBuf::from("/proj/docs")]);
        assert_eq!(config.scan.extensions, vec!["md".to_string(), "py".to_string()]);
        assert!(config.scan.exclude.is_match("docs/archive/old.md"));
        assert_eq!(config.index.paths, vec![PathBuf::from("/proj")]);
        assert!(config.index.exclude.is_match("x/archive/y.md"));
        assert_eq!(config.known_terms.get("MQP"), Some(&PathBuf::from("/proj/MQP.md")));
        assert_eq!(config.backup.directory, PathBuf::from("/proj/_bak"));
        assert_eq!(config.heuristic_search_dirs, vec![PathBuf::from("/proj/docs")]);
    }

    #[test]
    fn parses_yaml_patterns() {
        let config = Config::parse(
            Path::new("/proj"),
            Path::new("/proj/autoxref.yaml"),
            "candidate_detection_patterns:\n  - name: standard\n    regex: 'KOIOS \\w+'\n    type: phrase\n",
        )
        .unwrap();

        assert_eq!(config.detection_patterns.len(), 1);
        assert_eq!(config.detection_patterns[0].name, "standard");
        assert_eq!(config.detection_patterns[0].kind.as_deref(), Some("phrase"));
    }

    #[test]
    fn rejects_bad_glob_and_timestamp() {
        let bad_glob = Config::parse(
            Path::new("/proj"),
            Path::new("/proj/c.toml"),
            "exclude_patterns = [\"a/{b\"]",
        )
        .unwrap_err();
        assert!(matches!(bad_glob, Error::InvalidGlob { .. }));

        let bad_ts = Config::parse(
            Path::new("/proj"),
            Path::new("/proj/c.json"),
            r#"{"backup_options": {"timestamp_format": "%Y/%m"}}"#,
        )
        .unwrap_err();
        assert!(matches!(bad_ts, Error::ConfigInvalid { .. }));
    }
}
