/// Crate-level error types for autoxref diagnostics.
use std::path::PathBuf;

/// All errors in autoxref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, pattern, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Copying a file into the backup directory failed; the file is left untouched.
    #[error("backup failed for {}: {source}", file.display())]
    BackupFailed {
        /// File that was about to be modified.
        file: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// A config file exists but its contents are not a valid configuration.
    #[error("config invalid: {}: {reason}", path.display())]
    ConfigInvalid {
        /// Path to the offending config file.
        path: PathBuf,
        /// Description of what is wrong.
        reason: String,
    },

    /// A config file named on the command line does not exist.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// The core-standard document is missing or its front matter is unusable.
    #[error("core standard invalid: {}: {reason}", path.display())]
    CoreStandardInvalid {
        /// Path to the standard document.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An exclude pattern in the configuration is not a valid glob.
    #[error("invalid glob `{pattern}`: {reason}")]
    InvalidGlob {
        /// Glob text as written in the config.
        pattern: String,
        /// Parser message from globset.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A file could not be read.
    #[error("read failed: {}: {source}", file.display())]
    ReadFailed {
        /// File that could not be read.
        file: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A file is not valid UTF-8 text.
    #[error("not valid UTF-8: {}", file.display())]
    Utf8 {
        /// File that failed to decode.
        file: PathBuf,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    Watch {
        /// Description of the failure.
        reason: String,
    },

    /// Writing the rewritten file back to disk failed.
    #[error("write failed: {}: {source}", file.display())]
    WriteFailed {
        /// File that could not be written.
        file: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// YAML deserialization failed.
    #[error("yaml: {0}")]
    Yaml(
        /// The wrapped serde_yaml error.
        #[from]
        serde_yaml::Error,
    ),
}

impl Error {
    /// Whether this error is fatal for a whole run rather than a single file.
    pub const fn is_configuration(&self) -> bool {
        return matches!(
            self,
            Self::ConfigInvalid { .. }
                | Self::ConfigNotFound { .. }
                | Self::CoreStandardInvalid { .. }
                | Self::InvalidGlob { .. }
                | Self::TomlDe(_)
                | Self::Yaml(_)
        );
    }
}
