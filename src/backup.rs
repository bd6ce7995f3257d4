use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::BackupOptions;
use crate::error::Error;
use crate::paths;

/// Per-run backup ledger.
///
/// Each original is copied at most once per process, however many times it
/// is rewritten afterwards. Shared by reference between scan workers.
#[derive(Debug)]
pub struct Backups {
    /// Original file to the copy made for it during this run.
    done: Mutex<HashMap<PathBuf, PathBuf>>,
    /// Settings from the configuration.
    options: BackupOptions,
}

impl Backups {
    pub fn new(options: BackupOptions) -> Self {
        return Self {
            done: Mutex::new(HashMap::new()),
            options,
        };
    }

    /// Copy `file` into the backup directory unless that already happened this run.
    ///
    /// Returns the backup path, or `None` when backups are disabled.
    ///
    /// # Errors
    ///
    /// Returns `Error::BackupFailed` if the directory cannot be created or the copy fails.
    /// The caller must not write `file` in that case.
    pub fn ensure(&self, file: &Path) -> Result<Option<PathBuf>, Error> {
        if !self.options.enabled {
            return Ok(None);
        }

        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = done.get(file) {
            log::debug!("{} already backed up to {}", file.display(), existing.display());
            return Ok(Some(existing.clone()));
        }

        let failed = |source: std::io::Error| {
            return Error::BackupFailed {
                file: file.to_path_buf(),
                source,
            };
        };

        std::fs::create_dir_all(&self.options.directory).map_err(failed)?;
        let target = self.target_for(file).map_err(failed)?;
        std::fs::copy(file, &target).map_err(failed)?;

        log::info!("backed up {} to {}", file.display(), target.display());
        done.insert(file.to_path_buf(), target.clone());
        return Ok(Some(target));
    }

    /// `<directory>/<filename>.<timestamp>`, with `.1`, `.2`, ... appended on collision.
    fn target_for(&self, file: &Path) -> std::io::Result<PathBuf> {
        let mut stamp = String::new();
        write!(
            stamp,
            "{}",
            chrono::Local::now().format(&self.options.timestamp_format)
        )
        .map_err(|_| return std::io::Error::other("backup timestamp format cannot be rendered"))?;

        let base = format!("{}.{stamp}", paths::file_name(file));
        let candidate = self.options.directory.join(&base);
        if !candidate.exists() {
            return Ok(candidate);
        }
        for n in 1_u32.. {
            let numbered = self.options.directory.join(format!("{base}.{n}"));
            if !numbered.exists() {
                return Ok(numbered);
            }
        }
        return Err(std::io::Error::other("no free backup name"));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn options(dir: &Path, enabled: bool) -> BackupOptions {
        return BackupOptions {
            directory: dir.join("bak"),
            enabled,
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
        };
    }

    #[test]
    fn copies_once_per_original() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("guide.md");
        std::fs::write(&file, "v1\n").unwrap();
        let backups = Backups::new(options(dir.path(), true));

        let first = backups.ensure(&file).unwrap().unwrap();
        std::fs::write(&file, "v2\n").unwrap();
        let second = backups.ensure(&file).unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "v1\n");
        assert!(paths::file_name(&first).starts_with("guide.md."));
        assert_eq!(std::fs::read_dir(dir.path().join("bak")).unwrap().count(), 1);
    }

    #[test]
    fn same_second_collisions_get_a_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), true);
        opts.timestamp_format = "fixed".to_string();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "x\n").unwrap();

        let first = Backups::new(opts.clone()).ensure(&file).unwrap().unwrap();
        let second = Backups::new(opts).ensure(&file).unwrap().unwrap();

        assert_eq!(paths::file_name(&first), "a.md.fixed");
        assert_eq!(paths::file_name(&second), "a.md.fixed.1");
    }

    #[test]
    fn disabled_backups_do_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.md");
        std::fs::write(&file, "x\n").unwrap();

        assert_eq!(Backups::new(options(dir.path(), false)).ensure(&file).unwrap(), None);
        assert!(!dir.path().join("bak").exists());
    }

    #[test]
    fn missing_original_is_a_backup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = Backups::new(options(dir.path(), true))
            .ensure(&dir.path().join("gone.md"))
            .unwrap_err();
        assert!(matches!(err, Error::BackupFailed { .. }));
    }
}
