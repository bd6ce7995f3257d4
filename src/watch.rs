//! File watcher: runs a dry-run `scan` on startup, then re-runs on changes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::Config;
use crate::error;
use crate::orchestrator::ScanOptions;

/// Debounce delay between filesystem events and re-scan.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Entry point for the watch command.
///
/// Scans once, then watches the scan paths recursively and re-scans after
/// each burst of changes. Nothing is written to the scanned files.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created or no scan path can be watched.
pub fn run(config: &Config, paths: Option<Vec<PathBuf>>) -> Result<ExitCode, error::Error> {
    let watch_paths = paths.clone().unwrap_or_else(|| return config.scan.paths.clone());
    let options = ScanOptions {
        paths,
        ..ScanOptions::default()
    };

    log::info!("watch: initial scan");
    let mut last_code = run_scan(config, &options);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    let mut watched = 0_usize;
    for path in &watch_paths {
        if !path.exists() {
            log::warn!("watch: {} does not exist, not watching it", path.display());
            continue;
        }
        match watcher.watch(path, RecursiveMode::Recursive) {
            Ok(()) => watched = watched.saturating_add(1),
            Err(e) => log::warn!("watch: cannot watch {}: {e}", path.display()),
        }
    }
    if watched == 0 {
        return Err(error::Error::Watch {
            reason: "none of the scan paths could be watched".to_string(),
        });
    }

    log::info!("watch: monitoring {watched} paths, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        log::info!("watch: change detected, re-scanning");
        last_code = run_scan(config, &options);
    }

    return Ok(last_code);
}

/// Run one dry-run scan and print its result.
fn run_scan(config: &Config, options: &ScanOptions) -> ExitCode {
    return match commands::scan(config, options, None) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(3_u8)
        },
    };
}
