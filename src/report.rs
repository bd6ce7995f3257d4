use std::path::Path;

use serde::Serialize;

use crate::error::Error;

/// Write `report` as pretty JSON, creating parent directories as needed.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails, `Error::WriteFailed` if the
/// file cannot be written.
pub fn write_json<T: Serialize>(path: &Path, report: &T) -> Result<(), Error> {
    let mut content = serde_json::to_string_pretty(report)?;
    content.push('\n');

    let failed = |source: std::io::Error| {
        return Error::WriteFailed {
            file: path.to_path_buf(),
            source,
        };
    };
    if let Some(parent) = path.parent().filter(|p| return !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }
    std::fs::write(path, content).map_err(failed)?;

    log::info!("report written to {}", path.display());
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        count: usize,
        name: &'static str,
    }

    #[test]
    fn writes_pretty_json_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");

        write_json(&path, &Sample { count: 2, name: "scan" }).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["name"], "scan");
    }
}
