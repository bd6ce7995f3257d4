use crate::config::DEFAULT_CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as markdown and print it to stderr with bold headings.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each block says what happened and, where there is one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => render_config_not_found(&path.display().to_string()),
        Error::ConfigInvalid { path, reason } => render_config_invalid(&path.display().to_string(), reason),
        Error::CoreStandardInvalid { path, reason } => {
            render_core_standard_invalid(&path.display().to_string(), reason)
        },
        Error::InvalidGlob { pattern, reason } => render_invalid_glob(pattern, reason),
        Error::TomlDe(err) => render_config_syntax("TOML", &err.to_string()),
        Error::Yaml(err) => render_config_syntax("YAML", &err.to_string()),
        _ => render_generic(e),
    };
}

fn render_config_invalid(path: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Config Invalid

`{path}`: {reason}

## Fix

Correct the value, or delete the file to fall back to the defaults.
"
    );
}

fn render_config_not_found(path: &str) -> String {
    return format!(
        "\
# Error: Config Not Found

`{path}` does not exist.

## Fix

Check the `--config` path, or omit it to use `{DEFAULT_CONFIG_FILE}` in the project root.
"
    );
}

fn render_config_syntax(format: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid {format}

{reason}

## Fix

The configuration could not be parsed. No files were touched.
"
    );
}

fn render_core_standard_invalid(path: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Core Standard Invalid

`{path}`: {reason}

## Fix

Set `core_standard` in `{DEFAULT_CONFIG_FILE}` to a markdown file whose front matter lists the core references:

    ---
    core_refs:
      - MQP.md
      - ADRS_Log.md
    ---
"
    );
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::BackupFailed { file, source } => format!(
            "\
# Error: Backup Failed

Could not back up `{}`: {source}

The file was left unchanged.
",
            file.display()
        ),
        Error::ReadFailed { file, source } => format!(
            "\
# Error: Read Failed

Could not read `{}`: {source}
",
            file.display()
        ),
        Error::Utf8 { file } => format!(
            "\
# Error: Not UTF-8

`{}` is not valid UTF-8 text.
",
            file.display()
        ),
        Error::Watch { reason } => format!(
            "\
# Error: Watch Failed

{reason}
"
        ),
        Error::WriteFailed { file, source } => format!(
            "\
# Error: Write Failed

Could not write `{}`: {source}
",
            file.display()
        ),
        Error::Io(err) => format!(
            "\
# Error: I/O

{err}
"
        ),
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_invalid_glob(pattern: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Glob

`{pattern}`: {reason}

## Fix

Check `exclude_patterns` in the configuration, or the `--paths` arguments.
"
    );
}
