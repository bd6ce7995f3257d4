use std::path::Path;
use std::process::{Command, Output};

fn autoxref(root: &Path, args: &[&str]) -> Output {
    return Command::new(env!("CARGO_BIN_EXE_autoxref"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    return std::fs::read_to_string(root.join(rel)).unwrap();
}

/// A project with a known term and backups enabled.
fn scan_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        ".autoxref.toml",
        r#"
standalone_keywords = ["MQP"]
exclude_patterns = ["_bak", "_bak/**"]

[known_terms_to_paths]
MQP = "MQP.md"

[backup_options]
enabled = true
directory = "_bak"
"#,
    );
    write(root, "MQP.md", "# Master Quantum Prompt\n");
    write(root, "docs/guide.md", "See MQP for guidance\n");
    return dir;
}

/// A project whose standard lists two core references.
fn core_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, ".autoxref.toml", "core_standard = \"MQP.md\"\n");
    write(root, "MQP.md", "---\ncore_refs: [A.md, B.md]\n---\nStandard\n");
    write(root, "A.md", "# A\n");
    write(root, "B.md", "# B\n");
    write(root, "doc.md", "@references:\n- A.md\n- B.md\n- C.md\n\nbody\n");
    return dir;
}

#[test]
fn scan_dry_run_reports_without_writing() {
    let dir = scan_project();
    let out = autoxref(dir.path(), &["scan"]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("docs/guide.md:1  MQP -> ../MQP.md  (known_terms_map)"), "{stdout}");
    assert_eq!(read(dir.path(), "docs/guide.md"), "See MQP for guidance\n");
    assert!(!dir.path().join("_bak").exists());
}

#[test]
fn scan_apply_injects_with_backup_and_json_report() {
    let dir = scan_project();
    let report = dir.path().join("out/summary.json");
    let out = autoxref(
        dir.path(),
        &["scan", "--apply", "--output", report.to_str().unwrap()],
    );

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        read(dir.path(), "docs/guide.md"),
        "@references:\n- ../MQP.md\n\nSee MQP for guidance\n"
    );

    let backups: Vec<_> = std::fs::read_dir(dir.path().join("_bak")).unwrap().collect();
    assert_eq!(backups.len(), 1);

    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(summary["references_injected"], 1);
    assert_eq!(summary["suggestions"][0]["resolved_by"], "known_terms_map");

    let again = autoxref(dir.path(), &["scan", "--apply"]);
    assert!(again.status.success());
    assert_eq!(
        read(dir.path(), "docs/guide.md"),
        "@references:\n- ../MQP.md\n\nSee MQP for guidance\n"
    );
}

#[test]
fn regen_diagnose_does_not_mutate() {
    let dir = core_project();
    let before = read(dir.path(), "doc.md");
    let out = autoxref(dir.path(), &["regen", "--mode", "diagnose"]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("DRIFT   doc.md  -C.md"));
    assert_eq!(read(dir.path(), "doc.md"), before);
}

#[test]
fn regen_fix_core_purges_legacy_entries() {
    let dir = core_project();
    let out = autoxref(dir.path(), &["regen", "--mode", "fix-core", "--yes", "--paths", "doc.md"]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(read(dir.path(), "doc.md"), "@references:\n- A.md\n- B.md\n\nbody\n");
    assert!(String::from_utf8_lossy(&out.stdout).contains("PURGED  doc.md  -C.md"));
}

#[test]
fn regen_full_is_idempotent_and_gates_on_compliance() {
    let dir = core_project();

    let dry = autoxref(dir.path(), &["regen", "--mode", "full", "--dry-run"]);
    assert_eq!(dry.status.code(), Some(1));

    let first = autoxref(dir.path(), &["regen", "--mode", "full", "--yes"]);
    assert_eq!(first.status.code(), Some(0), "{}", String::from_utf8_lossy(&first.stderr));
    let snapshot = read(dir.path(), "doc.md");
    assert!(read(dir.path(), "A.md").starts_with("@references:\n- B.md\n"));

    let second = autoxref(dir.path(), &["regen", "--mode", "full", "--yes"]);
    assert_eq!(second.status.code(), Some(0));
    assert_eq!(read(dir.path(), "doc.md"), snapshot);

    let strict = autoxref(dir.path(), &["regen", "--mode", "full", "--dry-run"]);
    assert_eq!(strict.status.code(), Some(0));
}

#[test]
fn configuration_errors_exit_3_before_touching_files() {
    let dir = scan_project();
    write(dir.path(), ".autoxref.toml", "exclude_patterns = [\"a/{b\"]\n");

    let out = autoxref(dir.path(), &["scan", "--apply"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid Glob"));
    assert_eq!(read(dir.path(), "docs/guide.md"), "See MQP for guidance\n");

    let missing = autoxref(dir.path(), &["--config", "nope.yaml", "scan"]);
    assert_eq!(missing.status.code(), Some(3));
}

#[test]
fn regen_without_core_standard_is_fatal() {
    let dir = scan_project();
    let out = autoxref(dir.path(), &["regen"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Core Standard Invalid"));
}
