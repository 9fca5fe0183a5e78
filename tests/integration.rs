use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ndx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ndx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let notes_dir = root.join("notes");
    fs::create_dir_all(&notes_dir).unwrap();
    fs::write(
        notes_dir.join("burping.md"),
        "# Burping\n\nHold the baby upright against your shoulder.\n\nPat gently between the shoulder blades.",
    )
    .unwrap();
    fs::write(
        notes_dir.join("sleep.md"),
        "# Sleep\n\nAlways place the baby on their back to sleep.\n\nRoom-share for the first six months.",
    )
    .unwrap();
    fs::write(
        notes_dir.join("feeding.txt"),
        "Feed every two to three hours in the first weeks.\n\nWatch for hunger cues before crying starts.",
    )
    .unwrap();

    let config_content = format!(
        r#"[notes]
roots = ["{}/notes"]
include_globs = ["**/*.md", "**/*.txt"]

[index]
persist_dir = "{}/data/index"

[chunking]
max_tokens = 700
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("ndx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ndx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ndx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ndx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_sync_indexes_all_notes() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ndx(&config_path, &["sync"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("scanned: 3 notes"));
    assert!(stdout.contains("upserted: 3 (3 new, 0 modified)"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_second_sync_reports_no_changes() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (stdout, _, success) = run_ndx(&config_path, &["sync"]);
    assert!(success);
    assert!(stdout.contains("no changes needed"));
    assert!(!stdout.contains("upserted"));
}

#[test]
fn test_modified_note_is_resynced() {
    let (tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);

    fs::write(
        tmp.path().join("notes/burping.md"),
        "# Burping\n\nSit the baby on your lap, supporting the chin.",
    )
    .unwrap();

    let (stdout, _, success) = run_ndx(&config_path, &["sync"]);
    assert!(success);
    assert!(stdout.contains("unchanged: 2"));
    assert!(stdout.contains("upserted: 1 (0 new, 1 modified)"));
}

#[test]
fn test_new_note_is_added_incrementally() {
    let (tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);

    fs::write(
        tmp.path().join("notes/bathing.md"),
        "# Bathing\n\nUse lukewarm water; sponge baths until the cord falls off.",
    )
    .unwrap();

    let (stdout, _, success) = run_ndx(&config_path, &["sync"]);
    assert!(success);
    assert!(stdout.contains("unchanged: 3"));
    assert!(stdout.contains("upserted: 1 (1 new, 0 modified)"));
}

#[test]
fn test_dry_run_does_not_create_index() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ndx(&config_path, &["sync", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("would upsert: 3"));
    assert!(!tmp.path().join("data/index/index.json").exists());
}

#[test]
fn test_full_resync_reindexes_everything() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (stdout, _, success) = run_ndx(&config_path, &["sync", "--full"]);
    assert!(success);
    assert!(stdout.contains("upserted: 3 (0 new, 3 modified)"));
}

#[test]
fn test_limited_sync_reports_deferred_notes() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ndx(&config_path, &["sync", "--limit", "1"]);
    assert!(success, "stdout: {}", stdout);
    assert!(stdout.contains("upserted: 1 (1 new, 0 modified)"));
    assert!(stdout.contains("deferred: 2 (limit)"));
    assert!(!stdout.contains("no changes needed"));

    // The deferred notes come back on the next pass.
    let (stdout, _, success) = run_ndx(&config_path, &["sync"]);
    assert!(success);
    assert!(stdout.contains("upserted: 2 (2 new, 0 modified)"));
}

#[test]
fn test_limit_zero_does_not_claim_no_changes() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ndx(&config_path, &["sync", "--limit", "0"]);
    assert!(success, "stdout: {}", stdout);
    assert!(!stdout.contains("no changes needed"));
    assert!(stdout.contains("upserted: 0 (0 new, 0 modified)"));
    assert!(stdout.contains("deferred: 3 (limit)"));
}

#[test]
fn test_search_keyword_finds_note() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (stdout, stderr, success) = run_ndx(&config_path, &["search", "shoulder"]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(stdout.contains("burping"), "missing result: {}", stdout);
}

#[test]
fn test_search_without_index_fails_clearly() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ndx(&config_path, &["search", "anything"]);
    assert!(!success);
    assert!(stderr.contains("Run `ndx sync` first"));
}

#[test]
fn test_search_semantic_requires_embeddings() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (_, stderr, success) = run_ndx(&config_path, &["search", "naps", "--mode", "semantic"]);
    assert!(!success);
    assert!(stderr.contains("requires embeddings"));
}

#[test]
fn test_status_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (stdout, _, success) = run_ndx(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("Notes:       3"));
    assert!(stdout.contains("Last sync:"));
}

#[test]
fn test_status_shows_deleted_note_drift() {
    let (tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);

    // Delete one note and touch another so the next pass persists a
    // fresh scan count.
    fs::remove_file(tmp.path().join("notes/feeding.txt")).unwrap();
    fs::write(
        tmp.path().join("notes/sleep.md"),
        "# Sleep\n\nBack to sleep, always.",
    )
    .unwrap();
    run_ndx(&config_path, &["sync"]);

    let (stdout, _, success) = run_ndx(&config_path, &["status"]);
    assert!(success);
    // Deleted notes stay indexed; status surfaces the gap.
    assert!(stdout.contains("Notes:       3"), "stdout: {}", stdout);
    assert!(
        stdout.contains("(2 live at last scan; deleted notes stay indexed)"),
        "stdout: {}",
        stdout
    );
}

#[test]
fn test_status_without_index() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ndx(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains("No index"));
}

#[test]
fn test_unreadable_root_fails_without_partial_index() {
    let (tmp, config_path) = setup_test_env();

    // Point the config at a root that does not exist.
    let config_content = format!(
        r#"[notes]
roots = ["{}/missing"]

[index]
persist_dir = "{}/data/index"
"#,
        tmp.path().display(),
        tmp.path().display()
    );
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_ndx(&config_path, &["sync"]);
    assert!(!success);
    assert!(stderr.contains("unavailable"), "stderr: {}", stderr);
    assert!(!tmp.path().join("data/index/index.json").exists());
}

#[test]
fn test_env_override_notes_dirs() {
    let (tmp, config_path) = setup_test_env();

    let other_notes = tmp.path().join("other");
    fs::create_dir_all(&other_notes).unwrap();
    fs::write(other_notes.join("only.md"), "a single note").unwrap();

    let binary = ndx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(["sync"])
        .env("NDX_NOTES_DIRS", other_notes.to_str().unwrap())
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success());
    assert!(stdout.contains("scanned: 1 notes"), "stdout: {}", stdout);
}

#[test]
fn test_ask_rejects_unknown_model() {
    let (_tmp, config_path) = setup_test_env();

    run_ndx(&config_path, &["sync"]);
    let (_, stderr, success) = run_ndx(
        &config_path,
        &["ask", "how often to feed?", "--model", "llama-70b"],
    );
    assert!(!success);
    assert!(stderr.contains("Unknown model"));
}
