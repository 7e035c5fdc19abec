use assert_cmd::Command;
use filetime::FileTime;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn write_aged(root: &Path, rel: &str, age_days: u64) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, rel).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_days * 24 * 60 * 60);
    filetime::set_file_mtime(&path, FileTime::from_system_time(mtime)).unwrap();
}

fn setup_test_directory() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let public = dir.path().join("public");

    write_aged(&public, "index.html", 1);
    write_aged(&public, "assets/app.js", 2);
    write_aged(&public, "assets/app.js.map", 1);
    write_aged(&public, "blog/2019.html", 400);

    dir
}

fn ttl_cache(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ttl-cache").unwrap();
    cmd.current_dir(dir);
    cmd
}

#[test]
fn test_prune_dry_run_deletes_nothing() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["prune", "--path", "public", "--ttl", "30", "-x", r"\.map$", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove: public/blog/2019.html"))
        .stdout(predicate::str::contains("app.js.map"))
        .stdout(predicate::str::contains("Dry run mode"));

    assert!(dir.path().join("public/blog/2019.html").exists());
    assert!(dir.path().join("public/assets/app.js.map").exists());
}

#[test]
fn test_prune_removes_expired_and_excluded() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["prune", "--path", "public", "--ttl", "30", "-x", r"\.map$"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 of 4 files (1 expired, 1 excluded)"));

    assert!(dir.path().join("public/index.html").exists());
    assert!(dir.path().join("public/assets/app.js").exists());
    assert!(!dir.path().join("public/assets/app.js.map").exists());
    assert!(!dir.path().join("public/blog/2019.html").exists());
}

#[test]
fn test_pre_build_without_cache_is_a_noop() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["pre-build", "--path", "public", "--ttl", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cache found"));

    assert!(dir.path().join("public/blog/2019.html").exists());
    assert!(!dir.path().join(".ttl-cache-stash").exists());
}

#[test]
fn test_post_build_saves_and_next_run_restores() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["post-build", "--path", "public"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stash to merge"))
        .stdout(predicate::str::contains("Saved cache for public"));
    assert!(dir.path().join(".ttl-cache/public/index.html").exists());

    // a clean checkout for the next run
    fs::remove_dir_all(dir.path().join("public")).unwrap();

    ttl_cache(dir.path())
        .args(["pre-build", "--path", "public", "--ttl", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 of 4 files"))
        .stdout(predicate::str::contains("Stashed 3 files"));
    assert!(dir.path().join(".ttl-cache-stash/index.html").exists());
    assert!(!dir.path().join(".ttl-cache-stash/blog/2019.html").exists());

    // the build emits a fresh index.html only
    fs::remove_dir_all(dir.path().join("public")).unwrap();
    fs::create_dir_all(dir.path().join("public")).unwrap();
    fs::write(dir.path().join("public/index.html"), "fresh").unwrap();

    ttl_cache(dir.path())
        .args(["post-build", "--path", "public"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 2 cached files (1 kept from fresh build)"));

    assert_eq!(
        fs::read_to_string(dir.path().join("public/index.html")).unwrap(),
        "fresh"
    );
    assert!(dir.path().join("public/assets/app.js").exists());
    assert!(!dir.path().join(".ttl-cache-stash").exists());
}

#[test]
fn test_reads_settings_from_config_file() {
    let dir = setup_test_directory();
    fs::write(
        dir.path().join("ttl-cache.toml"),
        "path = \"public\"\nttl = \"2w\"\nexclude = '\\.map$'\n",
    )
    .unwrap();

    ttl_cache(dir.path())
        .args(["prune", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove 2 of 4 files"));
}

#[test]
fn test_invalid_exclude_pattern_fails_before_touching_files() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["prune", "--path", "public", "--ttl", "0", "-x", "(unclosed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid exclude pattern"));

    assert!(dir.path().join("public/index.html").exists());
}

#[test]
fn test_missing_path_fails() {
    let dir = tempdir().unwrap();

    ttl_cache(dir.path())
        .args(["prune"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no build output path"));
}

#[test]
fn test_stash_inside_build_output_is_rejected() {
    let dir = setup_test_directory();

    ttl_cache(dir.path())
        .args(["pre-build", "--path", "public", "--stash-dir", "public/.stash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overlaps build output"));
}

#[test]
fn test_fixed_reference_date() {
    let dir = tempdir().unwrap();
    let public = dir.path().join("public");
    fs::create_dir_all(&public).unwrap();
    fs::write(public.join("page.html"), "page").unwrap();

    // every file is far younger than a date decades away
    ttl_cache(dir.path())
        .args(["prune", "--path", "public", "--ttl", "365", "--now", "2099-01-01", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove 1 of 1 files (1 expired"));
}

#[test]
fn test_prune_current_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();

    ttl_cache(dir.path())
        .args(["prune", "--path", ".", "--ttl", "30", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove 0 of 1 files"));

    assert!(dir.path().join("a.txt").exists());
}

#[test]
fn test_pre_build_on_current_directory_is_rejected() {
    let dir = tempdir().unwrap();

    ttl_cache(dir.path())
        .args(["pre-build", "--path", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overlaps build output"));
}

#[test]
fn test_exclude_help_mentions_empty_pattern() {
    let dir = tempdir().unwrap();

    ttl_cache(dir.path())
        .args(["prune", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("An empty pattern excludes nothing"));
}
