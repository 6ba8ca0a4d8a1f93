use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const T1: i64 = 1_622_548_800; // 2021-06-01T12:00:00Z
const T2: i64 = 1_647_333_000; // 2022-03-15T08:30:00Z

fn git(dir: &Path, args: &[&str], date: Option<i64>) {
    let mut cmd = std::process::Command::new("git");
    cmd.args(["-c", "user.name=Build Bot", "-c", "user.email=bot@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir);
    if let Some(seconds) = date {
        let date = format!("{seconds} +0000");
        cmd.env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date);
    }
    let output = cmd.output().expect("git must be installed to run these tests");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_file(dir: &Path, name: &str, seconds: i64) {
    fs::write(dir.join(name), format!("{name} {seconds}\n")).unwrap();
    git(dir, &["add", "--", name], None);
    git(dir, &["commit", "-q", "-m", name], Some(seconds));
}

/// Repository with a.txt committed at T1 and pom.xml committed at T2
fn setup_test_repository() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    git(dir.path(), &["init", "-q"], None);
    commit_file(dir.path(), "a.txt", T1);
    commit_file(dir.path(), "pom.xml", T2);
    dir
}

#[test]
fn test_prints_latest_timestamp() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .assert()
        .success()
        .stdout("2022-03-15T08:30:00Z\n");
}

#[test]
fn test_ignore_flag() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("-i")
        .arg("pom.xml")
        .assert()
        .success()
        .stdout("2021-06-01T12:00:00Z\n");
}

#[test]
fn test_config_file() {
    let dir = setup_test_repository();
    let config_dir = tempdir().unwrap();
    let config = config_dir.path().join("buildstamp.toml");
    fs::write(
        &config,
        "[timestamp]\nignore_filter = \"\"\"\npom.xml\n\"\"\"\nformat = \"%Y%m%d\"\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("20210601\n");
}

#[test]
fn test_unix_and_qualifier_formats() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("--unix")
        .assert()
        .success()
        .stdout(format!("{T2}\n"));

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("--qualifier")
        .assert()
        .success()
        .stdout("202203150830\n");
}

#[test]
fn test_invalid_format_rejected() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("--format")
        .arg("%Y-%Q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timestamp format"));
}

#[test]
fn test_multiple_roots() {
    let first = setup_test_repository();
    let second = tempdir().unwrap();
    git(second.path(), &["init", "-q"], None);
    commit_file(second.path(), "only.txt", T1);

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(first.path())
        .arg(second.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains(format!("{}\t2022-03-15T08:30:00Z", first.path().display()))
                .and(predicate::str::contains(format!(
                    "{}\t2021-06-01T12:00:00Z",
                    second.path().display()
                ))),
        );
}

#[test]
fn test_unknown_timestamp_warns() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .args(["-i", "a.txt", "-i", "pom.xml"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("no committed date found"));
}

#[test]
fn test_unknown_timestamp_strict() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .args(["-i", "a.txt", "-i", "pom.xml", "--strict"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("build timestamp unknown"));
}

#[test]
fn test_not_a_repository_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("file.txt"), "plain").unwrap();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read version-control metadata"))
        .stderr(predicate::str::contains("not a git working copy"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = setup_test_repository();

    let mut cmd = Command::cargo_bin("buildstamp").unwrap();
    cmd.arg(dir.path())
        .arg("--verbose")
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout("2022-03-15T08:30:00Z\n")
        .stderr(predicate::str::contains("Aggregated committed dates"));
}
