use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn digest_cmd() -> Command {
    Command::cargo_bin("capsule-digest").unwrap()
}

/// Command wired to a flat feed list inside `dir`, with SMTP settings that are
/// never contacted.
fn file_mode_cmd(dir: &Path) -> Command {
    let mut cmd = digest_cmd();
    cmd.env("CAPSULE_SOURCE", "file")
        .env("CAPSULE_FEEDS_FILE", dir.join("feeds.txt"))
        .env("CAPSULE_DB_PATH", dir.join("test.db"))
        .env("SMTP_HOST", "smtp.invalid")
        .env("SMTP_FROM", "digest@example.com")
        .env("SMTP_TO", "reader@example.com")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_help_shows_dry_run_flag() {
    digest_cmd()
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--date"));
}

#[test]
fn test_help_lists_commands() {
    digest_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schedule"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_run_without_smtp_host_fails() {
    let temp_dir = TempDir::new().unwrap();

    digest_cmd()
        .arg("run")
        .arg("--dry-run")
        .env_remove("SMTP_HOST")
        .env("SMTP_FROM", "digest@example.com")
        .env("CAPSULE_DB_PATH", temp_dir.path().join("test.db"))
        .env("RUST_LOG", "off")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SMTP_HOST"));
}

#[test]
fn test_run_rejects_malformed_date() {
    let temp_dir = TempDir::new().unwrap();

    file_mode_cmd(temp_dir.path())
        .arg("run")
        .arg("--date")
        .arg("yesterday")
        .assert()
        .failure();
}

mod file_source {
    use super::*;

    #[test]
    fn test_empty_feed_list_sends_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("feeds.txt"), "").unwrap();

        file_mode_cmd(temp_dir.path())
            .arg("run")
            .arg("--dry-run")
            .arg("--date")
            .arg("2024-06-01")
            .assert()
            .success()
            .stdout(predicate::str::contains("Looking for entries published on 2024-06-01"))
            .stdout(predicate::str::contains("Would send 0 digests"))
            .stdout(predicate::str::contains("[DRY RUN]").not());
    }

    #[test]
    fn test_unreadable_feed_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("feeds.txt"), "[::1/feed\n").unwrap();

        file_mode_cmd(temp_dir.path())
            .arg("run")
            .arg("--dry-run")
            .arg("--date")
            .arg("2024-06-01")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "[DRY RUN] digest@example.com -> reader@example.com",
            ))
            .stdout(predicate::str::contains("Subject: Daily Capsule News for 2024-06-01"))
            .stdout(predicate::str::contains("These feeds could not be read:"))
            .stdout(predicate::str::contains("Would send 1 digests"));
    }

    #[test]
    fn test_add_then_list() {
        let temp_dir = TempDir::new().unwrap();

        file_mode_cmd(temp_dir.path())
            .arg("add")
            .arg("reader@example.com")
            .arg("example.org/gemlog/")
            .assert()
            .success()
            .stdout(predicate::str::contains("capsule://example.org/gemlog/"));

        file_mode_cmd(temp_dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("reader@example.com (1 feeds)"))
            .stdout(predicate::str::contains("example.org/gemlog/"));
    }

    #[test]
    fn test_add_rejects_invalid_address() {
        let temp_dir = TempDir::new().unwrap();

        file_mode_cmd(temp_dir.path())
            .arg("add")
            .arg("reader@example.com")
            .arg("[::1/feed")
            .assert()
            .failure();

        assert!(!temp_dir.path().join("feeds.txt").exists());
    }

    #[test]
    fn test_file_source_requires_recipient() {
        let temp_dir = TempDir::new().unwrap();

        file_mode_cmd(temp_dir.path())
            .env_remove("SMTP_TO")
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SMTP_TO"));
    }
}

mod store_source {
    use super::*;

    fn store_cmd(dir: &Path) -> Command {
        let mut cmd = digest_cmd();
        cmd.env("CAPSULE_SOURCE", "store")
            .env("CAPSULE_DB_PATH", dir.join("test.db"))
            .env("SMTP_HOST", "smtp.invalid")
            .env("SMTP_FROM", "digest@example.com")
            .env_remove("SMTP_TO")
            .env("RUST_LOG", "off");
        cmd
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();

        store_cmd(temp_dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No subscribers configured."));
    }

    #[test]
    fn test_subscribers_grouped_in_store() {
        let temp_dir = TempDir::new().unwrap();

        for (email, address) in [
            ("a@example.com", "one.example/"),
            ("a@example.com", "//two.example/log"),
            ("b@example.com", "one.example/"),
        ] {
            store_cmd(temp_dir.path())
                .arg("add")
                .arg(email)
                .arg(address)
                .assert()
                .success();
        }

        store_cmd(temp_dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("a@example.com (2 feeds)"))
            .stdout(predicate::str::contains("b@example.com (1 feeds)"));
    }
}
