//! Command-line tests.
//!
//! These run the `micropub` binary against config and request files in a
//! temporary directory. Nothing here talks to the network.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const CONFIG: &str = r#"
site_url = "https://example.com/"
utc_offset = "+00:00"

[store]
repository = "octocat/blog"
token = "ghp_from_file"

[paths]
post = "content/{Y}/{m}/{d}/{slug}.md"

[auth]
tokens = ["tok_from_file"]
"#;

/// Get a command for running micropub with a clean credential environment.
fn micropub() -> Command {
    let mut cmd = Command::cargo_bin("micropub").unwrap();
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_USERNAME")
        .env_remove("GITHUB_PASSWORD")
        .env_remove("MICROPUB_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn workspace(config: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("config.toml").write_str(config).unwrap();
    dir
}

mod basics {
    use super::*;

    #[test]
    fn help_lists_commands() {
        micropub()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("render"))
            .stdout(predicate::str::contains("check-config"));
    }

    #[test]
    fn version_flag_works() {
        micropub()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("micropub"));
    }
}

mod check_config {
    use super::*;

    #[test]
    fn valid_config_is_summarized() {
        let dir = workspace(CONFIG);
        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("check-config")
            .assert()
            .success()
            .stdout(predicate::str::contains("octocat/blog (branch master)"))
            .stdout(predicate::str::contains("configuration OK"))
            .stdout(predicate::str::contains("ghp_from_file").not())
            .stdout(predicate::str::contains("tok_from_file").not());
    }

    #[test]
    fn config_found_through_environment() {
        let dir = workspace(CONFIG);
        micropub()
            .env("MICROPUB_CONFIG", dir.child("config.toml").path())
            .arg("check-config")
            .assert()
            .success()
            .stdout(predicate::str::contains("configuration OK"));
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();
        micropub()
            .arg("--config")
            .arg(dir.child("absent.toml").path())
            .arg("check-config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("no config file found"));
    }

    #[test]
    fn missing_credentials_fail() {
        let dir = workspace(&CONFIG.replace("token = \"ghp_from_file\"", ""));
        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("check-config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("credentials"));
    }

    #[test]
    fn credentials_from_environment() {
        let dir = workspace(&CONFIG.replace("token = \"ghp_from_file\"", ""));
        micropub()
            .env("GITHUB_USERNAME", "alice")
            .env("GITHUB_PASSWORD", "pw")
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("check-config")
            .assert()
            .success()
            .stdout(predicate::str::contains("basic (alice)"));
    }

    #[test]
    fn invalid_template_fails() {
        let dir = workspace(&CONFIG.replace(
            "post = \"content/{Y}/{m}/{d}/{slug}.md\"",
            "post = \"/abs/{slug}.md\"",
        ));
        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("check-config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("paths.post"));
    }
}

mod render {
    use super::*;

    #[test]
    fn json_request() {
        let dir = workspace(CONFIG);
        dir.child("post.json")
            .write_str(
                r#"{
                    "type": ["h-entry"],
                    "properties": {
                        "content": ["hello"],
                        "published": ["2019-08-15T14:35:45+00:00"],
                        "mp-slug": ["hello"]
                    }
                }"#,
            )
            .unwrap();

        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("render")
            .arg(dir.child("post.json").path())
            .assert()
            .success()
            .stdout(predicate::str::contains("path:      content/2019/08/15/hello.md"))
            .stdout(predicate::str::contains(
                "location:  https://example.com/2019/08/15/hello",
            ))
            .stdout(predicate::str::contains("date: '2019-08-15T14:35:45+00:00'"))
            .stdout(predicate::str::ends_with("hello\n"));
    }

    #[test]
    fn form_request() {
        let dir = workspace(CONFIG);
        dir.child("note.txt")
            .write_str("h=entry&content=a+note&published=2019-08-15T14%3A16%3A34.6\n")
            .unwrap();

        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("render")
            .arg(dir.child("note.txt").path())
            .assert()
            .success()
            .stdout(predicate::str::contains("permalink: 2019/08/15/141634"))
            .stdout(predicate::str::contains("a note"));
    }

    #[test]
    fn invalid_request_fails() {
        let dir = workspace(CONFIG);
        dir.child("bad.json")
            .write_str(r#"{"type": [], "properties": {}}"#)
            .unwrap();

        micropub()
            .arg("--config")
            .arg(dir.child("config.toml").path())
            .arg("render")
            .arg(dir.child("bad.json").path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Render failed"));
    }
}
