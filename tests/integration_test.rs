use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Stand-in for `python -m pip`: records every call next to itself and
/// answers the handful of subcommands the CLI uses.
#[cfg(unix)]
const FAKE_PIP: &str = r#"#!/bin/sh
dir=$(dirname "$0")
shift 2
echo "$@" >> "$dir/calls"
echo "WARNING: You are using an old pip" >&2
case "$1" in
  list)
    if [ "$2" = "--outdated" ]; then
      echo '[{"name": "six", "version": "1.15.0", "latest_version": "1.16.0", "latest_filetype": "wheel"}]'
    else
      echo '[{"name": "pip", "version": "24.0"}, {"name": "six", "version": "1.15.0"}]'
    fi
    ;;
  install)
    case "$2" in
      *==)
        echo "ERROR: Could not find a version that satisfies the requirement $2 (from versions: 1.0, 1.1, 2.0)" >&2
        echo "ERROR: No matching distribution found for $2" >&2
        exit 1
        ;;
      missing-pkg)
        echo "ERROR: No matching distribution found for missing-pkg" >&2
        exit 2
        ;;
      *)
        echo "Successfully installed $2"
        ;;
    esac
    ;;
  uninstall)
    echo "Successfully uninstalled $2"
    ;;
esac
"#;

#[cfg(unix)]
fn fake_python() -> (TempDir, PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let python = dir.path().join("python3");
    fs::write(&python, FAKE_PIP).unwrap();
    fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();
    (dir, python)
}

#[cfg(unix)]
fn calls(dir: &Path) -> String {
    fs::read_to_string(dir.join("calls")).unwrap_or_default()
}

fn pipmgr() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("pipmgr"));
    cmd.env_remove("PIPMGR_PYTHON")
        .env_remove("PIPMGR_MIRROR")
        .env_remove("PIPMGR_SEARCH_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[cfg(unix)]
#[test]
fn test_list_installed() {
    let (dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("pip"))
        .stdout(predicate::str::contains("six"))
        .stdout(predicate::str::contains("1.15.0"))
        .stdout(predicate::str::contains("->").not());

    assert_eq!(calls(dir.path()), "list --format json\n");
}

#[cfg(unix)]
#[test]
fn test_list_with_outdated_check_as_json() {
    let (dir, python) = fake_python();

    let output = pipmgr()
        .env("PIPMGR_PYTHON", &python)
        .args(["list", "--outdated-check", "--json", "--mirror", "tsinghua"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["name"], "pip");
    assert!(records[0].get("latest_version").is_none());
    assert_eq!(records[1]["name"], "six");
    assert_eq!(records[1]["latest_version"], "1.16.0");

    assert!(calls(dir.path()).contains(
        "list --outdated --format json -i https://pypi.tuna.tsinghua.edu.cn/simple"
    ));
}

#[cfg(unix)]
#[test]
fn test_install_with_mirror() {
    let (dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .args(["--mirror", "aliyun", "install", "requests==2.31.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed requests==2.31.0"));

    assert_eq!(
        calls(dir.path()),
        "install requests==2.31.0 -i https://mirrors.aliyun.com/pypi/simple\n"
    );
}

#[cfg(unix)]
#[test]
fn test_install_from_requirements_file() {
    let (dir, python) = fake_python();
    let requirements = dir.path().join("requirements.txt");
    fs::write(&requirements, "six==1.16.0\n").unwrap();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .arg("install")
        .arg("-r")
        .arg(&requirements)
        .assert()
        .success();

    assert_eq!(
        calls(dir.path()),
        format!("install -r {}\n", requirements.display())
    );
}

#[cfg(unix)]
#[test]
fn test_install_failure_reports_tool_error_once() {
    let (_dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .args(["install", "missing-pkg"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No matching distribution found for missing-pkg").count(1))
        .stderr(predicate::str::contains("WARNING").not());
}

#[cfg(unix)]
#[test]
fn test_remove_protected_package_does_not_run_pip() {
    let (dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .args(["remove", "setuptools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("required by pip"));

    assert_eq!(calls(dir.path()), "");
}

#[cfg(unix)]
#[test]
fn test_remove_package() {
    let (dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .args(["remove", "six==1.15.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed six"));

    assert_eq!(calls(dir.path()), "uninstall six -y\n");
}

#[cfg(unix)]
#[test]
fn test_versions_newest_first() {
    let (_dir, python) = fake_python();

    pipmgr()
        .arg("--python")
        .arg(&python)
        .args(["versions", "foo"])
        .assert()
        .success()
        .stdout("2.0\n1.1\n1.0\n");
}

#[test]
fn test_missing_interpreter_fails() {
    let dir = tempdir().unwrap();

    pipmgr()
        .arg("--python")
        .arg(dir.path().join("no-such-python"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to start"));
}

#[test]
fn test_invalid_mirror_fails() {
    pipmgr()
        .args(["--mirror", "nowhere", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid mirror 'nowhere'"));
}

const SEARCH_PAGE: &str = r#"<html><body>
<ul class="unstyled" aria-label="Search results">
  <li>
    <a class="package-snippet" href="/project/requests/">
      <h3 class="package-snippet__title">
        <span class="package-snippet__name">requests</span>
        <span class="package-snippet__version">2.31.0</span>
        <span class="package-snippet__created"><time datetime="2023-05-22T15:12:44+0000">May 22, 2023</time></span>
      </h3>
      <p class="package-snippet__description">Python HTTP for Humans.</p>
    </a>
  </li>
</ul>
<div class="button-group button-group--pagination">
  <a href="?q=requests&amp;page=1" class="button button-group__button">1</a>
  <a href="?q=requests&amp;page=2" class="button button-group__button">2</a>
  <a href="?q=requests&amp;page=7" class="button button-group__button">7</a>
  <a href="?q=requests&amp;page=2" class="button button-group__button">Next</a>
</div>
</body></html>"#;

#[test]
fn test_search_against_local_index() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/search/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "requests".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(SEARCH_PAGE)
        .create();

    pipmgr()
        .args(["--search-url", &format!("{}/search/", server.url())])
        .args(["search", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("requests 2.31.0"))
        .stdout(predicate::str::contains("Python HTTP for Humans."))
        .stdout(predicate::str::contains("Page 1 of 7"));

    mock.assert();
}

#[test]
fn test_search_without_results() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/search/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body><p>There were no results</p></body></html>")
        .create();

    pipmgr()
        .env("PIPMGR_SEARCH_URL", format!("{}/search/", server.url()))
        .args(["search", "zzzz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found for 'zzzz'"));
}

#[test]
fn test_no_subcommand_fails() {
    pipmgr().assert().failure();
}
