//! End-to-end tests of the `svcctl` binary against a temporary layout.

#[path = "common/mod.rs"]
mod common;

use std::{env, fs, path::Path};

use assert_cmd::Command;
use common::{PidFileGuard, is_process_running, read_pid, write_executable};
use predicates::prelude::*;
use predicates::str::contains;
use sysv_service::runtime::Layout;
use tempfile::tempdir;

fn write_config(dir: &Path, enabled: bool) -> std::path::PathBuf {
    let log_dir = dir.join("logs");
    fs::create_dir_all(&log_dir).expect("log dir");
    let config = dir.join("demo.yaml");
    fs::write(
        &config,
        format!(
            r#"
name: demo
display_name: Demo Service
description: CLI test service
executable: /bin/sleep
arguments: ["30"]
options:
  Enabled: {enabled}
  LogDirectory: "{}"
"#,
            log_dir.display()
        ),
    )
    .expect("write config");
    config
}

fn svcctl() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("svcctl"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_prints_script_without_installing() {
    let temp = tempdir().expect("tempdir");
    let config = write_config(temp.path(), true);

    svcctl()
        .arg("render")
        .arg("--busybox")
        .arg("--config")
        .arg(&config)
        .arg("--root")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(contains("### BEGIN INIT INFO"))
        .stdout(contains("# Short-Description: Demo Service"))
        .stdout(contains("exec '/bin/sleep' '30'"))
        .stdout(contains("grep \"s$(get_pid)s\""));

    assert!(!temp.path().join("etc/init.d/demo").exists());
}

#[test]
fn install_twice_fails_then_uninstall() {
    let temp = tempdir().expect("tempdir");
    let config = write_config(temp.path(), true);
    let layout = Layout::with_root(temp.path());
    layout.create_dirs().expect("layout");

    svcctl()
        .args(["install", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(contains("Installed Demo Service"))
        .stdout(contains("rc3.d/S50demo"));

    assert!(layout.script_path("demo").exists());

    svcctl()
        .args(["install", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(contains("Init already exists"));

    svcctl()
        .args(["disable", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(contains("removed"));

    svcctl()
        .args(["uninstall", "--config"])
        .arg(&config)
        .arg("--root")
        .arg(temp.path())
        .assert()
        .success();

    assert!(!layout.script_path("demo").exists());
    assert!(fs::symlink_metadata(layout.runlevel_dir(2).join("S50demo")).is_err());
}

#[cfg(target_os = "linux")]
#[test]
fn rooted_control_drives_the_rooted_script() {
    let temp = tempdir().expect("tempdir");
    let config = write_config(temp.path(), false);
    let layout = Layout::with_root(temp.path());
    layout.create_dirs().expect("layout");

    // A host `service` that claims everything is running must not be consulted.
    let fake_bin = temp.path().join("bin");
    fs::create_dir_all(&fake_bin).expect("bin dir");
    write_executable(&fake_bin.join("service"), "#!/bin/sh\necho Running\nexit 0\n");
    let path = format!(
        "{}:{}",
        fake_bin.display(),
        env::var("PATH").unwrap_or_default()
    );

    let pid_file = layout.pid_dir().join("demo.pid");
    let _guard = PidFileGuard::new(pid_file.clone());

    let run = |args: &[&str]| {
        let mut cmd = svcctl();
        cmd.env("PATH", &path)
            .args(args)
            .arg("--config")
            .arg(&config)
            .arg("--root")
            .arg(temp.path());
        cmd
    };

    run(&["install"]).assert().success();

    run(&["status", "--json"])
        .assert()
        .code(1)
        .stdout(contains("\"platform\": \"linux-sysv\""))
        .stdout(contains("\"status\": \"stopped\""));

    run(&["start"]).assert().success();
    let pid = read_pid(&pid_file).expect("pid file written");
    assert!(is_process_running(pid));

    run(&["status"])
        .assert()
        .code(0)
        .stdout(contains("Demo Service: Running"));

    run(&["stop"]).assert().success();
    assert!(!pid_file.exists());
    assert!(!is_process_running(pid));

    run(&["status", "--json"])
        .assert()
        .code(1)
        .stdout(contains("\"status\": \"stopped\""));

    run(&["uninstall"]).assert().success();

    run(&["status", "--json"])
        .assert()
        .code(3)
        .stdout(contains("\"status\": \"unknown\""));
}

#[test]
fn missing_config_fails() {
    let temp = tempdir().expect("tempdir");

    svcctl()
        .args(["start", "--config"])
        .arg(temp.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(contains("absent.yaml"));
}

#[test]
fn detect_reports_listing_tool_flavour() {
    svcctl()
        .arg("detect")
        .assert()
        .success()
        .stdout(contains("busybox").or(contains("standard")));
}
