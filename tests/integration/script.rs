//! Runtime behaviour of the installed init script.

#[path = "common/mod.rs"]
mod common;

use std::{fs, thread, time::Duration};

use common::{
    PidFileGuard, is_process_alive, is_process_running, read_pid, run_script, wait_for_path,
    write_executable,
};
use sysv_service::{
    config::ServiceDescriptor,
    constants::OPTION_ENABLED,
    install::Installer,
    runtime::Layout,
    test_utils::{descriptor, temp_layout},
};
use tempfile::tempdir;

fn install(layout: &Layout, mut descriptor: ServiceDescriptor) {
    descriptor.options.insert(OPTION_ENABLED, false);
    Installer::new(&descriptor, layout)
        .install_with(false)
        .expect("install");
}

#[cfg(target_os = "linux")]
#[test]
fn start_status_stop_cycle() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    install(&layout, descriptor("cycle", "/bin/sleep", &["30"], &log_dir));

    let script = layout.script_path("cycle");
    let pid_file = layout.pid_dir().join("cycle.pid");
    let _guard = PidFileGuard::new(pid_file.clone());

    let (code, out) = run_script(&script, "status");
    assert_eq!((code, out.as_str()), (1, "Stopped\n"));

    let (code, out) = run_script(&script, "start");
    assert_eq!(code, 0, "start output: {out}");
    assert!(out.contains("Starting cycle"));
    let pid = read_pid(&pid_file).expect("pid file written");
    assert!(is_process_alive(pid));

    let (code, out) = run_script(&script, "start");
    assert_eq!((code, out.as_str()), (0, "Already started\n"));
    assert_eq!(read_pid(&pid_file), Some(pid));

    let (code, out) = run_script(&script, "status");
    assert_eq!((code, out.as_str()), (0, "Running\n"));

    let (code, out) = run_script(&script, "stop");
    assert_eq!(code, 0, "stop output: {out}");
    assert!(out.contains("Stopped"));
    assert!(!pid_file.exists());
    assert!(!is_process_running(pid));

    let (code, out) = run_script(&script, "stop");
    assert_eq!((code, out.as_str()), (0, "Not running\n"));

    assert!(log_dir.join("cycle.log").exists());
    assert!(log_dir.join("cycle.err").exists());
}

#[cfg(target_os = "linux")]
#[test]
fn arguments_and_environment_reach_the_process() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let args_out = temp.path().join("args.out");
    let helper = temp.path().join("helper.sh");
    write_executable(
        &helper,
        "#!/bin/sh\nprintf '%s\\0' \"$@\" > \"$ARGS_OUT\"\npwd > \"$ARGS_OUT.cwd\"\nexec sleep 30\n",
    );
    fs::write(
        layout.env_override_dir().join("argv"),
        format!("ARGS_OUT='{}'\nexport ARGS_OUT\n", args_out.display()),
    )
    .expect("write env override");

    let arguments = [
        "two words",
        "it's",
        "say \"hi\"",
        "$HOME",
        "`id`",
        "back\\slash",
        "",
    ];
    let workdir = temp.path().join("work dir");
    fs::create_dir_all(&workdir).expect("workdir");
    let mut descriptor = descriptor("argv", helper.to_str().unwrap(), &arguments, &log_dir);
    descriptor.working_directory = Some(workdir.clone());
    install(&layout, descriptor);

    let script = layout.script_path("argv");
    let _guard = PidFileGuard::new(layout.pid_dir().join("argv.pid"));
    let (code, out) = run_script(&script, "start");
    assert_eq!(code, 0, "start output: {out}");

    let cwd_out = temp.path().join("args.out.cwd");
    wait_for_path(&cwd_out);
    thread::sleep(Duration::from_millis(100));

    let recorded = fs::read_to_string(&args_out).expect("args recorded");
    let received: Vec<&str> = recorded.split_terminator('\0').collect();
    assert_eq!(received, arguments);
    assert_eq!(
        fs::read_to_string(&cwd_out).expect("cwd recorded").trim(),
        workdir.canonicalize().unwrap().to_str().unwrap()
    );

    let (code, _) = run_script(&script, "stop");
    assert_eq!(code, 0);
}

#[cfg(target_os = "linux")]
#[test]
fn restart_replaces_the_process() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    install(&layout, descriptor("again", "/bin/sleep", &["30"], &log_dir));

    let script = layout.script_path("again");
    let pid_file = layout.pid_dir().join("again.pid");
    let _guard = PidFileGuard::new(pid_file.clone());

    assert_eq!(run_script(&script, "start").0, 0);
    let first = read_pid(&pid_file).expect("first pid");

    let (code, out) = run_script(&script, "restart");
    assert_eq!(code, 0, "restart output: {out}");
    let second = read_pid(&pid_file).expect("second pid");

    assert_ne!(first, second);
    assert!(!is_process_running(first));
    assert!(is_process_running(second));
    assert_eq!(run_script(&script, "stop").0, 0);
}

#[cfg(target_os = "linux")]
#[test]
fn stop_gives_up_after_grace_period() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    install(
        &layout,
        descriptor(
            "stubborn",
            "/bin/sh",
            &["-c", "trap '' TERM; exec sleep 60"],
            &log_dir,
        ),
    );

    let script = layout.script_path("stubborn");
    let pid_file = layout.pid_dir().join("stubborn.pid");
    let _guard = PidFileGuard::new(pid_file.clone());

    assert_eq!(run_script(&script, "start").0, 0);
    thread::sleep(Duration::from_millis(200));

    let (code, out) = run_script(&script, "stop");
    assert_eq!(code, 1);
    assert!(out.contains("Not stopped"));
    assert!(pid_file.exists());

    let (code, out) = run_script(&script, "restart");
    assert_eq!(code, 1);
    assert!(out.contains("Unable to stop, will not attempt to start"));
}

#[test]
fn unknown_operation_prints_usage() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    install(&layout, descriptor("usage", "/bin/sleep", &["30"], &log_dir));

    let (code, out) = run_script(&layout.script_path("usage"), "reload");
    assert_eq!(code, 1);
    assert!(out.contains("{start|stop|restart|status}"));
}
