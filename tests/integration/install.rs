//! Install, uninstall and control through the service facade.

#[path = "common/mod.rs"]
mod common;

use std::{fs, io, os::unix::fs::PermissionsExt};

use common::{PidFileGuard, is_process_running, read_pid};
use sysv_service::{
    config::ServiceDescriptor,
    constants::{OPTION_ENABLED, OPTION_SYSV_SCRIPT},
    error::ServiceError,
    install::AutostartLink,
    runtime::Layout,
    service::SysvService,
    status::Status,
    test_utils::{descriptor, temp_layout},
};
use tempfile::tempdir;

/// Entry point that never exists, forcing the direct script fallback.
const MISSING_ENTRY_POINT: &str = "/nonexistent/sbin/service";

fn service(layout: &Layout, descriptor: ServiceDescriptor) -> SysvService {
    SysvService::new(descriptor, layout.clone()).with_entry_point(MISSING_ENTRY_POINT)
}

#[test]
fn disabled_install_then_control_through_fallback() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let mut descriptor = descriptor("facade", "/bin/sleep", &["30"], &log_dir);
    descriptor.options.insert(OPTION_ENABLED, false);
    let service = service(&layout, descriptor);

    let report = service.install_with(false).expect("install");
    assert!(report.created.is_empty());

    let script = layout.script_path("facade");
    let mode = fs::metadata(&script).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
    for link in AutostartLink::all() {
        assert!(fs::symlink_metadata(link.path(&layout, "facade")).is_err());
    }

    assert_eq!(service.status().expect("status"), Status::Stopped);

    let pid_file = layout.pid_dir().join("facade.pid");
    let _guard = PidFileGuard::new(pid_file.clone());
    service.start().expect("start");
    assert_eq!(service.status().expect("status"), Status::Running);
    let first = read_pid(&pid_file).expect("pid");

    service.restart().expect("restart");
    let second = read_pid(&pid_file).expect("pid");
    assert_ne!(first, second);
    assert!(!is_process_running(first));

    service.stop().expect("stop");
    assert_eq!(service.status().expect("status"), Status::Stopped);

    service.uninstall().expect("uninstall");
    assert!(!script.exists());
}

#[test]
fn enabled_install_links_every_runlevel() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let service = service(&layout, descriptor("linked", "/bin/sleep", &["30"], &log_dir));

    let report = service.install_with(false).expect("install");
    assert_eq!(report.created.len(), 7);

    let script = layout.script_path("linked");
    for runlevel in [2, 3, 4, 5] {
        let link = layout.runlevel_dir(runlevel).join("S50linked");
        assert_eq!(fs::read_link(&link).unwrap(), script);
    }
    for runlevel in [0, 1, 6] {
        let link = layout.runlevel_dir(runlevel).join("K02linked");
        assert_eq!(fs::read_link(&link).unwrap(), script);
    }

    let disabled = service.set_enabled(false);
    assert_eq!(disabled.removed.len(), 7);
    assert!(disabled.is_clean());
}

#[test]
fn reinstall_conflicts() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let service = service(&layout, descriptor("twice", "/bin/sleep", &["30"], &log_dir));

    service.install_with(false).expect("first install");
    let before = fs::read(layout.script_path("twice")).unwrap();

    let err = service.install_with(true).unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyInstalled(_)));
    assert_eq!(fs::read(layout.script_path("twice")).unwrap(), before);
}

#[test]
fn uninstall_unknown_service_is_not_found() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let service = service(&layout, descriptor("ghost", "/bin/sleep", &["30"], &log_dir));

    let err = service.uninstall().unwrap_err();
    assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
}

#[test]
fn status_of_uninstalled_service_is_unknown() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let service = service(&layout, descriptor("ghost", "/bin/sleep", &["30"], &log_dir));

    let result = service.status();
    assert!(matches!(result, Err(ServiceError::Dispatch { .. })));
    assert_eq!(Status::from_result(&result), Status::Unknown);
}

#[test]
fn custom_script_is_installed_verbatim() {
    let temp = tempdir().expect("tempdir");
    let (layout, log_dir) = temp_layout(temp.path());
    let mut descriptor = descriptor("custom", "/bin/sleep", &["30"], &log_dir);
    descriptor.options.insert(
        OPTION_SYSV_SCRIPT,
        "#!/bin/sh\necho \"Stopped {{Name}}\"\n# {{Cmd}}\nexit 1\n",
    );
    let service = service(&layout, descriptor);

    service.install_with(false).expect("install");
    let script = fs::read_to_string(layout.script_path("custom")).unwrap();
    assert_eq!(
        script,
        "#!/bin/sh\necho \"Stopped custom\"\n# '/bin/sleep' '30'\nexit 1\n"
    );
    assert_eq!(service.status().expect("status"), Status::Stopped);
    assert!(matches!(
        service.start(),
        Err(ServiceError::CommandFailed { code: 1, .. })
    ));
}
