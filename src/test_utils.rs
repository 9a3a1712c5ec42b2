use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use crate::{config::ServiceDescriptor, runtime::Layout};

/// Global lock for environment variable modifications in tests.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Creates a full init layout under `root` plus a `logs` directory.
pub fn temp_layout(root: &Path) -> (Layout, PathBuf) {
    let layout = Layout::with_root(root);
    layout.create_dirs().expect("create layout dirs");
    let log_dir = root.join("logs");
    fs::create_dir_all(&log_dir).expect("create log dir");
    (layout, log_dir)
}

/// Descriptor running `executable` with `arguments`, logging under `log_dir`.
pub fn descriptor(
    name: &str,
    executable: &str,
    arguments: &[&str],
    log_dir: &Path,
) -> ServiceDescriptor {
    let mut descriptor = ServiceDescriptor::new(name);
    descriptor.description = format!("{name} test service");
    descriptor.executable = Some(PathBuf::from(executable));
    descriptor.arguments = arguments.iter().map(|arg| arg.to_string()).collect();
    descriptor.options.insert(
        crate::constants::OPTION_LOG_DIRECTORY,
        log_dir.to_string_lossy().into_owned(),
    );
    descriptor
}
