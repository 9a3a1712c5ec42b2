//! Placement of the init script and reconciliation of its autostart links.
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    os::unix::fs::{OpenOptionsExt, PermissionsExt, symlink},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    config::ServiceDescriptor,
    constants::{
        KILL_PREFIX, OPTION_ENABLED, OPTION_USER_SERVICE, SCRIPT_MODE, START_PREFIX,
        START_RUNLEVELS, STOP_RUNLEVELS,
    },
    detect,
    error::ServiceError,
    runtime::Layout,
    script::{ScriptVars, renderer_for},
};

/// One `rc<N>.d/<prefix><name>` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutostartLink {
    pub runlevel: u8,
    pub prefix: &'static str,
}

impl AutostartLink {
    /// The fixed set of links: `S50` at runlevels 2-5, `K02` at 0, 1 and 6.
    pub fn all() -> Vec<AutostartLink> {
        let start = START_RUNLEVELS.iter().map(|&runlevel| AutostartLink {
            runlevel,
            prefix: START_PREFIX,
        });
        let stop = STOP_RUNLEVELS.iter().map(|&runlevel| AutostartLink {
            runlevel,
            prefix: KILL_PREFIX,
        });
        start.chain(stop).collect()
    }

    pub fn path(&self, layout: &Layout, name: &str) -> PathBuf {
        layout
            .runlevel_dir(self.runlevel)
            .join(format!("{}{}", self.prefix, name))
    }
}

/// Outcome of a link reconciliation. Failures are recorded, never raised.
#[derive(Debug, Default)]
pub struct LinkReport {
    pub created: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Entries already in the desired state.
    pub unchanged: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fails when the descriptor asks for a per-user service.
pub fn ensure_system_service(descriptor: &ServiceDescriptor) -> Result<(), ServiceError> {
    if descriptor.options.bool(OPTION_USER_SERVICE, false) {
        return Err(ServiceError::UserServiceUnsupported);
    }
    Ok(())
}

/// Installs and removes the init script of one service.
pub struct Installer<'a> {
    descriptor: &'a ServiceDescriptor,
    layout: &'a Layout,
}

impl<'a> Installer<'a> {
    pub fn new(descriptor: &'a ServiceDescriptor, layout: &'a Layout) -> Self {
        Self { descriptor, layout }
    }

    /// Deterministic script path, after the user-service and name checks.
    pub fn script_path(&self) -> Result<PathBuf, ServiceError> {
        ensure_system_service(self.descriptor)?;
        self.descriptor.validate_name()?;
        Ok(self.layout.script_path(&self.descriptor.name))
    }

    /// Renders the script that [`Installer::install`] would write.
    pub fn render(&self, is_busybox: bool) -> Result<String, ServiceError> {
        let path = self.descriptor.exec_path()?;
        let vars = ScriptVars::new(self.descriptor, path, is_busybox, self.layout);
        renderer_for(&self.descriptor.options).render(&vars)
    }

    /// Installs the script, probing the host for BusyBox.
    pub fn install(&self) -> Result<LinkReport, ServiceError> {
        ensure_system_service(self.descriptor)?;
        self.install_with(detect::is_running_busybox())
    }

    /// Installs the script with a known BusyBox probe result.
    ///
    /// The script write is fail-fast and never overwrites. Link reconciliation
    /// afterwards is best-effort.
    pub fn install_with(&self, is_busybox: bool) -> Result<LinkReport, ServiceError> {
        let script_path = self.script_path()?;
        if fs::symlink_metadata(&script_path).is_ok() {
            return Err(ServiceError::AlreadyInstalled(script_path));
        }

        let script = self.render(is_busybox)?;
        write_script(&script_path, &script)?;
        info!(
            "Installed init script for '{}' at {}",
            self.descriptor.name,
            script_path.display()
        );

        let enabled = self.descriptor.options.bool(OPTION_ENABLED, true);
        Ok(self.reconcile_links(enabled))
    }

    /// Removes the script. Autostart links are left in place.
    pub fn uninstall(&self) -> Result<(), ServiceError> {
        let script_path = self.script_path()?;
        fs::remove_file(&script_path).map_err(|err| ServiceError::at(&script_path, err))?;
        info!(
            "Removed init script for '{}' at {}",
            self.descriptor.name,
            script_path.display()
        );
        Ok(())
    }

    /// Brings every autostart link to the desired state.
    ///
    /// Each entry is handled independently: a failure on one runlevel is logged
    /// and recorded in the report while the remaining entries are still
    /// processed. Running it twice yields the same filesystem state.
    pub fn reconcile_links(&self, enabled: bool) -> LinkReport {
        let target = self.layout.script_path(&self.descriptor.name);
        let mut report = LinkReport::default();
        let valid_name = self.descriptor.validate_name();

        for link in AutostartLink::all() {
            let link_path = link.path(self.layout, &self.descriptor.name);
            let outcome = if let Err(err) = &valid_name {
                Err(io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
            } else if enabled {
                ensure_link(&link_path, &target)
            } else {
                ensure_absent(&link_path)
            };

            match outcome {
                Ok(LinkChange::Created) => report.created.push(link_path),
                Ok(LinkChange::Removed) => report.removed.push(link_path),
                Ok(LinkChange::Unchanged) => report.unchanged.push(link_path),
                Err(err) => {
                    warn!(
                        "Failed to reconcile autostart link {}: {}",
                        link_path.display(),
                        err
                    );
                    report.failed.push((link_path, err));
                }
            }
        }

        debug!(
            "Autostart links for '{}' (enabled={enabled}): {} created, {} removed, {} unchanged, {} failed",
            self.descriptor.name,
            report.created.len(),
            report.removed.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        report
    }
}

enum LinkChange {
    Created,
    Removed,
    Unchanged,
}

fn ensure_link(link_path: &Path, target: &Path) -> io::Result<LinkChange> {
    match fs::read_link(link_path) {
        Ok(existing) if existing == target => return Ok(LinkChange::Unchanged),
        Ok(existing) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("link points at {}", existing.display()),
            ));
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    symlink(target, link_path)?;
    Ok(LinkChange::Created)
}

fn ensure_absent(link_path: &Path) -> io::Result<LinkChange> {
    match fs::remove_file(link_path) {
        Ok(()) => Ok(LinkChange::Removed),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(LinkChange::Unchanged),
        Err(err) => Err(err),
    }
}

/// Creates the script file (never replacing an existing one) with mode 0755.
fn write_script(path: &Path, script: &str) -> Result<(), ServiceError> {
    create_script_with(path, |file| {
        file.write_all(script.as_bytes())?;
        fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_MODE))
    })
}

/// Creates `path` exclusively and hands it to `fill`. A failed fill removes
/// the partial file so a later install is not blocked by it.
fn create_script_with<F>(path: &Path, fill: F) -> Result<(), ServiceError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(SCRIPT_MODE)
        .open(path)
        .map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => ServiceError::AlreadyInstalled(path.to_path_buf()),
            _ => ServiceError::at(path, err),
        })?;

    if let Err(err) = fill(&mut file) {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(
                "Failed to remove partial init script {}: {}",
                path.display(),
                cleanup
            );
        }
        return Err(ServiceError::at(path, err));
    }
    Ok(())
}
