//! System V backend for one service descriptor.
use std::{path::PathBuf, thread};

use tracing::info;

use crate::{
    config::ServiceDescriptor,
    constants::{PLATFORM, RESTART_PAUSE},
    dispatch::{CommandRunner, Dispatcher, Operation, SystemRunner},
    error::ServiceError,
    foreground::{self, WaitOnce, Workload},
    install::{Installer, LinkReport},
    runtime::Layout,
    status::{self, Status},
};

/// Installs, controls and runs one service through System V init.
pub struct SysvService<R = SystemRunner> {
    descriptor: ServiceDescriptor,
    layout: Layout,
    dispatcher: Dispatcher<R>,
    /// Shared by every `run` call so the configured wait happens at most once.
    wait: WaitOnce,
}

impl SysvService<SystemRunner> {
    pub fn new(descriptor: ServiceDescriptor, layout: Layout) -> Self {
        Self::with_runner(descriptor, layout, SystemRunner)
    }
}

impl<R: CommandRunner> SysvService<R> {
    /// Builds a service whose control commands go through `runner`.
    pub fn with_runner(descriptor: ServiceDescriptor, layout: Layout, runner: R) -> Self {
        let mut dispatcher = Dispatcher::with_runner(
            descriptor.name.clone(),
            layout.script_path(&descriptor.name),
            runner,
        );
        // The host's `service` command only knows scripts under `/etc/init.d`.
        if !layout.is_system() {
            dispatcher = dispatcher.script_only();
        }
        let wait = WaitOnce::from_options(&descriptor.options);
        Self {
            descriptor,
            layout,
            dispatcher,
            wait,
        }
    }

    /// Overrides the generic control entry point (`service`).
    pub fn with_entry_point(mut self, program: impl Into<PathBuf>) -> Self {
        self.dispatcher = self.dispatcher.entry_point(program);
        self
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    /// Display name, or the service name when none is set.
    pub fn display(&self) -> &str {
        self.descriptor.display_name()
    }

    pub fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn installer(&self) -> Installer<'_> {
        Installer::new(&self.descriptor, &self.layout)
    }

    pub fn install(&self) -> Result<LinkReport, ServiceError> {
        self.installer().install()
    }

    /// Installs with a known BusyBox probe result instead of probing the host.
    pub fn install_with(&self, is_busybox: bool) -> Result<LinkReport, ServiceError> {
        self.installer().install_with(is_busybox)
    }

    pub fn uninstall(&self) -> Result<(), ServiceError> {
        self.installer().uninstall()
    }

    /// Renders the init script without installing it.
    pub fn render(&self, is_busybox: bool) -> Result<String, ServiceError> {
        self.installer().render(is_busybox)
    }

    /// Reconciles the autostart links without touching the script.
    pub fn set_enabled(&self, enabled: bool) -> LinkReport {
        self.installer().reconcile_links(enabled)
    }

    /// An `Err` means [`Status::Unknown`].
    pub fn status(&self) -> Result<Status, ServiceError> {
        status::interpret(self.dispatcher.dispatch(Operation::Status, true))
    }

    pub fn start(&self) -> Result<(), ServiceError> {
        self.control(Operation::Start)
    }

    pub fn stop(&self) -> Result<(), ServiceError> {
        self.control(Operation::Stop)
    }

    /// Stops, then starts. A failed stop is returned and start is not attempted.
    pub fn restart(&self) -> Result<(), ServiceError> {
        self.stop()?;
        thread::sleep(RESTART_PAUSE);
        self.start()
    }

    fn control(&self, operation: Operation) -> Result<(), ServiceError> {
        let result = self.dispatcher.dispatch(operation, false)?;
        if !result.success() {
            return Err(ServiceError::CommandFailed {
                service: self.descriptor.name.clone(),
                operation,
                code: result.code,
            });
        }
        info!("Service '{}': {} succeeded", self.descriptor.name, operation);
        Ok(())
    }
}

impl SysvService<SystemRunner> {
    /// Runs `workload` in the foreground until the configured wait returns.
    ///
    /// The wait is consumed by the first call; later calls start and stop the
    /// workload without blocking.
    pub fn run(&self, workload: &mut dyn Workload) -> Result<(), ServiceError> {
        foreground::run(self, workload, &self.wait)
    }
}
