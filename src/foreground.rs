//! In-process run loop for a workload attached to a terminal or session.
use std::sync::{Once, mpsc};

use tracing::{debug, info};

use crate::{
    config::{OptionSet, RunWaitFn},
    constants::{OPTION_RUN_WAIT, SIGNAL_QUEUE_CAPACITY},
    error::{ServiceError, WorkloadError},
    service::SysvService,
};

/// The managed workload: started before the wait, stopped after it.
pub trait Workload {
    fn start(&mut self, service: &SysvService) -> Result<(), WorkloadError>;
    fn stop(&mut self, service: &SysvService) -> Result<(), WorkloadError>;
}

/// Blocks until the run should end.
pub trait RunWait: Send + Sync {
    fn wait(&self) -> Result<(), ServiceError>;
}

/// Waits for SIGINT or SIGTERM.
///
/// Installs a process-wide handler, so it can only be used once per process.
#[derive(Debug, Default)]
pub struct SignalWait;

impl SignalWait {
    /// Installs the handler and returns the channel it feeds.
    fn subscribe() -> Result<mpsc::Receiver<()>, ServiceError> {
        let (tx, rx) = mpsc::sync_channel(SIGNAL_QUEUE_CAPACITY);
        ctrlc::set_handler(move || {
            let _ = tx.try_send(());
        })?;
        Ok(rx)
    }
}

impl RunWait for SignalWait {
    fn wait(&self) -> Result<(), ServiceError> {
        let rx = Self::subscribe()?;

        debug!("Waiting for termination signal");
        let _ = rx.recv();
        info!("Termination signal received");
        Ok(())
    }
}

/// Waits by calling a caller supplied function.
pub struct CallbackWait(RunWaitFn);

impl CallbackWait {
    pub fn new(func: RunWaitFn) -> Self {
        Self(func)
    }
}

impl RunWait for CallbackWait {
    fn wait(&self) -> Result<(), ServiceError> {
        (self.0)();
        Ok(())
    }
}

/// Runs the inner wait at most once; later calls return immediately.
pub struct WaitOnce {
    inner: Box<dyn RunWait>,
    once: Once,
}

impl WaitOnce {
    pub fn new(inner: impl RunWait + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            once: Once::new(),
        }
    }

    /// Uses the `RunWait` option when present, signals otherwise.
    pub fn from_options(options: &OptionSet) -> Self {
        match options.func(OPTION_RUN_WAIT) {
            Some(func) => Self::new(CallbackWait::new(func)),
            None => Self::new(SignalWait),
        }
    }

    pub fn wait(&self) -> Result<(), ServiceError> {
        let mut result = Ok(());
        self.once.call_once(|| result = self.inner.wait());
        result
    }
}

/// Starts `workload`, blocks on `wait`, then stops it and returns the stop result.
///
/// A failed start returns immediately without waiting or stopping.
pub fn run(
    service: &SysvService,
    workload: &mut dyn Workload,
    wait: &WaitOnce,
) -> Result<(), ServiceError> {
    workload.start(service).map_err(ServiceError::Workload)?;
    info!("Service '{}' running in foreground", service.display());

    let waited = wait.wait();

    info!("Stopping service '{}'", service.display());
    let stopped = workload.stop(service).map_err(ServiceError::Workload);
    waited?;
    stopped
}
