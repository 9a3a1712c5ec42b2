//! Filesystem layout of the System V init contract.
use std::path::{Path, PathBuf};

use crate::constants::{ENV_OVERRIDE_DIR, INIT_DIR, PID_DIR, RC_PARENT_DIR};

/// Where init scripts, runlevel links and runtime files live.
///
/// Production code uses [`Layout::system`], rooted at `/`. Tests root the same
/// structure inside a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::system()
    }
}

impl Layout {
    /// The real system layout.
    pub fn system() -> Self {
        Self::with_root("/")
    }

    /// A layout rooted somewhere other than `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when rooted at `/`, where the host's `service` command applies.
    pub fn is_system(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Directory holding init scripts.
    pub fn init_dir(&self) -> PathBuf {
        self.root.join(INIT_DIR)
    }

    /// Deterministic script path for a service name.
    pub fn script_path(&self, name: &str) -> PathBuf {
        self.init_dir().join(name)
    }

    /// `rc<N>.d` directory for a runlevel.
    pub fn runlevel_dir(&self, runlevel: u8) -> PathBuf {
        self.root
            .join(RC_PARENT_DIR)
            .join(format!("rc{runlevel}.d"))
    }

    /// Directory the script writes its PID file into.
    pub fn pid_dir(&self) -> PathBuf {
        self.root.join(PID_DIR)
    }

    /// Directory searched for environment override files.
    pub fn env_override_dir(&self) -> PathBuf {
        self.root.join(ENV_OVERRIDE_DIR)
    }

    /// Creates every directory of the layout. Only meaningful for non-system roots.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.init_dir())?;
        for runlevel in 0..=6 {
            std::fs::create_dir_all(self.runlevel_dir(runlevel))?;
        }
        std::fs::create_dir_all(self.pid_dir())?;
        std::fs::create_dir_all(self.env_override_dir())?;
        Ok(())
    }
}
