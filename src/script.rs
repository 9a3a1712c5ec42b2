//! Rendering of the init script that supervises the managed process.
//!
//! The script owns the runtime state machine: it tracks the process through a
//! PID file, redirects its output into two log files, and stops it with a
//! bounded grace period. Two renderers share one variable contract
//! ([`ScriptVars`]): the built-in [`SysvTemplate`] and the operator supplied
//! [`CustomScript`].
use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use regex::Regex;

use crate::{
    config::{OptionSet, ServiceDescriptor},
    constants::{OPTION_SYSV_SCRIPT, STOP_POLL_ATTEMPTS},
    error::ServiceError,
    runtime::Layout,
};

/// How the script decides whether the tracked PID is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessCheck {
    /// Reads `/proc/<pid>/stat`; zombies count as dead.
    ProcTable,
    /// Greps the output of the process listing tool. Used on BusyBox hosts.
    ListingTool,
}

impl LivenessCheck {
    /// Picks the check once from the BusyBox probe result.
    pub fn for_host(is_busybox: bool) -> Self {
        if is_busybox {
            LivenessCheck::ListingTool
        } else {
            LivenessCheck::ProcTable
        }
    }

    /// Shell definition of `is_running`.
    pub fn shell_function(&self) -> &'static str {
        match self {
            LivenessCheck::ProcTable => {
                r#"is_running() {
    [ -f "$pid_file" ] || return 1
    stat=$(cat "/proc/$(get_pid)/stat" 2>/dev/null) || return 1
    case "${stat##*")"}" in
        " Z "*) return 1 ;;
    esac
}"#
            }
            LivenessCheck::ListingTool => {
                r#"is_running() {
    [ -f "$pid_file" ] && ps | awk '{print "s" $1 "s"}' | grep "s$(get_pid)s" > /dev/null 2>&1
}"#
            }
        }
    }
}

/// Quotes `value` so a single pass of the POSIX shell yields it unchanged.
pub fn shell_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

/// Collapses newlines so a value can sit inside a `#` comment.
fn comment_safe(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Variables available to every renderer.
#[derive(Debug, Clone)]
pub struct ScriptVars {
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// Absolute path of the executable.
    pub path: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub log_directory: String,
    pub pid_directory: PathBuf,
    pub env_directory: PathBuf,
    pub is_busybox: bool,
    pub liveness: LivenessCheck,
}

impl ScriptVars {
    pub fn new(
        descriptor: &ServiceDescriptor,
        path: PathBuf,
        is_busybox: bool,
        layout: &Layout,
    ) -> Self {
        Self {
            name: descriptor.name.clone(),
            display_name: descriptor.display_name().to_string(),
            description: descriptor.description.clone(),
            path,
            arguments: descriptor.arguments.clone(),
            working_directory: descriptor.working_directory.clone(),
            log_directory: descriptor.log_directory(),
            pid_directory: layout.pid_dir(),
            env_directory: layout.env_override_dir(),
            is_busybox,
            liveness: LivenessCheck::for_host(is_busybox),
        }
    }

    /// Each argument quoted, separated by spaces.
    pub fn quoted_arguments(&self) -> String {
        self.arguments
            .iter()
            .map(|arg| shell_quote(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Quoted executable followed by the quoted arguments.
    pub fn cmd(&self) -> String {
        let mut cmd = quote_path(&self.path);
        if !self.arguments.is_empty() {
            cmd.push(' ');
            cmd.push_str(&self.quoted_arguments());
        }
        cmd
    }
}

/// Produces init script text from [`ScriptVars`].
pub trait ScriptRenderer {
    fn render(&self, vars: &ScriptVars) -> Result<String, ServiceError>;
}

/// Selects the renderer configured by the `SysvScript` option.
pub fn renderer_for(options: &OptionSet) -> Box<dyn ScriptRenderer> {
    let custom = options.string(OPTION_SYSV_SCRIPT, "");
    if custom.is_empty() {
        Box::new(SysvTemplate)
    } else {
        Box::new(CustomScript::new(custom))
    }
}

/// The built-in supervision script.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysvTemplate;

impl ScriptRenderer for SysvTemplate {
    fn render(&self, vars: &ScriptVars) -> Result<String, ServiceError> {
        let description = comment_safe(&vars.description);
        let display_name = comment_safe(&vars.display_name);
        let path = comment_safe(&vars.path.to_string_lossy());
        let log_directory = shell_quote(&vars.log_directory);
        let pid_directory = quote_path(&vars.pid_directory);
        let env_directory = quote_path(&vars.env_directory);
        let change_dir = match &vars.working_directory {
            Some(dir) => format!("cd {} || exit 1", quote_path(dir)),
            None => ":".to_string(),
        };

        let mut script = String::new();
        write!(
            script,
            r#"#!/bin/sh
# For RedHat and cousins:
# chkconfig: - 99 01
# description: {description}
# processname: {path}

### BEGIN INIT INFO
# Provides:          {path}
# Required-Start:
# Required-Stop:
# Default-Start:     2 3 4 5
# Default-Stop:      0 1 6
# Short-Description: {display_name}
# Description:       {description}
### END INIT INFO

name=$(basename "$(readlink -f "$0")")
pid_file={pid_directory}/"$name.pid"
stdout_log={log_directory}/"$name.log"
stderr_log={log_directory}/"$name.err"

[ -e {env_directory}/"$name" ] && . {env_directory}/"$name"

run_cmd() {{
    exec {cmd}
}}

get_pid() {{
    cat "$pid_file"
}}

{is_running}

case "$1" in
    start)
        if is_running; then
            echo "Already started"
        else
            echo "Starting $name"
            {change_dir}
            run_cmd >> "$stdout_log" 2>> "$stderr_log" &
            echo $! > "$pid_file"
            if ! is_running; then
                echo "Unable to start, see $stdout_log and $stderr_log"
                exit 1
            fi
        fi
    ;;
    stop)
        if is_running; then
            printf "Stopping %s.." "$name"
            kill "$(get_pid)"
            i=0
            while [ "$i" -lt {attempts} ]
            do
                if ! is_running; then
                    break
                fi
                printf "."
                sleep 1
                i=$((i + 1))
            done
            echo
            if is_running; then
                echo "Not stopped; may still be shutting down or shutdown may have failed"
                exit 1
            else
                echo "Stopped"
                if [ -f "$pid_file" ]; then
                    rm "$pid_file"
                fi
            fi
        else
            echo "Not running"
        fi
    ;;
    restart)
        "$0" stop
        if is_running; then
            echo "Unable to stop, will not attempt to start"
            exit 1
        fi
        "$0" start
    ;;
    status)
        if is_running; then
            echo "Running"
        else
            echo "Stopped"
            exit 1
        fi
    ;;
    *)
    echo "Usage: $0 {{start|stop|restart|status}}"
    exit 1
    ;;
esac
exit 0
"#,
            cmd = vars.cmd(),
            is_running = vars.liveness.shell_function(),
            attempts = STOP_POLL_ATTEMPTS,
        )
        .map_err(|err| ServiceError::Template(err.to_string()))?;

        Ok(script)
    }
}

/// Operator supplied script text with `{{Key}}` placeholders.
#[derive(Debug, Clone)]
pub struct CustomScript {
    template: String,
}

impl CustomScript {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    fn value(key: &str, vars: &ScriptVars) -> Option<String> {
        let value = match key {
            "Name" => vars.name.clone(),
            "DisplayName" => vars.display_name.clone(),
            "Description" => vars.description.clone(),
            "Path" => vars.path.to_string_lossy().into_owned(),
            "Arguments" => vars.quoted_arguments(),
            "Cmd" => vars.cmd(),
            "WorkingDirectory" => vars
                .working_directory
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "LogDirectory" => vars.log_directory.clone(),
            "PidDirectory" => vars.pid_directory.to_string_lossy().into_owned(),
            "EnvDirectory" => vars.env_directory.to_string_lossy().into_owned(),
            "IsBusyBox" => vars.is_busybox.to_string(),
            "IsRunning" => vars.liveness.shell_function().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

impl ScriptRenderer for CustomScript {
    fn render(&self, vars: &ScriptVars) -> Result<String, ServiceError> {
        let re = Regex::new(r"\{\{\s*([A-Za-z]+)\s*\}\}")
            .map_err(|err| ServiceError::Template(err.to_string()))?;

        let mut unknown = None;
        let rendered = re.replace_all(&self.template, |caps: &regex::Captures| {
            let key = &caps[1];
            Self::value(key, vars).unwrap_or_else(|| {
                unknown.get_or_insert_with(|| key.to_string());
                String::new()
            })
        });

        match unknown {
            Some(key) => Err(ServiceError::Template(format!(
                "unknown placeholder '{{{{{key}}}}}'"
            ))),
            None => Ok(rendered.into_owned()),
        }
    }
}
