//! Service descriptor, option set, and loading of service definition files.
use regex::Regex;
use serde::Deserialize;
use std::{
    collections::HashMap,
    env, fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    constants::{DEFAULT_LOG_DIRECTORY, OPTION_LOG_DIRECTORY, OPTION_SYSV_SCRIPT},
    error::ServiceError,
};

/// Blocking function supplied through the `RunWait` option.
pub type RunWaitFn = Arc<dyn Fn() + Send + Sync>;

/// A dynamically typed option value.
#[derive(Clone)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    String(String),
    Func(RunWaitFn),
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            OptionValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
            OptionValue::String(value) => f.debug_tuple("String").field(value).finish(),
            OptionValue::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

/// Scalar option values accepted in service definition files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOption {
    Bool(bool),
    Int(i64),
    String(String),
}

impl From<RawOption> for OptionValue {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Bool(value) => OptionValue::Bool(value),
            RawOption::Int(value) => OptionValue::Int(value),
            RawOption::String(value) => OptionValue::String(value),
        }
    }
}

/// Key/value options. Every accessor takes the default used when the key is
/// missing or holds a value of another type.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    values: HashMap<String, OptionValue>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Stores a blocking function under `key`.
    pub fn insert_func(&mut self, key: &str, func: impl Fn() + Send + Sync + 'static) {
        self.values
            .insert(key.to_string(), OptionValue::Func(Arc::new(func)));
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(OptionValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(OptionValue::Int(value)) => *value,
            _ => default,
        }
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(OptionValue::String(value)) => value.clone(),
            _ => default.to_string(),
        }
    }

    pub fn func(&self, key: &str) -> Option<RunWaitFn> {
        match self.values.get(key) {
            Some(OptionValue::Func(func)) => Some(Arc::clone(func)),
            _ => None,
        }
    }
}

/// Describes the single process managed as a System V service.
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    /// Unique service name; every installed path is derived from it.
    pub name: String,
    /// Human readable name, falls back to `name`.
    pub display_name: Option<String>,
    pub description: String,
    /// Executable to run. `None` means the current executable.
    pub executable: Option<PathBuf>,
    /// Arguments passed to the executable, in order.
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub options: OptionSet,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks that the name is usable as a file name under `init.d` and `rcN.d`.
    pub fn validate_name(&self) -> Result<(), ServiceError> {
        let name = self.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(ServiceError::InvalidName(self.name.clone()));
        }
        Ok(())
    }

    /// Display name, or the service name when none is set.
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() => display,
            _ => &self.name,
        }
    }

    /// Effective log directory for the generated script.
    pub fn log_directory(&self) -> String {
        self.options
            .string(OPTION_LOG_DIRECTORY, DEFAULT_LOG_DIRECTORY)
    }

    /// Resolves the executable to an absolute path.
    pub fn exec_path(&self) -> Result<PathBuf, ServiceError> {
        let path = match &self.executable {
            Some(path) => path.clone(),
            None => return Ok(env::current_exe()?),
        };

        if path.is_absolute() {
            return Ok(path);
        }

        let resolved = env::current_dir()?.join(&path);
        Ok(resolved.canonicalize().unwrap_or(resolved))
    }
}

/// On-disk representation of a service definition.
#[derive(Debug, Deserialize)]
struct ServiceFile {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    executable: Option<PathBuf>,
    #[serde(default)]
    arguments: Vec<String>,
    working_directory: Option<PathBuf>,
    /// File whose contents replace the built-in init script.
    sysv_script_file: Option<PathBuf>,
    #[serde(default)]
    options: HashMap<String, RawOption>,
}

/// Expands `${VAR}` references. `$${` yields a literal `${` so custom scripts
/// can keep their own parameter expansions.
fn expand_env_vars(input: &str) -> Result<String, ServiceError> {
    let re = Regex::new(r"\$\$\{|\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|err| ServiceError::Template(err.to_string()))?;

    let mut missing = None;
    let result = re.replace_all(input, |caps: &regex::Captures| match caps.get(1) {
        None => "${".to_string(),
        Some(var) => env::var(var.as_str()).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| var.as_str().to_string());
            String::new()
        }),
    });

    match missing {
        Some(var) => Err(ServiceError::MissingEnvVar(var)),
        None => Ok(result.into_owned()),
    }
}

/// Resolves `path` against `base` unless it is already absolute.
fn resolve_relative(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Loads a YAML service definition, expanding environment variables.
pub fn load_config(config_path: &Path) -> Result<ServiceDescriptor, ServiceError> {
    let content = fs::read_to_string(config_path).map_err(|e| {
        ServiceError::ConfigRead(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, config_path.display()),
        ))
    })?;

    let expanded = expand_env_vars(&content)?;
    let file: ServiceFile = serde_yaml::from_str(&expanded)?;

    let base_path = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let mut options = OptionSet::new();
    for (key, value) in file.options {
        options.insert(&key, value);
    }

    if let Some(script_file) = &file.sysv_script_file {
        let script_path = resolve_relative(script_file, &base_path);
        let script = fs::read_to_string(&script_path)
            .map_err(|err| ServiceError::at(&script_path, err))?;
        options.insert(OPTION_SYSV_SCRIPT, script);
    }

    let descriptor = ServiceDescriptor {
        name: file.name,
        display_name: file.display_name,
        description: file.description,
        executable: file
            .executable
            .map(|path| resolve_relative(&path, &base_path)),
        arguments: file.arguments,
        working_directory: file.working_directory,
        options,
    };
    descriptor.validate_name()?;
    Ok(descriptor)
}
