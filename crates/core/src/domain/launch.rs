// Launch Configuration Domain Model
// One external process: name, script, positional args and a fixed env block

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::error::{DomainError, Result};

/// Maximum length of a process name
pub const MAX_NAME_LEN: usize = 128;

/// Default restart budget per process
pub const DEFAULT_MAX_RESTARTS: u32 = 10;

/// Default base delay between restarts (1s)
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Interpreter value that forces direct execution of the script
pub const NO_INTERPRETER: &str = "none";

/// Environment block passed to the child, ordered by key
pub type EnvMap = BTreeMap<String, String>;

/// Positional arguments for the script
///
/// Accepts a list of strings, a single whitespace-separated string or a
/// bare number when parsed; always serialized as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LaunchArgs(Vec<String>);

impl LaunchArgs {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for LaunchArgs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ArgsVisitor;

        impl<'de> Visitor<'de> for ArgsVisitor {
            type Value = LaunchArgs;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, a number or a list of strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs::new(v.split_whitespace()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs(vec![v.to_string()]))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs(vec![v.to_string()]))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs(vec![v.to_string()]))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs::default())
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<LaunchArgs, E> {
                Ok(LaunchArgs::default())
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<LaunchArgs, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<LaunchArgs, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut args = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(arg) = seq.next_element::<String>()? {
                    args.push(arg);
                }
                Ok(LaunchArgs(args))
            }
        }

        deserializer.deserialize_any(ArgsVisitor)
    }
}

fn default_autorestart() -> bool {
    true
}

fn default_max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}

fn default_restart_delay_ms() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}

/// Launch Configuration (immutable once loaded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub name: String,
    pub script: String,

    #[serde(default, skip_serializing_if = "LaunchArgs::is_empty")]
    pub args: LaunchArgs,

    #[serde(default)]
    pub env: EnvMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    #[serde(default = "default_autorestart")]
    pub autorestart: bool,

    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    #[serde(default = "default_restart_delay_ms", alias = "restart_delay")]
    pub restart_delay_ms: u64,
}

impl LaunchConfig {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            args: LaunchArgs::default(),
            env: EnvMap::new(),
            cwd: None,
            interpreter: None,
            autorestart: true,
            max_restarts: DEFAULT_MAX_RESTARTS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = LaunchArgs::new(args);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Check name and script shape (env content is checked by the validator)
    pub fn check_shape(&self) -> Result<()> {
        validate_name(&self.name)?;
        ScriptRef::parse(&self.script)?;
        Ok(())
    }

    /// Interpreter that will run the script, if any
    ///
    /// Explicit `interpreter` wins; `"none"` disables detection.
    pub fn resolved_interpreter(&self) -> Result<Option<String>> {
        match self.interpreter.as_deref() {
            Some(NO_INTERPRETER) => Ok(None),
            Some(interpreter) => Ok(Some(interpreter.to_string())),
            None => {
                let script = ScriptRef::parse(&self.script)?;
                Ok(detect_interpreter(script.program()).map(str::to_string))
            }
        }
    }

    /// Resolve program and argv for spawning
    pub fn command_line(&self) -> Result<CommandLine> {
        let script = ScriptRef::parse(&self.script)?;
        let interpreter = self.resolved_interpreter()?;

        let mut args = Vec::new();
        let program = match interpreter {
            Some(interpreter) => {
                args.push(script.program().to_string());
                interpreter
            }
            None => script.program().to_string(),
        };
        args.extend(script.extra_args().iter().cloned());
        args.extend(self.args.as_slice().iter().cloned());

        Ok(CommandLine { program, args })
    }
}

/// Program plus argv, ready for spawning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Validate a process name
///
/// Rules: non-empty, at most 128 chars, first char ASCII alphanumeric,
/// the rest ASCII alphanumeric or one of `- _ . :`.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| DomainError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let first = name.chars().next().ok_or_else(|| invalid("empty"))?;
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("too long (max 128 chars)"));
    }
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with an alphanumeric character"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(invalid("only alphanumeric characters and - _ . : are allowed"));
    }
    Ok(())
}

/// Parsed `script` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    /// A path to an executable or script
    Path(String),
    /// A command line: program followed by extra arguments
    Command { program: String, args: Vec<String> },
}

impl ScriptRef {
    /// Parse and check syntactic well-formedness
    pub fn parse(script: &str) -> Result<Self> {
        let invalid = |reason: &str| DomainError::InvalidScript {
            script: script.to_string(),
            reason: reason.to_string(),
        };

        if script.trim().is_empty() {
            return Err(invalid("empty"));
        }
        if script.trim() != script {
            return Err(invalid("leading or trailing whitespace"));
        }
        if script.chars().any(char::is_control) {
            return Err(invalid("contains control characters"));
        }

        let mut parts = script.split_whitespace();
        let program = parts.next().ok_or_else(|| invalid("empty"))?;
        let args: Vec<String> = parts.map(str::to_string).collect();

        if program == "." || program == ".." {
            return Err(invalid("does not name a file"));
        }
        if program.ends_with('/') {
            return Err(invalid("points at a directory"));
        }
        if program.contains("//") {
            return Err(invalid("empty path segment"));
        }

        if args.is_empty() {
            Ok(ScriptRef::Path(program.to_string()))
        } else {
            Ok(ScriptRef::Command {
                program: program.to_string(),
                args,
            })
        }
    }

    pub fn program(&self) -> &str {
        match self {
            ScriptRef::Path(path) => path,
            ScriptRef::Command { program, .. } => program,
        }
    }

    pub fn extra_args(&self) -> &[String] {
        match self {
            ScriptRef::Path(_) => &[],
            ScriptRef::Command { args, .. } => args,
        }
    }
}

fn detect_interpreter(program: &str) -> Option<&'static str> {
    match Path::new(program).extension().and_then(|e| e.to_str()) {
        Some("py") => Some("python3"),
        Some("js") | Some("mjs") | Some("cjs") => Some("node"),
        Some("sh") => Some("bash"),
        _ => None,
    }
}
