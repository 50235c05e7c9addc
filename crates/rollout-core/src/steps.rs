//! External process steps: lint, test, deploy and host queries all run
//! through a [`StepRunner`].

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use tracing::debug;

/// Default lint command: syntax errors and undefined names only.
pub const DEFAULT_LINT: [&str; 6] = [
    "flake8",
    ".",
    "--count",
    "--select=E9,F63,F7,F82",
    "--show-source",
    "--statistics",
];

pub const DEFAULT_TEST: [&str; 1] = ["pytest"];

/// A process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl StepCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Build from an argv array; the first element is the program.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> anyhow::Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("Command must not be empty"))?;
        Ok(Self::new(program.as_ref()).args(args.iter().map(|a| a.as_ref().to_string())))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-like rendering for logs and reports.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{part}'")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StepOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Last non-empty line of stderr, else stdout; used as a failure summary.
    pub fn summary(&self) -> String {
        let last_line = |text: &str| {
            text.lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
        };
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        match last_line(&self.stderr).or_else(|| last_line(&self.stdout)) {
            Some(line) => format!("{status}: {line}"),
            None => status,
        }
    }
}

/// Runs external commands. Failing to spawn is an `Err`; a non-zero exit
/// is an `Ok` with `success == false`.
pub trait StepRunner {
    fn run(&self, command: &StepCommand) -> anyhow::Result<StepOutput>;
}

/// Runs commands as child processes in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl StepRunner for ProcessRunner {
    fn run(&self, command: &StepCommand) -> anyhow::Result<StepOutput> {
        debug!(command = %command.display(), dir = %self.working_dir.display(), "running step");

        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.working_dir)
            .output()
            .with_context(|| format!("Failed to start '{}'", command.program))?;

        Ok(StepOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
