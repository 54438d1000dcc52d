//! External process invocation, behind a trait so backends can be driven by
//! scripted runners in tests.

use std::ffi::{OsStr, OsString};
use std::io;
use std::process::{Command as StdCommand, Output, Stdio};

/// Description of a process to run. Nothing is spawned until a
/// [`CommandRunner`] executes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args:    Vec<OsString>,
    envs:    Vec<(OsString, OsString)>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args:    Vec::new(),
            envs:    Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.envs.push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &str { &self.program }

    pub fn get_args(&self) -> &[OsString] { &self.args }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal.
    pub code:   Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool { self.code == Some(0) }

    pub fn stdout_lossy(&self) -> String { String::from_utf8_lossy(&self.stdout).into_owned() }

    pub fn stderr_lossy(&self) -> String { String::from_utf8_lossy(&self.stderr).into_owned() }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code:   output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr.
    ///
    /// A spawn failure is an `Err`; a non-zero exit is not.
    fn run(&self, command: &Command) -> io::Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &Command) -> io::Result<CommandOutput> {
        StdCommand::new(&command.program)
            .args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()
            .map(CommandOutput::from)
    }
}
