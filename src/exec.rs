//! External command execution behind an injectable [`Executor`].
use anyhow::{Context, Result, bail};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, when the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over process execution so installers and resources can be
/// exercised in tests without touching the host.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns the result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Like [`run_unchecked`](Self::run_unchecked) with extra environment
    /// variables set for the child.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run_unchecked_with_env(program, args, &[])
    }

    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;

        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// How commands that need root are run on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// Run as-is: already root, or a platform without `sudo` (Windows).
    Direct,
    /// Prefix with `sudo`.
    Sudo,
    /// Not root and no `sudo` on PATH.
    Unavailable,
}

impl Elevation {
    /// Determine elevation. On Unix this asks `id -u` and falls back to
    /// looking for `sudo`.
    #[must_use]
    pub fn detect(executor: &dyn Executor, unix: bool) -> Self {
        if !unix {
            return Self::Direct;
        }
        match executor.run_unchecked("id", &["-u"]) {
            Ok(r) if r.success && r.stdout.trim() == "0" => Self::Direct,
            _ if executor.which("sudo") => Self::Sudo,
            _ => Self::Unavailable,
        }
    }

    /// Program and arguments that run `program args` with privileges, or
    /// `None` when elevation is unavailable.
    #[must_use]
    pub fn wrap<'a>(self, program: &'a str, args: &[&'a str]) -> Option<(&'a str, Vec<&'a str>)> {
        match self {
            Self::Direct => Some((program, args.to_vec())),
            Self::Sudo => Some((
                "sudo",
                std::iter::once(program).chain(args.iter().copied()).collect(),
            )),
            Self::Unavailable => None,
        }
    }
}
