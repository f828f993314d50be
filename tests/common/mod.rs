// Shared helpers for integration tests.
//
// Provides a scripted executor, a stub HTTP client and a context builder
// backed by a temporary home directory, so each integration test can drive
// the installer without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};

use devsetup_cli::exec::{Elevation, ExecResult, Executor};
use devsetup_cli::installer::InstallSession;
use devsetup_cli::installer::download::HttpClient;
use devsetup_cli::logging::{Log, Logger};
use devsetup_cli::platform::Platform;
use devsetup_cli::tasks::Context;

/// Successful result with `stdout`.
pub fn ok(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        success: true,
        code: Some(0),
    }
}

/// Failed result with exit `code` and `stderr`.
pub fn fail(code: i32, stderr: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        success: false,
        code: Some(code),
    }
}

/// Executor that answers by command-line prefix and records every call.
///
/// Replies for a prefix are consumed in order; the last one repeats.
/// Commands with no matching rule fail to spawn.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    rules: Mutex<Vec<(String, VecDeque<ExecResult>)>>,
    calls: Mutex<Vec<String>>,
    on_path: HashSet<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for command lines starting with `prefix`.
    pub fn on(self, prefix: &str, reply: ExecResult) -> Self {
        {
            let mut rules = self.rules.lock().unwrap();
            if let Some((_, queue)) = rules.iter_mut().find(|(p, _)| p == prefix) {
                queue.push_back(reply);
            } else {
                rules.push((prefix.to_string(), VecDeque::from([reply])));
            }
        }
        self
    }

    /// Programs reported by [`Executor::which`].
    pub fn with_path(mut self, programs: &[&str]) -> Self {
        self.on_path.extend(programs.iter().map(|p| (*p).to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn respond(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());
        let mut rules = self.rules.lock().unwrap();
        let queue = rules
            .iter_mut()
            .find(|(p, _)| line.starts_with(p.as_str()))
            .map(|(_, q)| q)
            .ok_or_else(|| anyhow!("{program}: not found"))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.ok_or_else(|| anyhow!("{program}: no reply"))
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.respond(program, args)?;
        if result.success {
            Ok(result)
        } else {
            Err(anyhow!("{program} failed: {}", result.stderr))
        }
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.respond(program, args)
    }

    fn run_unchecked_with_env(
        &self,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        self.respond(program, args)
    }

    fn which(&self, program: &str) -> bool {
        self.on_path.contains(program)
    }
}

/// HTTP client that serves fixed bodies by URL and counts requests.
/// Unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct StubHttp {
    bodies: Vec<(String, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl StubHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.push((url.to_string(), body.to_vec()));
        self
    }

    pub fn requests(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| *u == url)
            .count()
    }
}

impl HttpClient for StubHttp {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| anyhow!("GET {url}: failed to connect"))
    }
}

/// Isolated run environment: temporary home, logger and context.
pub struct TestEnv {
    pub home: tempfile::TempDir,
    pub log: Arc<Logger>,
    pub ctx: Context,
}

impl TestEnv {
    /// Context for `platform` running as root (no sudo prefix), with no
    /// delay between download attempts.
    pub fn new(platform: Platform, executor: Arc<FakeExecutor>, http: Arc<StubHttp>) -> Self {
        let home = tempfile::tempdir().expect("create temp home");
        let log = Arc::new(Logger::new("test"));
        let ctx = Context {
            platform: Arc::new(platform),
            log: Arc::clone(&log) as Arc<dyn Log>,
            dry_run: false,
            home: home.path().to_path_buf(),
            executor,
            http,
            session: Arc::new(
                InstallSession::new()
                    .with_elevation(Elevation::Direct)
                    .with_retry_delay(Duration::ZERO),
            ),
            current_shell: None,
            ci: false,
        };
        Self { home, log, ctx }
    }

    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Read a file below the temporary home.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.home.path().join(relative)).expect("read file under home")
    }
}
