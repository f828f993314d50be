//! Idempotent install orchestration: detect, select, install, verify.
//!
//! The [`Installer`] never mutates the system for a capability whose
//! detection succeeds. Otherwise it walks the platform's ordered strategy
//! list, verifying after every claimed success, and reports the first
//! verified strategy (or the last failure).
pub mod download;
pub mod lifecycle;
pub mod locate;
mod strategy;
pub mod version;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use crate::config::{Capability, Strategy};
use crate::error::InstallError;
use crate::exec::{Elevation, ExecResult, Executor};
use crate::logging::Log;
use crate::platform::Platform;
use crate::resources::helpers::fs::expand_home;

use download::{Downloader, HttpClient, RETRY_DELAY};
use version::Version;

/// Final result of provisioning one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    /// Detection succeeded; nothing was run.
    AlreadyPresent,
    /// The primary strategy installed and verified.
    Installed,
    /// A later strategy in the chain installed and verified.
    InstalledWithFallback,
    /// Every strategy failed (or none exists); carries the last error.
    Failed(InstallError),
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPresent => f.write_str("already present"),
            Self::Installed => f.write_str("installed"),
            Self::InstalledWithFallback => f.write_str("installed with fallback"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// One strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Strategy description.
    pub strategy: String,
    /// Captured error, `None` when the attempt verified.
    pub error: Option<InstallError>,
}

/// Result plus the attempt trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Final result.
    pub result: InstallResult,
    /// Attempts in execution order.
    pub attempts: Vec<Attempt>,
    /// Version observed by detection or verification.
    pub version: Option<Version>,
}

impl InstallOutcome {
    fn finished(result: InstallResult, attempts: Vec<Attempt>, version: Option<Version>) -> Self {
        Self {
            result,
            attempts,
            version,
        }
    }
}

/// What detection found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Detection succeeded (version when one could be parsed).
    Present(Option<Version>),
    /// Installed but older than the declared minimum.
    Outdated {
        /// Version found.
        found: Version,
        /// Declared minimum.
        minimum: Version,
    },
    /// Detection command failed or could not be spawned.
    Absent,
}

impl Detection {
    /// Whether the capability needs no install.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Per-run state shared by every [`Installer`] call.
#[derive(Debug)]
pub struct InstallSession {
    elevation: OnceLock<Elevation>,
    apt_refreshed: AtomicBool,
    tags: Mutex<HashMap<String, String>>,
    retry_delay: Duration,
}

impl Default for InstallSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallSession {
    /// Fresh session; elevation is probed on first use.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elevation: OnceLock::new(),
            apt_refreshed: AtomicBool::new(false),
            tags: Mutex::new(HashMap::new()),
            retry_delay: RETRY_DELAY,
        }
    }

    /// Use a fixed elevation instead of probing the host.
    #[must_use]
    pub fn with_elevation(self, elevation: Elevation) -> Self {
        let _ = self.elevation.set(elevation);
        self
    }

    /// Override the delay between download attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Elevation for privileged commands, probed once per run.
    pub fn elevation(&self, executor: &dyn Executor, platform: &Platform) -> Elevation {
        *self
            .elevation
            .get_or_init(|| Elevation::detect(executor, !platform.is_windows()))
    }

    /// Whether this call is the first to claim the apt index refresh.
    fn claim_apt_refresh(&self) -> bool {
        !self.apt_refreshed.swap(true, Ordering::SeqCst)
    }

    fn cached_tag(&self, repo: &str) -> Option<String> {
        self.tags.lock().ok().and_then(|t| t.get(repo).cloned())
    }

    fn remember_tag(&self, repo: &str, tag: &str) {
        if let Ok(mut tags) = self.tags.lock() {
            tags.insert(repo.to_string(), tag.to_string());
        }
    }
}

/// Substrings that identify a privilege problem in command output.
const PRIVILEGE_MARKERS: &[&str] = &[
    "permission denied",
    "are you root",
    "not in the sudoers",
    "a terminal is required",
    "a password is required",
    "access is denied",
    "requires elevation",
];

/// Substrings that identify a network problem in command output.
const NETWORK_MARKERS: &[&str] = &[
    "could not resolve",
    "temporary failure in name resolution",
    "failed to connect",
    "connection timed out",
    "network is unreachable",
    "failed to fetch",
    "could not connect",
];

/// Lines of output kept in an error record.
const OUTPUT_TAIL_LINES: usize = 5;

/// Classify a failed command into an [`InstallError`].
#[must_use]
pub fn classify(strategy: &str, result: &ExecResult) -> InstallError {
    let source = if result.stderr.trim().is_empty() {
        &result.stdout
    } else {
        &result.stderr
    };
    let lines: Vec<&str> = source.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = lines
        .iter()
        .skip(lines.len().saturating_sub(OUTPUT_TAIL_LINES))
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n");
    let lower = source.to_lowercase();

    if PRIVILEGE_MARKERS.iter().any(|m| lower.contains(m)) {
        InstallError::PrivilegeDenied {
            strategy: strategy.to_string(),
            detail: tail,
        }
    } else if NETWORK_MARKERS.iter().any(|m| lower.contains(m)) {
        InstallError::NetworkFailure {
            target: strategy.to_string(),
            detail: tail,
        }
    } else {
        InstallError::InstallFailed {
            strategy: strategy.to_string(),
            code: result.code,
            stderr: tail,
        }
    }
}

/// Drives detection and installation of capabilities on one platform.
pub struct Installer<'a> {
    executor: &'a dyn Executor,
    http: &'a dyn HttpClient,
    platform: &'a Platform,
    log: &'a dyn Log,
    home: &'a Path,
    session: &'a InstallSession,
}

impl fmt::Debug for Installer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("platform", &self.platform)
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

impl<'a> Installer<'a> {
    /// Create an installer.
    #[must_use]
    pub const fn new(
        executor: &'a dyn Executor,
        http: &'a dyn HttpClient,
        platform: &'a Platform,
        log: &'a dyn Log,
        home: &'a Path,
        session: &'a InstallSession,
    ) -> Self {
        Self {
            executor,
            http,
            platform,
            log,
            home,
            session,
        }
    }

    /// Detect `cap`, then install it if needed.
    #[must_use]
    pub fn ensure(&self, cap: &Capability) -> InstallOutcome {
        match self.detect(cap) {
            Detection::Present(version) => {
                InstallOutcome::finished(InstallResult::AlreadyPresent, vec![], version)
            }
            Detection::Outdated { found, minimum } => {
                self.log
                    .info(&format!("{}: {found} is older than {minimum}", cap.name));
                self.install(cap)
            }
            Detection::Absent => self.install(cap),
        }
    }

    /// Run the detection command (and known install locations).
    ///
    /// When a minimum version is declared but no version can be read from
    /// the output, the tool is reported present and a warning is logged.
    #[must_use]
    pub fn detect(&self, cap: &Capability) -> Detection {
        let Ok(output) = self.probe(cap, &cap.detect) else {
            return Detection::Absent;
        };
        let found = Version::extract(&output);
        let Some(minimum) = cap.min_version.as_deref().and_then(Version::parse) else {
            return Detection::Present(found);
        };
        match found {
            Some(found) if found < minimum => Detection::Outdated { found, minimum },
            Some(found) => Detection::Present(Some(found)),
            None => {
                let unclear = InstallError::DetectionAmbiguous {
                    capability: cap.name.clone(),
                    detail: format!("no version in output, minimum is {minimum}"),
                };
                self.log.warn(&format!("{unclear}; treating as present"));
                Detection::Present(None)
            }
        }
    }

    /// Strategies for this platform.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsupportedPlatform`] naming the platform when
    /// the capability declares none.
    pub fn select<'c>(&self, cap: &'c Capability) -> Result<&'c [Strategy], InstallError> {
        let strategies = cap.strategies_for(&self.platform.family);
        if strategies.is_empty() {
            return Err(InstallError::UnsupportedPlatform {
                capability: cap.name.clone(),
                platform: self.platform.family.to_string(),
            });
        }
        Ok(strategies)
    }

    /// Descriptions of the strategy chain, for dry runs.
    ///
    /// # Errors
    ///
    /// See [`Installer::select`].
    pub fn plan(&self, cap: &Capability) -> Result<Vec<String>, InstallError> {
        Ok(self.select(cap)?.iter().map(ToString::to_string).collect())
    }

    /// Walk the strategy chain until one installs and verifies.
    #[must_use]
    pub fn install(&self, cap: &Capability) -> InstallOutcome {
        let strategies = match self.select(cap) {
            Ok(s) => s,
            Err(e) => return InstallOutcome::finished(InstallResult::Failed(e), vec![], None),
        };

        let mut attempts = Vec::with_capacity(strategies.len());
        for (index, strat) in strategies.iter().enumerate() {
            let label = strat.to_string();
            self.log.debug(&format!("{}: trying {label}", cap.name));

            let error = match strategy::run(self, cap, strat) {
                Ok(()) => match self.verify(cap, &label) {
                    Ok(version) => {
                        attempts.push(Attempt {
                            strategy: label,
                            error: None,
                        });
                        let result = if index == 0 {
                            InstallResult::Installed
                        } else {
                            InstallResult::InstalledWithFallback
                        };
                        return InstallOutcome::finished(result, attempts, version);
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            self.log.debug(&format!("{}: {error}", cap.name));
            attempts.push(Attempt {
                strategy: label,
                error: Some(error),
            });
        }

        let last = attempts
            .iter()
            .rev()
            .find_map(|a| a.error.clone())
            .unwrap_or_else(|| InstallError::UnsupportedPlatform {
                capability: cap.name.clone(),
                platform: self.platform.family.to_string(),
            });
        InstallOutcome::finished(InstallResult::Failed(last), attempts, None)
    }

    /// Re-check the capability after `strategy` claimed success.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::VerificationMismatch`] when the verification
    /// command still fails or reports a version below the minimum.
    pub fn verify(&self, cap: &Capability, strategy: &str) -> Result<Option<Version>, InstallError> {
        let mismatch = |detail: String| InstallError::VerificationMismatch {
            capability: cap.name.clone(),
            strategy: strategy.to_string(),
            detail,
        };
        let output = self.probe(cap, cap.verify_command()).map_err(mismatch)?;
        let found = Version::extract(&output);
        if let (Some(found), Some(minimum)) =
            (found, cap.min_version.as_deref().and_then(Version::parse))
            && found < minimum
        {
            return Err(mismatch(format!(
                "installed version {found} is below minimum {minimum}"
            )));
        }
        Ok(found)
    }

    /// Run `argv`, retrying with the program at each known install
    /// location. Returns combined output on success, a description of the
    /// failure otherwise.
    fn probe(&self, cap: &Capability, argv: &[String]) -> Result<String, String> {
        let Some((program, rest)) = argv.split_first() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        let mut last = match self.executor.run_unchecked(program, &args) {
            Ok(r) if r.success => return Ok(format!("{}\n{}", r.stdout, r.stderr)),
            Ok(r) => format!(
                "`{}` exited with {}: {}",
                argv.join(" "),
                r.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                r.stderr.trim()
            ),
            Err(e) => format!("{e:#}"),
        };

        for candidate in self.known_locations(cap, program) {
            let path = candidate.to_string_lossy();
            // Files this installer wrote under home are checked on disk.
            let present = if candidate.starts_with(self.home) {
                candidate.is_file()
            } else {
                self.executor.which(&path)
            };
            if !present {
                continue;
            }
            match self.executor.run_unchecked(&path, &args) {
                Ok(r) if r.success => return Ok(format!("{}\n{}", r.stdout, r.stderr)),
                Ok(r) => last = format!("{path} exited with {:?}", r.code),
                Err(e) => last = format!("{e:#}"),
            }
        }
        Err(last)
    }

    /// Paths where this installer may have put `program` even though it is
    /// not on `PATH`.
    fn known_locations(&self, cap: &Capability, program: &str) -> Vec<PathBuf> {
        if program.contains('/') || program.contains('\\') {
            return vec![];
        }
        let mut out: Vec<PathBuf> = cap
            .strategies_for(&self.platform.family)
            .iter()
            .filter_map(|s| match s {
                Strategy::Download(d) => Some(expand_home(&d.dest, self.home)),
                Strategy::Archive(a) => a
                    .member
                    .as_ref()
                    .map(|m| expand_home(&a.dest, self.home).join(m)),
                _ => None,
            })
            .filter(|p| p.file_name().is_some_and(|n| n == program))
            .collect();
        for dir in locate::bin_dirs(self.platform, self.home) {
            let candidate = dir.join(program);
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    /// `program` resolved through `PATH` and the standard install
    /// directories; the bare name when neither has it.
    pub(crate) fn program(&self, program: &str) -> String {
        locate::locate(self.executor, self.platform, self.home, program)
            .unwrap_or_else(|| program.to_string())
    }

    /// Privileged-command elevation for this run.
    fn elevation(&self) -> Elevation {
        self.session.elevation(self.executor, self.platform)
    }

    fn downloader(&self) -> Downloader<'_> {
        Downloader::new(self.http, self.log, self.session.retry_delay)
    }

    /// `{version}` value for a release download, cached per repository.
    fn release_tag(&self, repo: Option<&str>) -> Result<Option<String>, InstallError> {
        let Some(repo) = repo else {
            return Ok(None);
        };
        if let Some(tag) = self.session.cached_tag(repo) {
            return Ok(Some(tag));
        }
        let tag = self.downloader().latest_tag(repo)?;
        self.log.debug(&format!("latest release of {repo}: {tag}"));
        self.session.remember_tag(repo, &tag);
        Ok(Some(tag))
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::Catalog;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::logging::Logger;
    use crate::platform::{Arch, Family};
    use download::MockHttpClient;

    fn catalog(src: &str) -> Catalog {
        Catalog::parse(src, "test").unwrap()
    }

    const GIT: &str = r#"
        [[capability]]
        name = "git"
        required = true
        detect = ["git", "--version"]
        min_version = "2.20"
        [capability.install]
        linux-debian = [{ apt = "git" }]
        linux-rhel = [{ dnf = "git" }, { yum = "git" }]
    "#;

    struct Fixture {
        exec: ScriptedExecutor,
        http: MockHttpClient,
        platform: Platform,
        log: Logger,
        home: tempfile::TempDir,
        session: InstallSession,
    }

    impl Fixture {
        fn new(family: Family, exec: ScriptedExecutor) -> Self {
            Self {
                exec,
                http: MockHttpClient::new(),
                platform: Platform::new(family, Arch::X86_64),
                log: Logger::new("test-installer"),
                home: tempfile::tempdir().unwrap(),
                session: InstallSession::new()
                    .with_elevation(Elevation::Sudo)
                    .with_retry_delay(Duration::ZERO),
            }
        }

        fn installer(&self) -> Installer<'_> {
            Installer::new(
                &self.exec,
                &self.http,
                &self.platform,
                &self.log,
                self.home.path(),
                &self.session,
            )
        }
    }

    #[test]
    fn present_tool_is_not_touched() {
        let c = catalog(GIT);
        let f = Fixture::new(
            Family::LinuxDebian,
            ScriptedExecutor::new().on("git --version", Reply::ok("git version 2.43.0")),
        );
        let outcome = f.installer().ensure(c.get("git").unwrap());
        assert_eq!(outcome.result, InstallResult::AlreadyPresent);
        assert_eq!(outcome.version.unwrap().to_string(), "2.43.0");
        assert_eq!(f.exec.calls(), ["git --version"]);
    }

    #[test]
    fn missing_tool_installs_then_verifies() {
        let c = catalog(GIT);
        let exec = ScriptedExecutor::new()
            .on("git --version", Reply::fail(127, "git: not found"))
            .on("git --version", Reply::ok("git version 2.39.2"))
            .on("sudo DEBIAN_FRONTEND=noninteractive apt-get update", Reply::ok(""))
            .on("sudo DEBIAN_FRONTEND=noninteractive apt-get install", Reply::ok(""));
        let f = Fixture::new(Family::LinuxDebian, exec);
        let outcome = f.installer().ensure(c.get("git").unwrap());
        assert_eq!(outcome.result, InstallResult::Installed);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(
            f.exec
                .count("sudo DEBIAN_FRONTEND=noninteractive apt-get install -y git"),
            1
        );
    }

    #[test]
    fn outdated_tool_is_reinstalled() {
        let c = catalog(GIT);
        let exec = ScriptedExecutor::new()
            .on("git --version", Reply::ok("git version 2.17.1"))
            .on("git --version", Reply::ok("git version 2.43.0"))
            .on("sudo dnf install -y git", Reply::ok(""));
        let f = Fixture::new(Family::LinuxRhel, exec);
        let installer = f.installer();
        let git = c.get("git").unwrap();
        assert!(matches!(installer.detect(git), Detection::Outdated { .. }));
        let outcome = installer.install(git);
        assert_eq!(outcome.result, InstallResult::Installed);
    }

    #[test]
    fn unparseable_version_with_minimum_counts_as_present() {
        let c = catalog(GIT);
        let f = Fixture::new(
            Family::LinuxDebian,
            ScriptedExecutor::new().on("git --version", Reply::ok("git (custom build)")),
        );
        assert_eq!(
            f.installer().detect(c.get("git").unwrap()),
            Detection::Present(None)
        );
    }

    #[test]
    fn fallback_strategy_is_reported() {
        let c = catalog(GIT);
        let exec = ScriptedExecutor::new()
            .on("git --version", Reply::fail(127, ""))
            .on("git --version", Reply::ok("git version 2.31.1"))
            .on(
                "sudo dnf install -y git",
                Reply::fail(1, "Error: Failed to download metadata for repo"),
            )
            .on("sudo yum install -y git", Reply::ok(""));
        let f = Fixture::new(Family::LinuxRhel, exec);
        let outcome = f.installer().install(c.get("git").unwrap());
        assert_eq!(outcome.result, InstallResult::InstalledWithFallback);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(matches!(
            outcome.attempts[0].error,
            Some(InstallError::InstallFailed { code: Some(1), .. })
        ));
        assert!(outcome.attempts[1].error.is_none());
    }

    #[test]
    fn claimed_success_without_verification_moves_on() {
        let c = catalog(GIT);
        let exec = ScriptedExecutor::new()
            .on("git --version", Reply::fail(127, "git: not found"))
            .on("sudo dnf install -y git", Reply::ok(""))
            .on("sudo yum install -y git", Reply::ok(""));
        let f = Fixture::new(Family::LinuxRhel, exec);
        let outcome = f.installer().install(c.get("git").unwrap());
        let InstallResult::Failed(err) = &outcome.result else {
            panic!("expected failure, got {}", outcome.result)
        };
        assert!(matches!(err, InstallError::VerificationMismatch { .. }));
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[test]
    fn no_strategy_names_platform() {
        let c = catalog(
            r#"
            [[capability]]
            name = "curl"
            required = true
            detect = ["curl", "--version"]
            [capability.install]
            linux-debian = [{ apt = "curl" }]
            "#,
        );
        let f = Fixture::new(
            Family::Unsupported("arch".to_string()),
            ScriptedExecutor::new(),
        );
        let outcome = f.installer().ensure(c.get("curl").unwrap());
        assert_eq!(
            outcome.result,
            InstallResult::Failed(InstallError::UnsupportedPlatform {
                capability: "curl".to_string(),
                platform: "arch".to_string(),
            })
        );
        assert!(outcome.result.to_string().contains("arch"));
    }

    #[test]
    fn sudo_unavailable_is_privilege_denied_without_running() {
        let c = catalog(GIT);
        let exec = ScriptedExecutor::new().on("git --version", Reply::fail(127, ""));
        let mut f = Fixture::new(Family::LinuxDebian, exec);
        f.session = InstallSession::new().with_elevation(Elevation::Unavailable);
        let outcome = f.installer().install(c.get("git").unwrap());
        assert!(matches!(
            outcome.result,
            InstallResult::Failed(InstallError::PrivilegeDenied { .. })
        ));
        assert_eq!(f.exec.count("apt-get"), 0);
        assert_eq!(f.exec.count("sudo"), 0);
    }

    #[test]
    fn classify_recognises_markers() {
        let result = |stderr: &str| ExecResult {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            code: Some(1),
        };
        assert!(matches!(
            classify("apt", &result("sudo: a terminal is required to read the password")),
            InstallError::PrivilegeDenied { .. }
        ));
        assert!(matches!(
            classify("apt", &result("Temporary failure in name resolution")),
            InstallError::NetworkFailure { .. }
        ));
        assert!(matches!(
            classify("apt", &result("E: Unable to locate package nope")),
            InstallError::InstallFailed { code: Some(1), .. }
        ));
    }

    #[test]
    fn classify_keeps_output_tail() {
        let r = ExecResult {
            stdout: (1..=8).map(|n| format!("line {n}\n")).collect(),
            stderr: String::new(),
            success: false,
            code: Some(2),
        };
        let InstallError::InstallFailed { stderr, .. } = classify("brew", &r) else {
            panic!("expected InstallFailed")
        };
        assert!(stderr.starts_with("line 4"));
        assert!(stderr.ends_with("line 8"));
    }

    #[test]
    fn plan_lists_chain_in_order() {
        let c = catalog(GIT);
        let f = Fixture::new(Family::LinuxRhel, ScriptedExecutor::new());
        assert_eq!(
            f.installer().plan(c.get("git").unwrap()).unwrap(),
            ["dnf install git", "yum install git"]
        );
    }

    #[test]
    fn detection_finds_binary_in_local_bin() {
        let c = catalog(
            r#"
            [[capability]]
            name = "minikube"
            detect = ["minikube", "version"]
            [capability.install]
            linux-debian = [{ download = { url = "https://x/minikube-{os}-{arch}", dest = "~/.local/bin/minikube" } }]
            "#,
        );
        let f = Fixture::new(Family::LinuxDebian, ScriptedExecutor::new());
        let bin = f.home.path().join(".local/bin/minikube");
        std::fs::create_dir_all(bin.parent().unwrap()).unwrap();
        std::fs::write(&bin, "").unwrap();
        let exec = ScriptedExecutor::new().on(
            &bin.to_string_lossy(),
            Reply::ok("minikube version: v1.32.0"),
        );
        let f = Fixture { exec, ..f };
        assert_eq!(
            f.installer().detect(c.get("minikube").unwrap()),
            Detection::Present(Some(Version::parse("1.32.0").unwrap()))
        );
    }

    const HOMEBREW: &str = r#"
        [[capability]]
        name = "homebrew"
        required = true
        detect = ["brew", "--version"]
        [capability.install]
        macos = [{ script = { url = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh", shell = "bash" } }]
    "#;

    #[test]
    fn apple_silicon_homebrew_is_found_off_path() {
        let c = catalog(HOMEBREW);
        let f = Fixture::new(
            Family::Macos,
            ScriptedExecutor::new()
                .with_path(&["/opt/homebrew/bin/brew"])
                .on("/opt/homebrew/bin/brew --version", Reply::ok("Homebrew 4.3.9\n")),
        );
        let cap = c.get("homebrew").unwrap();
        assert_eq!(
            f.installer().detect(cap),
            Detection::Present(Some(Version::parse("4.3.9").unwrap()))
        );
        assert!(f.installer().verify(cap, "bash script").is_ok());
    }

    #[test]
    fn brew_strategies_use_the_resolved_brew() {
        let c = catalog(
            r#"
            [[capability]]
            name = "git"
            detect = ["git", "--version"]
            [capability.install]
            macos = [{ brew = "git" }]
            "#,
        );
        let f = Fixture::new(
            Family::Macos,
            ScriptedExecutor::new()
                .with_path(&["/opt/homebrew/bin/brew"])
                .on("/opt/homebrew/bin/brew install git", Reply::ok(""))
                .on("git --version", Reply::ok("git version 2.45.2")),
        );
        let outcome = f.installer().install(c.get("git").unwrap());
        assert_eq!(outcome.result, InstallResult::Installed);
        assert_eq!(f.exec.count("/opt/homebrew/bin/brew install git"), 1);
        assert_eq!(f.exec.count("brew "), 0);
    }

    #[test]
    fn cask_is_selected_on_macos() {
        let c = catalog(
            r#"
            [[capability]]
            name = "vscode"
            detect = ["code", "--version"]
            [capability.install]
            linux-debian = [{ apt = "code" }]
            macos = [{ brew_cask = "visual-studio-code" }]
            "#,
        );
        let f = Fixture::new(
            Family::Macos,
            ScriptedExecutor::new()
                .with_path(&["brew"])
                .on("brew install --cask visual-studio-code", Reply::ok(""))
                .on("code --version", Reply::ok("1.92.0\n")),
        );
        let cap = c.get("vscode").unwrap();
        assert_eq!(
            f.installer().plan(cap).unwrap(),
            ["brew install --cask visual-studio-code"]
        );
        assert_eq!(f.installer().install(cap).result, InstallResult::Installed);
        assert_eq!(f.exec.count("brew install --cask visual-studio-code"), 1);
    }
}
