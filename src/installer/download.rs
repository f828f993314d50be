//! HTTP downloads with bounded retry, URL templating and checksum checks.
use std::fmt::Write as _;
use std::fs;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};

use crate::error::InstallError;
use crate::logging::Log;
use crate::platform::Platform;

/// Number of download attempts before giving up.
pub const RETRY_COUNT: u32 = 3;

/// Delay between download attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total per-request timeout.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Minimal HTTP GET abstraction so downloads can be tested offline.
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failures and non-2xx statuses.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production [`HttpClient`] backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Build a client with connect and global timeouts.
    #[must_use]
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(CONNECT_TIMEOUT))
            .timeout_global(Some(TRANSFER_TIMEOUT))
            .user_agent(concat!("devsetup/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("GET {url}"))?;
        let mut body = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut body)
            .with_context(|| format!("reading body of {url}"))?;
        Ok(body)
    }
}

/// Fetches URLs through an [`HttpClient`] with a fixed attempt ceiling.
pub struct Downloader<'a> {
    http: &'a dyn HttpClient,
    log: &'a dyn Log,
    delay: Duration,
}

impl std::fmt::Debug for Downloader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl<'a> Downloader<'a> {
    /// Create a downloader that waits `delay` between attempts.
    #[must_use]
    pub const fn new(http: &'a dyn HttpClient, log: &'a dyn Log, delay: Duration) -> Self {
        Self { http, log, delay }
    }

    /// GET `url`, retrying up to [`RETRY_COUNT`] times.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NetworkFailure`] with the last error once all
    /// attempts fail.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, InstallError> {
        let mut last = String::new();
        for attempt in 1..=RETRY_COUNT {
            if attempt > 1 {
                self.log.debug(&format!(
                    "retry {attempt}/{RETRY_COUNT} for {url} after {}s",
                    self.delay.as_secs()
                ));
                std::thread::sleep(self.delay);
            }
            match self.http.get(url) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last = format!("{e:#}");
                    self.log.debug(&format!("download attempt {attempt} failed: {last}"));
                }
            }
        }
        Err(InstallError::NetworkFailure {
            target: url.to_string(),
            detail: format!("{last} (after {RETRY_COUNT} attempts)"),
        })
    }

    /// Tag name of the latest GitHub release of `repo` (`owner/name`).
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NetworkFailure`] when the API is unreachable
    /// or the response carries no `tag_name`.
    pub fn latest_tag(&self, repo: &str) -> Result<String, InstallError> {
        let url = format!("https://api.github.com/repos/{repo}/releases/latest");
        let body = self.fetch(&url)?;
        parse_tag_name(&body).ok_or_else(|| InstallError::NetworkFailure {
            target: url,
            detail: "response has no tag_name".to_string(),
        })
    }
}

/// Extract `tag_name` from a GitHub release JSON document.
#[must_use]
pub fn parse_tag_name(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("tag_name")?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Fill `{arch}`, `{uname_arch}`, `{os}` and `{version}` in a URL template.
///
/// # Errors
///
/// Returns [`InstallError::UnsupportedPlatform`] naming the architecture
/// (or family) when the template needs a value this platform lacks.
pub fn expand_url(
    capability: &str,
    template: &str,
    platform: &Platform,
    version: Option<&str>,
) -> Result<String, InstallError> {
    let unsupported = |what: String| InstallError::UnsupportedPlatform {
        capability: capability.to_string(),
        platform: what,
    };
    let mut url = template.to_string();

    if url.contains("{arch}") {
        let arch = platform
            .arch
            .release_name()
            .ok_or_else(|| unsupported(platform.arch.to_string()))?;
        url = url.replace("{arch}", arch);
    }
    if url.contains("{uname_arch}") {
        let arch = platform
            .arch
            .uname_name()
            .ok_or_else(|| unsupported(platform.arch.to_string()))?;
        url = url.replace("{uname_arch}", arch);
    }
    if url.contains("{os}") {
        let os = platform
            .release_os()
            .ok_or_else(|| unsupported(platform.family.to_string()))?;
        url = url.replace("{os}", os);
    }
    if let Some(v) = version {
        url = url.replace("{version}", v);
    }
    Ok(url)
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    digest.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Compare the digest of `bytes` with `expected` (case-insensitive).
///
/// # Errors
///
/// Returns a description of the mismatch.
pub fn verify_sha256(bytes: &[u8], expected: &str) -> Result<(), String> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!("checksum mismatch: expected {expected}, got {actual}"))
    }
}

/// Staging path next to `dest` used for atomic writes.
fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".devsetup-new");
    dest.with_file_name(name)
}

/// Write `bytes` to `dest` via a temp file and rename; optionally mark the
/// result executable.
///
/// # Errors
///
/// Returns an error if the parent cannot be created or the write or rename
/// fails. The staging file is removed on failure.
pub fn write_atomic(dest: &Path, bytes: &[u8], executable: bool) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory: {}", parent.display()))?;
    }
    let tmp = staging_path(dest);
    let result = fs::write(&tmp, bytes)
        .with_context(|| format!("writing {}", tmp.display()))
        .and_then(|()| {
            if executable {
                mark_executable(&tmp)?;
            }
            fs::rename(&tmp, dest).with_context(|| format!("installing {}", dest.display()))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(unix)]
pub(crate) fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub(crate) const fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
