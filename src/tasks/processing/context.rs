//! Everything a task needs from the outside world, bundled per run.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::exec::{Elevation, Executor};
use crate::installer::download::HttpClient;
use crate::installer::{InstallSession, Installer};
use crate::logging::Log;
use crate::platform::Platform;

/// Per-run state handed to every task.
///
/// Fields are public so tests can swap in a temporary home or a recording
/// logger without going through the environment.
pub struct Context {
    /// Host the run targets.
    pub platform: Arc<Platform>,
    /// Task log and summary recorder.
    pub log: Arc<dyn Log>,
    /// Plan only: detect, report, change nothing.
    pub dry_run: bool,
    /// Where `~` in catalog paths expands to.
    pub home: PathBuf,
    /// Runs external programs.
    pub executor: Arc<dyn Executor>,
    /// Fetches downloads and release metadata.
    pub http: Arc<dyn HttpClient>,
    /// Installer state shared across capabilities (elevation, apt refresh,
    /// resolved release tags).
    pub session: Arc<InstallSession>,
    /// `$SHELL` of the invoking user, used when the user database cannot
    /// be read.
    pub current_shell: Option<String>,
    /// `$CI` is set; the login shell is left alone.
    pub ci: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("dry_run", &self.dry_run)
            .field("home", &self.home)
            .field("session", &self.session)
            .field("current_shell", &self.current_shell)
            .field("ci", &self.ci)
            .finish_non_exhaustive()
    }
}

/// Home directory from an environment lookup. Windows prefers
/// `USERPROFILE`; everything else reads `HOME`. Empty values count as unset.
fn home_from(var: impl Fn(&str) -> Option<String>, windows: bool) -> Option<PathBuf> {
    let keys: &[&str] = if windows {
        &["USERPROFILE", "HOME"]
    } else {
        &["HOME"]
    };
    keys.iter()
        .find_map(|k| var(k).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

/// Home directory of the invoking user, from the process environment.
///
/// # Errors
///
/// When neither `HOME` nor (on Windows) `USERPROFILE` is set.
pub fn home_dir() -> Result<PathBuf> {
    home_from(|k| std::env::var(k).ok(), cfg!(windows))
        .ok_or_else(|| anyhow!("cannot locate the home directory: HOME is not set"))
}

impl Context {
    /// Context for a real run, reading home, shell and CI markers from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// When no home directory can be determined.
    pub fn new(
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let env = |k: &str| std::env::var(k).ok();
        let home = home_dir()?;

        Ok(Self {
            platform,
            log,
            dry_run,
            home,
            executor,
            http,
            session: Arc::new(InstallSession::new()),
            current_shell: env("SHELL").filter(|s| !s.is_empty()),
            ci: env("CI").is_some_and(|v| !v.is_empty()),
        })
    }

    /// Installer bound to this context.
    #[must_use]
    pub fn installer(&self) -> Installer<'_> {
        Installer::new(
            self.executor.as_ref(),
            self.http.as_ref(),
            &self.platform,
            self.log.as_ref(),
            &self.home,
            &self.session,
        )
    }

    /// Elevation for privileged writes, probed once per run.
    #[must_use]
    pub fn elevation(&self) -> Elevation {
        self.session.elevation(self.executor.as_ref(), &self.platform)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::platform::{Arch, Family};
    use crate::tasks::test_helpers::make_context;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |k: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn home_comes_from_home_on_unix() {
        let env = vars(&[("HOME", "/home/dev"), ("USERPROFILE", "C:\\Users\\dev")]);
        assert_eq!(home_from(env, false), Some(PathBuf::from("/home/dev")));
    }

    #[test]
    fn windows_prefers_userprofile_and_falls_back_to_home() {
        let both = vars(&[("HOME", "/home/dev"), ("USERPROFILE", "C:\\Users\\dev")]);
        assert_eq!(home_from(both, true), Some(PathBuf::from("C:\\Users\\dev")));
        let msys = vars(&[("HOME", "/c/Users/dev"), ("USERPROFILE", "")]);
        assert_eq!(home_from(msys, true), Some(PathBuf::from("/c/Users/dev")));
    }

    #[test]
    fn empty_home_is_unset() {
        assert_eq!(home_from(vars(&[("HOME", "")]), false), None);
        assert_eq!(home_from(vars(&[]), false), None);
    }

    #[test]
    fn elevation_is_probed_once() {
        let exec = Arc::new(ScriptedExecutor::new().on("id -u", Reply::ok("0\n")));
        let ctx = make_context(
            Platform::new(Family::LinuxRhel, Arch::Aarch64),
            Arc::clone(&exec),
        );
        assert_eq!(ctx.elevation(), Elevation::Direct);
        assert_eq!(ctx.elevation(), Elevation::Direct);
        assert_eq!(exec.count("id -u"), 1);
    }

    #[test]
    fn debug_leaves_out_trait_objects() {
        let ctx = make_context(
            Platform::new(Family::Macos, Arch::Aarch64),
            Arc::new(ScriptedExecutor::new()),
        );
        let debug = format!("{ctx:?}");
        assert!(debug.contains("dry_run: false"));
        assert!(!debug.contains("executor"));
    }
}
