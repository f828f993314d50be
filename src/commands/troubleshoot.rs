//! Command: diagnose a local minikube cluster and start it if stopped.
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::exec::{Executor, SystemExecutor};
use crate::installer::locate::locate;
use crate::logging::{Log, Logger, TaskStatus};
use crate::platform::{Family, Platform};
use crate::tasks::home_dir;

/// State reported by `minikube status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    /// The host is up.
    Running,
    /// A profile exists but the host is not running.
    Stopped,
    /// No cluster profile exists yet.
    Missing,
}

/// Classify `minikube status` output.
#[must_use]
pub fn parse_status(output: &str) -> ClusterStatus {
    let host = output
        .lines()
        .filter_map(|l| l.trim().strip_prefix("host:"))
        .map(str::trim)
        .next();
    match host {
        Some("Running") => ClusterStatus::Running,
        Some(_) => ClusterStatus::Stopped,
        None => ClusterStatus::Missing,
    }
}

/// What the diagnosis found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    /// How to invoke `minikube`: the bare name when on PATH, else the full
    /// path of an off-PATH install.
    pub minikube: Option<String>,
    /// How to invoke `kubectl`, resolved the same way.
    pub kubectl: Option<String>,
    /// First usable container runtime.
    pub runtime: Option<&'static str>,
    /// Cluster state, [`ClusterStatus::Missing`] without minikube.
    pub status: ClusterStatus,
    /// Driver to pass to `minikube start`.
    pub driver: Option<&'static str>,
}

/// Minikube troubleshooter over an injectable executor.
pub struct Troubleshooter<'a> {
    executor: &'a dyn Executor,
    platform: &'a Platform,
    home: &'a Path,
    log: &'a dyn Log,
    dry_run: bool,
    kvm: bool,
}

impl std::fmt::Debug for Troubleshooter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Troubleshooter")
            .field("platform", &self.platform)
            .field("home", &self.home)
            .field("dry_run", &self.dry_run)
            .field("kvm", &self.kvm)
            .finish_non_exhaustive()
    }
}

impl<'a> Troubleshooter<'a> {
    /// Create a troubleshooter. `home` anchors `~/.local/bin`; `kvm` says
    /// whether `/dev/kvm` exists.
    #[must_use]
    pub fn new(
        executor: &'a dyn Executor,
        platform: &'a Platform,
        home: &'a Path,
        log: &'a dyn Log,
        dry_run: bool,
        kvm: bool,
    ) -> Self {
        Self {
            executor,
            platform,
            home,
            log,
            dry_run,
            kvm,
        }
    }

    fn runtime_usable(&self, program: &str) -> bool {
        self.executor.which(program)
            && self
                .executor
                .run_unchecked(program, &["info"])
                .is_ok_and(|r| r.success)
    }

    fn driver(&self, runtime: Option<&'static str>) -> Option<&'static str> {
        if runtime.is_some() {
            return runtime;
        }
        match self.platform.family {
            Family::LinuxDebian | Family::LinuxRhel => {
                (self.kvm && self.executor.which("virsh")).then_some("kvm2")
            }
            Family::Macos => self.executor.which("qemu-img").then_some("qemu"),
            Family::Windows => Some("hyperv"),
            Family::Unsupported(_) => None,
        }
    }

    fn locate(&self, program: &str) -> Option<String> {
        locate(self.executor, self.platform, self.home, program)
    }

    /// Look up tools, runtimes and cluster state.
    #[must_use]
    pub fn diagnose(&self) -> Diagnosis {
        let minikube = self.locate("minikube");
        let kubectl = self.locate("kubectl");
        let runtime = ["docker", "podman"]
            .into_iter()
            .find(|r| self.runtime_usable(r));

        let status = minikube.as_deref().map_or(ClusterStatus::Missing, |program| {
            self.executor
                .run_unchecked(program, &["status"])
                .map_or(ClusterStatus::Missing, |r| parse_status(&r.stdout))
        });

        Diagnosis {
            minikube,
            kubectl,
            runtime,
            status,
            driver: self.driver(runtime),
        }
    }

    /// Report the diagnosis and start the cluster when it is not running.
    ///
    /// Returns the status recorded for the summary.
    ///
    /// # Errors
    ///
    /// Returns an error only if `minikube` cannot be spawned at all.
    pub fn run(&self) -> Result<TaskStatus> {
        let d = self.diagnose();
        self.log.info(&format!(
            "minikube: {}, kubectl: {}, runtime: {}",
            found(d.minikube.as_deref()),
            found(d.kubectl.as_deref()),
            d.runtime.unwrap_or("none")
        ));

        let Some(minikube) = d.minikube.as_deref() else {
            self.log
                .warn("minikube is not installed; run `devsetup install --install-dev-tools`");
            return Ok(TaskStatus::Failed);
        };
        if d.kubectl.is_none() {
            self.log.warn("kubectl is not installed; cluster access will be limited");
        }

        if d.status == ClusterStatus::Running {
            self.log.info("cluster is running");
            return Ok(TaskStatus::Ok);
        }
        self.log.info(&format!(
            "cluster is {}",
            if d.status == ClusterStatus::Stopped {
                "stopped"
            } else {
                "not created"
            }
        ));

        let Some(driver) = d.driver else {
            self.log.warn("no usable minikube driver found; install docker or podman");
            return Ok(TaskStatus::Failed);
        };
        self.log.info(&format!("suggested driver: {driver}"));

        let flag = format!("--driver={driver}");
        if self.dry_run {
            self.log
                .dry_run(&format!("would run minikube start {flag}"));
            return Ok(TaskStatus::DryRun);
        }

        let result = self
            .executor
            .run_unchecked(minikube, &["start", flag.as_str()])?;
        if result.success {
            self.log.info(&format!("minikube started with the {driver} driver"));
            Ok(TaskStatus::Ok)
        } else {
            self.log.warn(&format!(
                "minikube start failed: {}; try `minikube delete` and run again",
                result.stderr.trim()
            ));
            Ok(TaskStatus::Failed)
        }
    }
}

const fn found(program: Option<&str>) -> &'static str {
    if program.is_some() { "found" } else { "missing" }
}

/// Run the troubleshooter against the real host.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or `minikube` cannot be
/// spawned.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let platform = Platform::detect();
    let home = home_dir()?;
    log.stage("Troubleshooting minikube");
    let troubleshooter = Troubleshooter::new(
        &SystemExecutor,
        &platform,
        &home,
        log.as_ref(),
        global.dry_run,
        Path::new("/dev/kvm").exists(),
    );
    let status = troubleshooter.run()?;
    log.record_task("minikube", status, None);
    log.print_summary();
    Ok(())
}
