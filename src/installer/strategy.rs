//! Execution of a single install strategy.
use std::path::{Path, PathBuf};

use super::Installer;
use super::download::{expand_url, mark_executable, verify_sha256, write_atomic};
use crate::config::{ArchiveSpec, Capability, DownloadSpec, Packages, ScriptSpec, Strategy};
use crate::error::InstallError;
use crate::exec::{Elevation, ExecResult};
use crate::resources::helpers::fs::expand_home;

const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];
const BREW_ENV: &[(&str, &str)] = &[("NONINTERACTIVE", "1"), ("HOMEBREW_NO_AUTO_UPDATE", "1")];

/// Run `strategy` for `cap`. Success means the command claimed success;
/// the caller still verifies.
pub(super) fn run(
    installer: &Installer<'_>,
    cap: &Capability,
    strategy: &Strategy,
) -> Result<(), InstallError> {
    let label = strategy.to_string();
    match strategy {
        Strategy::Apt(p) => {
            refresh_apt(installer);
            package(installer, &label, "apt-get", &["install", "-y"], p, APT_ENV, true)
        }
        Strategy::Dnf(p) => package(installer, &label, "dnf", &["install", "-y"], p, &[], true),
        Strategy::Yum(p) => package(installer, &label, "yum", &["install", "-y"], p, &[], true),
        Strategy::Brew(p) => package(
            installer,
            &label,
            &installer.program("brew"),
            &["install"],
            p,
            BREW_ENV,
            false,
        ),
        Strategy::BrewCask(p) => package(
            installer,
            &label,
            &installer.program("brew"),
            &["install", "--cask"],
            p,
            BREW_ENV,
            false,
        ),
        Strategy::Choco(p) => package(installer, &label, "choco", &["install", "-y"], p, &[], false),
        Strategy::Scoop(p) => package(
            installer,
            &label,
            "powershell",
            &["-NoProfile", "-Command", "scoop", "install"],
            p,
            &[],
            false,
        ),
        Strategy::Pip(p) => {
            let python = if installer.platform.is_windows() {
                "python"
            } else {
                "python3"
            };
            package(
                installer,
                &label,
                python,
                &["-m", "pip", "install", "--user"],
                p,
                &[],
                false,
            )
        }
        Strategy::Flatpak(p) => package(
            installer,
            &label,
            "flatpak",
            &["install", "--user", "-y", "--noninteractive", "flathub"],
            p,
            &[],
            false,
        ),
        Strategy::Script(s) => script(installer, cap, &label, s),
        Strategy::Download(d) => download(installer, cap, &label, d).map(|_| ()),
        Strategy::Archive(a) => archive(installer, cap, &label, a),
        Strategy::Command(argv) => {
            let Some((program, rest)) = argv.split_first() else {
                return Err(InstallError::InstallFailed {
                    strategy: label,
                    code: None,
                    stderr: "empty command".to_string(),
                });
            };
            let args: Vec<&str> = rest.iter().map(String::as_str).collect();
            command(installer, &label, program, &args, &[], false).map(|_| ())
        }
    }
}

/// `apt-get update` once per run; failures only warn.
fn refresh_apt(installer: &Installer<'_>) {
    if !installer.session.claim_apt_refresh() {
        return;
    }
    if let Err(e) = command(installer, "apt-get update", "apt-get", &["update"], APT_ENV, true) {
        installer
            .log
            .warn(&format!("package index refresh failed, continuing: {e}"));
    }
}

fn package(
    installer: &Installer<'_>,
    label: &str,
    program: &str,
    base: &[&str],
    packages: &Packages,
    env: &[(&str, &str)],
    privileged: bool,
) -> Result<(), InstallError> {
    let mut args = base.to_vec();
    args.extend(packages.names());
    command(installer, label, program, &args, env, privileged).map(|_| ())
}

/// Run one command, elevated when `privileged`, and classify failures.
fn command(
    installer: &Installer<'_>,
    label: &str,
    program: &str,
    args: &[&str],
    env: &[(&str, &str)],
    privileged: bool,
) -> Result<ExecResult, InstallError> {
    let elevation = if privileged {
        installer.elevation()
    } else {
        Elevation::Direct
    };

    let spawned = match elevation {
        Elevation::Unavailable => {
            return Err(InstallError::PrivilegeDenied {
                strategy: label.to_string(),
                detail: "not running as root and sudo is not available".to_string(),
            });
        }
        Elevation::Direct => installer
            .executor
            .run_unchecked_with_env(program, args, env),
        Elevation::Sudo => {
            // sudo resets the environment, so pass assignments as arguments.
            let assignments: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
            let argv: Vec<&str> = assignments
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(program))
                .chain(args.iter().copied())
                .collect();
            installer.executor.run_unchecked("sudo", &argv)
        }
    };

    match spawned {
        Ok(result) if result.success => Ok(result),
        Ok(result) => Err(super::classify(label, &result)),
        Err(e) => Err(InstallError::InstallFailed {
            strategy: label.to_string(),
            code: None,
            stderr: format!("{e:#}"),
        }),
    }
}

/// Scratch file for downloaded scripts and archives.
fn scratch_path(cap: &Capability, file_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "devsetup-{}-{}-{file_name}",
        cap.name,
        std::process::id()
    ))
}

fn io_failure(label: &str, e: &anyhow::Error) -> InstallError {
    InstallError::InstallFailed {
        strategy: label.to_string(),
        code: None,
        stderr: format!("{e:#}"),
    }
}

fn script(
    installer: &Installer<'_>,
    cap: &Capability,
    label: &str,
    spec: &ScriptSpec,
) -> Result<(), InstallError> {
    let body = installer.downloader().fetch(&spec.url)?;
    let path = scratch_path(cap, "install.sh");
    write_atomic(&path, &body, false).map_err(|e| io_failure(label, &e))?;

    let script = path.to_string_lossy().into_owned();
    let expanded: Vec<String> = spec
        .args
        .iter()
        .map(|a| {
            if a.starts_with('~') {
                expand_home(a, installer.home).to_string_lossy().into_owned()
            } else {
                a.clone()
            }
        })
        .collect();
    let mut args = vec![script.as_str()];
    args.extend(expanded.iter().map(String::as_str));

    let result = command(installer, label, &spec.shell, &args, BREW_ENV, false);
    let _ = std::fs::remove_file(&path);
    result.map(|_| ())
}

/// Fetch a single binary to its destination; returns the destination.
fn download(
    installer: &Installer<'_>,
    cap: &Capability,
    label: &str,
    spec: &DownloadSpec,
) -> Result<PathBuf, InstallError> {
    let tag = installer.release_tag(spec.github.as_deref())?;
    let url = expand_url(&cap.name, &spec.url, installer.platform, tag.as_deref())?;
    installer.log.debug(&format!("{}: downloading {url}", cap.name));
    let bytes = installer.downloader().fetch(&url)?;

    if let Some(expected) = &spec.sha256 {
        verify_sha256(&bytes, expected).map_err(|detail| InstallError::VerificationMismatch {
            capability: cap.name.clone(),
            strategy: label.to_string(),
            detail,
        })?;
    }

    let dest = expand_home(&spec.dest, installer.home);
    write_atomic(&dest, &bytes, true).map_err(|e| io_failure(label, &e))?;
    Ok(dest)
}

fn archive(
    installer: &Installer<'_>,
    cap: &Capability,
    label: &str,
    spec: &ArchiveSpec,
) -> Result<(), InstallError> {
    let tag = installer.release_tag(spec.github.as_deref())?;
    let url = expand_url(&cap.name, &spec.url, installer.platform, tag.as_deref())?;
    installer.log.debug(&format!("{}: downloading {url}", cap.name));
    let bytes = installer.downloader().fetch(&url)?;

    let file_name = url.rsplit('/').next().unwrap_or("archive");
    let scratch = scratch_path(cap, file_name);
    write_atomic(&scratch, &bytes, false).map_err(|e| io_failure(label, &e))?;

    let dest = expand_home(&spec.dest, installer.home);
    let extracted = std::fs::create_dir_all(&dest)
        .map_err(|e| io_failure(label, &anyhow::Error::from(e)))
        .and_then(|()| extract(installer, label, &scratch, &dest, spec.member.as_deref()));
    let _ = std::fs::remove_file(&scratch);
    extracted?;

    if let Some(member) = &spec.member {
        let path = dest.join(member);
        if path.is_file() {
            mark_executable(&path).map_err(|e| io_failure(label, &e))?;
        }
    }

    if let Some((program, rest)) = spec.post.split_first() {
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        if let Err(e) = command(installer, label, program, &args, &[], false) {
            installer
                .log
                .warn(&format!("{}: post-extract step failed: {e}", cap.name));
        }
    }
    Ok(())
}

fn extract(
    installer: &Installer<'_>,
    label: &str,
    archive: &Path,
    dest: &Path,
    member: Option<&str>,
) -> Result<(), InstallError> {
    let archive = archive.to_string_lossy();
    let dest = dest.to_string_lossy();
    let (program, mut args): (&str, Vec<&str>) = if archive.ends_with(".zip") {
        ("unzip", vec!["-o", &*archive])
    } else {
        ("tar", vec!["-xzf", &*archive])
    };
    if program == "unzip" {
        args.extend(member);
        args.extend(["-d", &*dest]);
    } else {
        args.extend(["-C", &*dest]);
        args.extend(member);
    }
    command(installer, label, program, &args, &[], false).map(|_| ())
}
