//! File operations on root-owned paths.
//!
//! With [`Elevation::Direct`] these are plain file-system calls (and so are
//! testable against a temporary directory); with [`Elevation::Sudo`] they go
//! through `sudo cp`, `sudo cat` and `sudo sh`.
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context as _, Result};

use super::fs::{append_line_with_backup, backup_path, write_with_backup};
use crate::exec::{Elevation, Executor};
use crate::resources::ResourceChange;

fn unavailable(path: &Path) -> ResourceChange {
    ResourceChange::Skipped {
        reason: format!("{} needs root and sudo is not available", path.display()),
    }
}

fn sudo(executor: &dyn Executor, args: &[&str]) -> Result<()> {
    executor.run("sudo", args).map(|_| ())
}

/// Copy an existing `path` to a timestamped backup through sudo.
fn sudo_backup(executor: &dyn Executor, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let backup = backup_path(path, &stamp);
    sudo(
        executor,
        &["cp", "-p", &path.to_string_lossy(), &backup.to_string_lossy()],
    )
}

/// Read `path`, through `sudo cat` when it is not readable directly.
/// Returns `None` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_file(
    executor: &dyn Executor,
    elevation: Elevation,
    path: &Path,
) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && elevation == Elevation::Sudo => {
            let result = executor.run("sudo", &["cat", &path.to_string_lossy()])?;
            Ok(Some(result.stdout))
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Write `content` to `path`, backing up an existing file.
///
/// # Errors
///
/// Returns an error if any step fails.
pub fn write_file(
    executor: &dyn Executor,
    elevation: Elevation,
    path: &Path,
    content: &str,
) -> Result<ResourceChange> {
    match elevation {
        Elevation::Direct => {
            write_with_backup(path, content.as_bytes())?;
            Ok(ResourceChange::Applied)
        }
        Elevation::Unavailable => Ok(unavailable(path)),
        Elevation::Sudo => {
            let mut staged = tempfile::Builder::new()
                .prefix("devsetup-")
                .tempfile()
                .context("creating a staging file")?;
            staged
                .write_all(content.as_bytes())
                .context("writing the staging file")?;

            sudo_backup(executor, path)?;
            if let Some(parent) = path.parent() {
                sudo(executor, &["mkdir", "-p", &parent.to_string_lossy()])?;
            }
            sudo(
                executor,
                &[
                    "cp",
                    &staged.path().to_string_lossy(),
                    &path.to_string_lossy(),
                ],
            )?;
            Ok(ResourceChange::Applied)
        }
    }
}

/// Append `line` to `path`, backing up an existing file.
///
/// # Errors
///
/// Returns an error if any step fails.
pub fn append_line(
    executor: &dyn Executor,
    elevation: Elevation,
    path: &Path,
    line: &str,
) -> Result<ResourceChange> {
    match elevation {
        Elevation::Direct => {
            append_line_with_backup(path, line)?;
            Ok(ResourceChange::Applied)
        }
        Elevation::Unavailable => Ok(unavailable(path)),
        Elevation::Sudo => {
            sudo_backup(executor, path)?;
            sudo(
                executor,
                &[
                    "sh",
                    "-c",
                    r#"printf '%s\n' "$1" >> "$2""#,
                    "sh",
                    line,
                    &path.to_string_lossy(),
                ],
            )?;
            Ok(ResourceChange::Applied)
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::{Reply, ScriptedExecutor};
    use crate::resources::helpers::fs::backups_of;

    #[test]
    fn direct_write_backs_up_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.conf");
        std::fs::write(&path, "old").unwrap();
        let exec = ScriptedExecutor::new();

        let change = write_file(&exec, Elevation::Direct, &path, "new").unwrap();

        assert_eq!(change, ResourceChange::Applied);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(backups_of(&path).len(), 1);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn sudo_write_copies_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/k3s.conf");
        let exec = ScriptedExecutor::new().on("sudo", Reply::ok(""));

        write_file(&exec, Elevation::Sudo, &path, "x").unwrap();

        let calls = exec.calls();
        assert!(calls[0].starts_with("sudo mkdir -p"), "{calls:?}");
        assert!(calls[1].starts_with("sudo cp "), "{calls:?}");
        assert!(calls[1].ends_with("etc/k3s.conf"), "{calls:?}");
    }

    #[test]
    fn sudo_staging_file_is_private_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/k3s.conf");
        let exec = ScriptedExecutor::new().on("sudo", Reply::ok(""));

        write_file(&exec, Elevation::Sudo, &path, "x").unwrap();

        let calls = exec.calls();
        let staged = calls[1].split(' ').nth(2).unwrap();
        let name = Path::new(staged).file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("devsetup-"), "{staged}");
        assert_ne!(name, format!("devsetup-{}-k3s.conf", std::process::id()));
        assert!(!Path::new(staged).exists());
    }

    #[test]
    fn unavailable_elevation_skips() {
        let exec = ScriptedExecutor::new();
        let change = append_line(&exec, Elevation::Unavailable, Path::new("/etc/shells"), "/bin/zsh")
            .unwrap();
        assert!(matches!(change, ResourceChange::Skipped { .. }));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn read_missing_file_is_none() {
        let exec = ScriptedExecutor::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(
            read_file(&exec, Elevation::Sudo, &dir.path().join("nope"))
                .unwrap()
                .is_none()
        );
    }
}
