//! Programs installed where a fresh process may not have them on `PATH`.
use std::path::{Path, PathBuf};

use crate::exec::Executor;
use crate::platform::{Family, Platform};

/// Homebrew prefixes: Apple Silicon first, then Intel.
const HOMEBREW_BINS: [&str; 2] = ["/opt/homebrew/bin", "/usr/local/bin"];

/// Directories, in lookup order, that installers write to but a shell
/// started before the install may not search.
#[must_use]
pub fn bin_dirs(platform: &Platform, home: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![home.join(".local").join("bin")];
    if platform.family == Family::Macos {
        dirs.extend(HOMEBREW_BINS.iter().map(PathBuf::from));
    }
    dirs
}

/// `program` as given when it is on `PATH`, otherwise the full path of the
/// first [`bin_dirs`] entry that has it.
#[must_use]
pub fn locate(
    executor: &dyn Executor,
    platform: &Platform,
    home: &Path,
    program: &str,
) -> Option<String> {
    if executor.which(program) {
        return Some(program.to_string());
    }
    bin_dirs(platform, home)
        .into_iter()
        .map(|dir| dir.join(program).to_string_lossy().into_owned())
        .find(|path| executor.which(path))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::ScriptedExecutor;
    use crate::platform::Arch;

    #[test]
    fn homebrew_prefixes_only_on_macos() {
        let home = Path::new("/home/dev");
        let linux = bin_dirs(&Platform::new(Family::LinuxDebian, Arch::X86_64), home);
        assert_eq!(linux, [PathBuf::from("/home/dev/.local/bin")]);

        let mac = bin_dirs(&Platform::new(Family::Macos, Arch::Aarch64), home);
        assert_eq!(mac.len(), 3);
        assert_eq!(mac[1], PathBuf::from("/opt/homebrew/bin"));
    }

    #[test]
    fn path_wins_over_known_directories() {
        let exec = ScriptedExecutor::new().with_path(&["brew", "/opt/homebrew/bin/brew"]);
        let mac = Platform::new(Family::Macos, Arch::Aarch64);
        assert_eq!(
            locate(&exec, &mac, Path::new("/Users/dev"), "brew").as_deref(),
            Some("brew")
        );
    }

    #[test]
    fn apple_silicon_brew_is_found_off_path() {
        let exec = ScriptedExecutor::new().with_path(&["/opt/homebrew/bin/brew"]);
        let mac = Platform::new(Family::Macos, Arch::Aarch64);
        assert_eq!(
            locate(&exec, &mac, Path::new("/Users/dev"), "brew").as_deref(),
            Some("/opt/homebrew/bin/brew")
        );
        let linux = Platform::new(Family::LinuxDebian, Arch::Aarch64);
        assert_eq!(locate(&exec, &linux, Path::new("/home/dev"), "brew"), None);
    }
}
