//! Capability entries of the catalog: detection, per-platform install
//! strategies and post-install configuration steps.
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::platform::{Family, Platform};

/// Feature group a capability belongs to; selected by `install` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Group {
    /// Always installed.
    Core,
    /// Shell and prompt (`--skip-zsh` skips).
    Shell,
    /// Fonts (`--skip-fonts` skips).
    Fonts,
    /// Graphical applications (`--install-desktop`).
    Desktop,
    /// Developer and Kubernetes tooling (`--install-dev-tools`).
    DevTools,
    /// Ansible itself (`--skip-ansible` skips).
    Ansible,
}

impl Group {
    /// Catalog spelling of the group.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Shell => "shell",
            Self::Fonts => "fonts",
            Self::Desktop => "desktop",
            Self::DevTools => "dev-tools",
            Self::Ansible => "ansible",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_group() -> Group {
    Group::Core
}

/// One or more package names for a package-manager strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Packages {
    /// A single package.
    One(String),
    /// Several packages installed in one invocation.
    Many(Vec<String>),
}

impl Packages {
    /// Package names as a slice-like vector.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Packages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" "))
    }
}

/// Install script fetched over HTTP and piped to a shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptSpec {
    /// Script URL.
    pub url: String,
    /// Interpreter (`sh` or `bash`).
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Arguments passed to the script, after its path.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_shell() -> String {
    "sh".to_string()
}

/// Single-binary release download.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadSpec {
    /// URL template.
    pub url: String,
    /// Destination file (may start with `~/`).
    pub dest: String,
    /// Expected SHA-256 of the downloaded bytes, lowercase hex.
    #[serde(default)]
    pub sha256: Option<String>,
    /// `owner/repo` whose latest release tag fills `{version}`.
    #[serde(default)]
    pub github: Option<String>,
}

/// Zip or tarball extracted into a directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveSpec {
    /// URL template.
    pub url: String,
    /// Destination directory (may start with `~/`).
    pub dest: String,
    /// `owner/repo` whose latest release tag fills `{version}`.
    #[serde(default)]
    pub github: Option<String>,
    /// Extract only this member instead of the whole archive.
    #[serde(default)]
    pub member: Option<String>,
    /// Command run after a successful extraction (e.g. `fc-cache -f`).
    #[serde(default)]
    pub post: Vec<String>,
}

/// One way of installing a capability.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `apt-get install -y`.
    Apt(Packages),
    /// `dnf install -y`.
    Dnf(Packages),
    /// `yum install -y`.
    Yum(Packages),
    /// `brew install`.
    Brew(Packages),
    /// `brew install --cask`.
    BrewCask(Packages),
    /// `choco install -y`.
    Choco(Packages),
    /// `scoop install`.
    Scoop(Packages),
    /// `pip install --user`.
    Pip(Packages),
    /// `flatpak install --user -y flathub`.
    Flatpak(Packages),
    /// Remote install script.
    Script(ScriptSpec),
    /// Binary release download.
    Download(DownloadSpec),
    /// Archive download and extraction.
    Archive(ArchiveSpec),
    /// Arbitrary argv.
    Command(Vec<String>),
}

impl Strategy {
    /// Short strategy kind, as written in the catalog.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Apt(_) => "apt",
            Self::Dnf(_) => "dnf",
            Self::Yum(_) => "yum",
            Self::Brew(_) => "brew",
            Self::BrewCask(_) => "brew_cask",
            Self::Choco(_) => "choco",
            Self::Scoop(_) => "scoop",
            Self::Pip(_) => "pip",
            Self::Flatpak(_) => "flatpak",
            Self::Script(_) => "script",
            Self::Download(_) => "download",
            Self::Archive(_) => "archive",
            Self::Command(_) => "command",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apt(p) => write!(f, "apt install {p}"),
            Self::Dnf(p) => write!(f, "dnf install {p}"),
            Self::Yum(p) => write!(f, "yum install {p}"),
            Self::Brew(p) => write!(f, "brew install {p}"),
            Self::BrewCask(p) => write!(f, "brew install --cask {p}"),
            Self::Choco(p) => write!(f, "choco install {p}"),
            Self::Scoop(p) => write!(f, "scoop install {p}"),
            Self::Pip(p) => write!(f, "pip install {p}"),
            Self::Flatpak(p) => write!(f, "flatpak install {p}"),
            Self::Script(s) => write!(f, "{} script {}", s.shell, s.url),
            Self::Download(d) => write!(f, "download {} -> {}", d.url, d.dest),
            Self::Archive(a) => write!(f, "extract {} -> {}", a.url, a.dest),
            Self::Command(argv) => write!(f, "{}", argv.join(" ")),
        }
    }
}

/// Post-install configuration action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigStep {
    /// Ensure a marker line is present in a file.
    Line {
        /// Target file.
        path: String,
        /// Exact line.
        line: String,
        /// Create the file when missing (otherwise the step is skipped).
        #[serde(default = "yes")]
        create: bool,
    },
    /// Ensure a file has exactly this content.
    File {
        /// Target file.
        path: String,
        /// Full content.
        content: String,
        /// Write through `sudo` (system paths).
        #[serde(default)]
        privileged: bool,
    },
    /// Merge top-level keys into a JSON settings file.
    Json {
        /// Target file.
        path: String,
        /// Keys to set.
        settings: serde_json::Map<String, serde_json::Value>,
    },
    /// Run a generator command, falling back to static content on failure.
    Preset {
        /// Generator argv; `{path}` is replaced with the target path.
        command: Vec<String>,
        /// Target file.
        path: String,
        /// Content written when the generator fails.
        fallback: String,
    },
    /// Make a shell the login shell.
    DefaultShell {
        /// Shell program name (resolved on PATH).
        shell: String,
    },
    /// Copy a file into place.
    Copy {
        /// Source file.
        from: String,
        /// Destination file.
        to: String,
        /// Read the source through `sudo`.
        #[serde(default)]
        privileged: bool,
    },
    /// Run a command unless a check command already succeeds.
    Command {
        /// Argv to run.
        command: Vec<String>,
        /// Check argv; exit status zero means nothing to do. Empty runs
        /// `command` every time.
        #[serde(default)]
        unless: Vec<String>,
        /// Run `command` through `sudo`.
        #[serde(default)]
        privileged: bool,
    },
}

const fn yes() -> bool {
    true
}

impl ConfigStep {
    /// Short step kind, as written in the catalog.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::File { .. } => "file",
            Self::Json { .. } => "json",
            Self::Preset { .. } => "preset",
            Self::DefaultShell { .. } => "default_shell",
            Self::Copy { .. } => "copy",
            Self::Command { .. } => "command",
        }
    }
}

/// A configuration step with an optional platform restriction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigEntry {
    /// Families the step applies to; empty means all.
    #[serde(default)]
    pub only: Vec<String>,
    /// The step itself.
    #[serde(flatten)]
    pub step: ConfigStep,
}

impl ConfigEntry {
    /// Whether this step applies on `platform`.
    #[must_use]
    pub fn applies_to(&self, platform: &Platform) -> bool {
        family_allowed(&self.only, &platform.family)
    }
}

/// A tool the bootstrapper wants present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capability {
    /// Unique name.
    pub name: String,
    /// Feature group.
    #[serde(default = "default_group")]
    pub group: Group,
    /// A failure aborts the run.
    #[serde(default)]
    pub required: bool,
    /// Detection argv; exit status zero means present.
    pub detect: Vec<String>,
    /// Minimum acceptable version, compared against the detection output.
    #[serde(default)]
    pub min_version: Option<String>,
    /// Verification argv run after an install; defaults to `detect`.
    #[serde(default)]
    pub verify: Option<Vec<String>>,
    /// Families this capability applies to; empty means all.
    #[serde(default)]
    pub only: Vec<String>,
    /// Ordered strategies per family key.
    #[serde(default)]
    pub install: BTreeMap<String, Vec<Strategy>>,
    /// Post-install configuration.
    #[serde(default)]
    pub configure: Vec<ConfigEntry>,
}

impl Capability {
    /// Ordered strategies for a family (empty when none are declared).
    #[must_use]
    pub fn strategies_for(&self, family: &Family) -> &[Strategy] {
        family
            .key()
            .and_then(|k| self.install.get(k))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether the capability applies on `platform` at all.
    ///
    /// Unrestricted capabilities apply to unsupported families too, so the
    /// installer reports them instead of silently skipping.
    #[must_use]
    pub fn applies_to(&self, platform: &Platform) -> bool {
        family_allowed(&self.only, &platform.family)
            || (self.only.is_empty() && !platform.family.is_supported())
    }

    /// Verification argv.
    #[must_use]
    pub fn verify_command(&self) -> &[String] {
        self.verify.as_deref().unwrap_or(&self.detect)
    }
}

fn family_allowed(only: &[String], family: &Family) -> bool {
    only.is_empty() || family.key().is_some_and(|k| only.iter().any(|o| o == k))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::platform::Arch;

    fn parse(src: &str) -> Capability {
        #[derive(Deserialize)]
        struct Wrapper {
            capability: Vec<Capability>,
        }
        let w: Wrapper = toml::from_str(src).unwrap();
        w.capability.into_iter().next().unwrap()
    }

    #[test]
    fn parses_package_strategies() {
        let cap = parse(
            r#"
            [[capability]]
            name = "git"
            required = true
            detect = ["git", "--version"]
            [capability.install]
            linux-rhel = [{ dnf = "git" }, { yum = ["git", "git-lfs"] }]
            "#,
        );
        assert!(cap.required);
        assert_eq!(cap.group, Group::Core);
        let rhel = cap.strategies_for(&Family::LinuxRhel);
        assert_eq!(rhel.len(), 2);
        assert_eq!(rhel[0], Strategy::Dnf(Packages::One("git".to_string())));
        assert_eq!(rhel[1].to_string(), "yum install git git-lfs");
        assert!(cap.strategies_for(&Family::Macos).is_empty());
    }

    #[test]
    fn parses_download_and_archive() {
        let cap = parse(
            r#"
            [[capability]]
            name = "k9s"
            group = "dev-tools"
            detect = ["k9s", "version"]
            [capability.install]
            linux-debian = [
              { download = { url = "https://x/{arch}", dest = "~/.local/bin/k9s", sha256 = "ab" } },
              { archive = { url = "https://x.tgz", dest = "~/.local/bin", member = "k9s" } },
            ]
            "#,
        );
        assert_eq!(cap.group, Group::DevTools);
        let s = cap.strategies_for(&Family::LinuxDebian);
        assert_eq!(
            s.iter().map(Strategy::kind).collect::<Vec<_>>(),
            ["download", "archive"]
        );
        let Strategy::Archive(a) = &s[1] else {
            panic!("expected archive")
        };
        assert_eq!(a.member.as_deref(), Some("k9s"));
    }

    #[test]
    fn parses_config_steps_with_only() {
        let cap = parse(
            r#"
            [[capability]]
            name = "starship"
            detect = ["starship", "--version"]
            [[capability.configure]]
            kind = "line"
            only = ["macos"]
            path = "~/.zshrc"
            line = "eval"
            [[capability.configure]]
            kind = "json"
            path = "~/settings.json"
            [capability.configure.settings]
            "editor.formatOnSave" = true
            "#,
        );
        assert_eq!(cap.configure.len(), 2);
        let macos = Platform::new(Family::Macos, Arch::Aarch64);
        let debian = Platform::new(Family::LinuxDebian, Arch::X86_64);
        assert!(cap.configure[0].applies_to(&macos));
        assert!(!cap.configure[0].applies_to(&debian));
        assert!(matches!(
            cap.configure[0].step,
            ConfigStep::Line { create: true, .. }
        ));
        let ConfigStep::Json { settings, .. } = &cap.configure[1].step else {
            panic!("expected json")
        };
        assert_eq!(settings["editor.formatOnSave"], serde_json::Value::Bool(true));
    }

    #[test]
    fn unknown_field_is_rejected() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[allow(dead_code)]
            capability: Vec<Capability>,
        }
        let err = toml::from_str::<Wrapper>(
            "[[capability]]\nname = \"a\"\ndetect = [\"a\"]\nbogus = 1\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn only_restricts_families() {
        let cap = parse(
            r#"
            [[capability]]
            name = "homebrew"
            only = ["macos"]
            detect = ["brew", "--version"]
            "#,
        );
        assert!(cap.applies_to(&Platform::new(Family::Macos, Arch::X86_64)));
        assert!(!cap.applies_to(&Platform::new(Family::Windows, Arch::X86_64)));
        assert!(!cap.applies_to(&Platform::new(
            Family::Unsupported("arch".to_string()),
            Arch::X86_64
        )));
    }

    #[test]
    fn unrestricted_capability_applies_to_unsupported_family() {
        let cap = parse(
            r#"
            [[capability]]
            name = "curl"
            detect = ["curl", "--version"]
            "#,
        );
        assert!(cap.applies_to(&Platform::new(
            Family::Unsupported("arch".to_string()),
            Arch::X86_64
        )));
    }

    #[test]
    fn verify_defaults_to_detect() {
        let cap = parse(
            r#"
            [[capability]]
            name = "git"
            detect = ["git", "--version"]
            "#,
        );
        assert_eq!(cap.verify_command(), ["git", "--version"]);
    }
}
