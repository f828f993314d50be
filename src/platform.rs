//! Host platform detection.
//!
//! [`HostProbe::gather`] is the only part that touches the real host; the
//! classification itself is a pure function of the probe so every branch can
//! be tested with synthetic inputs.
use std::collections::HashMap;
use std::fmt;

use crate::error::PlatformError;

/// Distribution identifiers treated as the Debian family.
const DEBIAN_IDS: &[&str] = &[
    "debian",
    "ubuntu",
    "linuxmint",
    "pop",
    "kali",
    "raspbian",
    "elementary",
    "zorin",
];

/// Distribution identifiers treated as the RHEL family.
const RHEL_IDS: &[&str] = &[
    "fedora",
    "rhel",
    "centos",
    "rocky",
    "almalinux",
    "ol",
    "amzn",
];

/// Environment variables captured by [`HostProbe::gather`].
const PROBED_VARS: &[&str] = &[
    "OSTYPE",
    "WINDIR",
    "PROCESSOR_ARCHITECTURE",
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_CURRENT_DESKTOP",
];

/// Operating system family, each mapped to one package-manager strategy set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Family {
    /// Debian, Ubuntu and derivatives (apt).
    LinuxDebian,
    /// Fedora, RHEL and derivatives (dnf, falling back to yum).
    LinuxRhel,
    /// macOS (Homebrew).
    Macos,
    /// Windows (Chocolatey, falling back to Scoop).
    Windows,
    /// Anything else; carries the raw identifier (e.g. `"arch"`).
    Unsupported(String),
}

impl Family {
    /// Catalog key for this family, `None` when unsupported.
    #[must_use]
    pub const fn key(&self) -> Option<&'static str> {
        match self {
            Self::LinuxDebian => Some("linux-debian"),
            Self::LinuxRhel => Some("linux-rhel"),
            Self::Macos => Some("macos"),
            Self::Windows => Some("windows"),
            Self::Unsupported(_) => None,
        }
    }

    /// Parse a catalog key back into a supported family.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "linux-debian" => Some(Self::LinuxDebian),
            "linux-rhel" => Some(Self::LinuxRhel),
            "macos" => Some(Self::Macos),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Whether this is one of the Linux families.
    #[must_use]
    pub const fn is_linux(&self) -> bool {
        matches!(self, Self::LinuxDebian | Self::LinuxRhel)
    }

    /// Whether this family is in the supported enumeration.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(id) => write!(f, "{id}"),
            supported => write!(f, "{}", supported.key().unwrap_or("unknown")),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Aarch64,
    /// Anything else; carries the raw machine string.
    Other(String),
}

impl Arch {
    /// Normalise a machine string (`uname -m`, `PROCESSOR_ARCHITECTURE`, …).
    #[must_use]
    pub fn from_machine(machine: &str) -> Self {
        match machine.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Self::X86_64,
            "aarch64" | "arm64" => Self::Aarch64,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name used by Go-style release assets (`amd64`, `arm64`).
    #[must_use]
    pub const fn release_name(&self) -> Option<&'static str> {
        match self {
            Self::X86_64 => Some("amd64"),
            Self::Aarch64 => Some("arm64"),
            Self::Other(_) => None,
        }
    }

    /// Name used by `uname -m` style release assets (`x86_64`, `aarch64`).
    #[must_use]
    pub const fn uname_name(&self) -> Option<&'static str> {
        match self {
            Self::X86_64 => Some("x86_64"),
            Self::Aarch64 => Some("aarch64"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) => write!(f, "{raw}"),
            known => write!(f, "{}", known.uname_name().unwrap_or("unknown")),
        }
    }
}

/// Graphical session markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// `DISPLAY` is set (X11 or XWayland).
    pub x11: bool,
    /// `WAYLAND_DISPLAY` is set.
    pub wayland: bool,
    /// Value of `XDG_CURRENT_DESKTOP`, lowercased.
    pub desktop: Option<String>,
}

impl Session {
    /// Whether any graphical session is available.
    #[must_use]
    pub const fn has_gui(&self) -> bool {
        self.x11 || self.wayland
    }

    /// Whether the desktop is GNOME (including `ubuntu:GNOME`).
    #[must_use]
    pub fn is_gnome(&self) -> bool {
        self.desktop.as_deref().is_some_and(|d| d.contains("gnome"))
    }
}

/// Raw host facts the classifier works from.
#[derive(Debug, Clone, Default)]
pub struct HostProbe {
    /// Compile-time OS name (`std::env::consts::OS`) or `uname -s` output.
    pub os: String,
    /// Contents of `/etc/os-release`, if readable.
    pub os_release: Option<String>,
    /// Machine architecture string.
    pub machine: String,
    /// Captured environment variables (only the probed names).
    pub env: HashMap<String, String>,
}

impl HostProbe {
    /// Read the facts from the running host.
    #[must_use]
    pub fn gather() -> Self {
        let os_release = ["/etc/os-release", "/usr/lib/os-release"]
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok());
        let env = PROBED_VARS
            .iter()
            .filter_map(|k| {
                std::env::var(k)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|v| ((*k).to_string(), v))
            })
            .collect();
        Self {
            os: std::env::consts::OS.to_string(),
            os_release,
            machine: std::env::consts::ARCH.to_string(),
            env,
        }
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

/// Parse `KEY=VALUE` lines from an os-release file, unquoting values.
#[must_use]
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            (
                k.trim().to_string(),
                v.trim().trim_matches('"').trim_matches('\'').to_string(),
            )
        })
        .collect()
}

/// Classify a single distribution identifier.
fn family_of_id(id: &str) -> Option<Family> {
    if DEBIAN_IDS.contains(&id) {
        Some(Family::LinuxDebian)
    } else if RHEL_IDS.contains(&id) {
        Some(Family::LinuxRhel)
    } else {
        None
    }
}

/// Classify a Linux host from its os-release contents.
fn classify_linux(os_release: Option<&str>) -> Result<Family, PlatformError> {
    let Some(content) = os_release else {
        return Err(PlatformError::Unrecognised("linux".to_string()));
    };
    let fields = parse_os_release(content);
    let id = fields
        .get("ID")
        .map_or_else(|| "linux".to_string(), |s| s.to_ascii_lowercase());

    if let Some(family) = family_of_id(&id) {
        return Ok(family);
    }

    let like: Vec<Family> = fields
        .get("ID_LIKE")
        .map(|s| {
            s.split_whitespace()
                .filter_map(|t| family_of_id(&t.to_ascii_lowercase()))
                .collect()
        })
        .unwrap_or_default();

    match like.as_slice() {
        [] => Err(PlatformError::Unrecognised(id)),
        [first, rest @ ..] => {
            if let Some(other) = rest.iter().find(|f| *f != first) {
                return Err(PlatformError::Ambiguous {
                    id,
                    first: first.to_string(),
                    second: other.to_string(),
                });
            }
            Ok(first.clone())
        }
    }
}

/// Classify the OS family of a probe.
///
/// # Errors
///
/// Returns [`PlatformError::Unrecognised`] when no supported marker is
/// found, and [`PlatformError::Ambiguous`] when the markers disagree.
pub fn classify_family(probe: &HostProbe) -> Result<Family, PlatformError> {
    let ostype = probe.var("OSTYPE").unwrap_or_default().to_ascii_lowercase();
    if probe.os == "windows"
        || ostype.starts_with("msys")
        || ostype.starts_with("cygwin")
        || ostype == "win32"
        || probe.var("WINDIR").is_some()
    {
        return Ok(Family::Windows);
    }

    match probe.os.to_ascii_lowercase().as_str() {
        "macos" | "darwin" => Ok(Family::Macos),
        "linux" => classify_linux(probe.os_release.as_deref()),
        other => Err(PlatformError::Unrecognised(other.to_string())),
    }
}

/// Platform information for the current host.
///
/// Built once at startup and passed explicitly to every installer call.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Operating system family.
    pub family: Family,
    /// CPU architecture.
    pub arch: Arch,
    /// Graphical session markers.
    pub session: Session,
    /// Why the family is unsupported, when it is.
    pub note: Option<PlatformError>,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_probe(&HostProbe::gather())
    }

    /// Build a platform from an explicit probe. Never guesses: anything not
    /// positively recognised becomes [`Family::Unsupported`].
    #[must_use]
    pub fn from_probe(probe: &HostProbe) -> Self {
        let (family, note) = match classify_family(probe) {
            Ok(family) => (family, None),
            Err(e) => {
                let id = match &e {
                    PlatformError::Ambiguous { id, .. } | PlatformError::Unrecognised(id) => {
                        id.clone()
                    }
                };
                (Family::Unsupported(id), Some(e))
            }
        };

        let machine = if family == Family::Windows {
            probe.var("PROCESSOR_ARCHITECTURE").unwrap_or(&probe.machine)
        } else {
            &probe.machine
        };

        Self {
            family,
            arch: Arch::from_machine(machine),
            session: Session {
                x11: probe.var("DISPLAY").is_some(),
                wayland: probe.var("WAYLAND_DISPLAY").is_some(),
                desktop: probe.var("XDG_CURRENT_DESKTOP").map(str::to_ascii_lowercase),
            },
            note,
        }
    }

    /// Create a platform with explicit values and no graphical session.
    #[must_use]
    pub fn new(family: Family, arch: Arch) -> Self {
        Self {
            family,
            arch,
            session: Session::default(),
            note: None,
        }
    }

    /// Whether the family is one of the Linux families.
    #[must_use]
    pub const fn is_linux(&self) -> bool {
        self.family.is_linux()
    }

    /// Whether the family is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.family == Family::Windows
    }

    /// `{os}` value used in release asset names.
    #[must_use]
    pub const fn release_os(&self) -> Option<&'static str> {
        match self.family {
            Family::LinuxDebian | Family::LinuxRhel => Some("linux"),
            Family::Macos => Some("darwin"),
            Family::Windows => Some("windows"),
            Family::Unsupported(_) => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.family, self.arch)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn linux_probe(os_release: &str) -> HostProbe {
        HostProbe {
            os: "linux".to_string(),
            os_release: Some(os_release.to_string()),
            machine: "x86_64".to_string(),
            env: HashMap::new(),
        }
    }

    fn with_env(mut probe: HostProbe, key: &str, value: &str) -> HostProbe {
        probe.env.insert(key.to_string(), value.to_string());
        probe
    }

    #[test]
    fn ubuntu_is_debian_family() {
        let p = Platform::from_probe(&linux_probe("NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\n"));
        assert_eq!(p.family, Family::LinuxDebian);
        assert_eq!(p.arch, Arch::X86_64);
        assert!(p.note.is_none());
    }

    #[test]
    fn fedora_is_rhel_family() {
        let p = Platform::from_probe(&linux_probe("ID=fedora\nVERSION_ID=40\n"));
        assert_eq!(p.family, Family::LinuxRhel);
    }

    #[test]
    fn rocky_via_quoted_id() {
        let p = Platform::from_probe(&linux_probe("ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n"));
        assert_eq!(p.family, Family::LinuxRhel);
    }

    #[test]
    fn unknown_id_falls_back_to_id_like() {
        let p = Platform::from_probe(&linux_probe("ID=neon\nID_LIKE=\"ubuntu debian\"\n"));
        assert_eq!(p.family, Family::LinuxDebian);
    }

    #[test]
    fn arch_linux_is_unsupported_not_guessed() {
        let p = Platform::from_probe(&linux_probe("NAME=\"Arch Linux\"\nID=arch\n"));
        assert_eq!(p.family, Family::Unsupported("arch".to_string()));
        assert_eq!(p.family.to_string(), "arch");
        assert!(matches!(p.note, Some(PlatformError::Unrecognised(_))));
    }

    #[test]
    fn conflicting_id_like_fails_closed() {
        let p = Platform::from_probe(&linux_probe("ID=frankenlinux\nID_LIKE=\"debian fedora\"\n"));
        assert_eq!(p.family, Family::Unsupported("frankenlinux".to_string()));
        assert!(matches!(p.note, Some(PlatformError::Ambiguous { .. })));
    }

    #[test]
    fn linux_without_os_release_is_unsupported() {
        let probe = HostProbe {
            os: "linux".to_string(),
            os_release: None,
            machine: "aarch64".to_string(),
            env: HashMap::new(),
        };
        let p = Platform::from_probe(&probe);
        assert!(!p.family.is_supported());
        assert_eq!(p.arch, Arch::Aarch64);
    }

    #[test]
    fn macos_detected_from_os_name() {
        let probe = HostProbe {
            os: "macos".to_string(),
            machine: "aarch64".to_string(),
            ..HostProbe::default()
        };
        let p = Platform::from_probe(&probe);
        assert_eq!(p.family, Family::Macos);
        assert_eq!(p.release_os(), Some("darwin"));
    }

    #[test]
    fn windows_detected_from_ostype_msys() {
        let probe = with_env(
            HostProbe {
                os: "linux".to_string(),
                machine: "x86_64".to_string(),
                ..HostProbe::default()
            },
            "OSTYPE",
            "msys",
        );
        assert_eq!(Platform::from_probe(&probe).family, Family::Windows);
    }

    #[test]
    fn windows_uses_processor_architecture() {
        let probe = with_env(
            with_env(
                HostProbe {
                    os: "windows".to_string(),
                    machine: "x86_64".to_string(),
                    ..HostProbe::default()
                },
                "WINDIR",
                "C:\\Windows",
            ),
            "PROCESSOR_ARCHITECTURE",
            "ARM64",
        );
        let p = Platform::from_probe(&probe);
        assert_eq!(p.family, Family::Windows);
        assert_eq!(p.arch, Arch::Aarch64);
    }

    #[test]
    fn freebsd_is_unsupported() {
        let probe = HostProbe {
            os: "freebsd".to_string(),
            machine: "x86_64".to_string(),
            ..HostProbe::default()
        };
        assert_eq!(
            Platform::from_probe(&probe).family,
            Family::Unsupported("freebsd".to_string())
        );
    }

    #[test]
    fn every_supported_result_is_in_closed_enumeration() {
        let inputs = [
            "ID=debian",
            "ID=ubuntu",
            "ID=centos",
            "ID=amzn",
            "ID=opensuse-tumbleweed\nID_LIKE=\"opensuse suse\"",
            "ID=alpine",
            "garbage without equals",
        ];
        for input in inputs {
            let family = Platform::from_probe(&linux_probe(input)).family;
            match &family {
                Family::Unsupported(_) => assert!(family.key().is_none()),
                supported => {
                    let key = supported.key().unwrap();
                    assert_eq!(Family::from_key(key).as_ref(), Some(supported));
                }
            }
        }
    }

    #[test]
    fn session_markers() {
        let probe = with_env(
            with_env(linux_probe("ID=fedora"), "WAYLAND_DISPLAY", "wayland-0"),
            "XDG_CURRENT_DESKTOP",
            "ubuntu:GNOME",
        );
        let p = Platform::from_probe(&probe);
        assert!(p.session.has_gui());
        assert!(p.session.wayland);
        assert!(!p.session.x11);
        assert!(p.session.is_gnome());
    }

    #[test]
    fn arch_names() {
        assert_eq!(Arch::from_machine("AMD64").release_name(), Some("amd64"));
        assert_eq!(Arch::from_machine("arm64").uname_name(), Some("aarch64"));
        assert_eq!(Arch::from_machine("riscv64").release_name(), None);
        assert_eq!(Arch::from_machine("riscv64").to_string(), "riscv64");
    }

    #[test]
    fn parse_os_release_strips_quotes_and_comments() {
        let fields = parse_os_release("# comment\nPRETTY_NAME=\"Debian GNU/Linux 12\"\nID='debian'\n");
        assert_eq!(fields.get("ID").map(String::as_str), Some("debian"));
        assert_eq!(
            fields.get("PRETTY_NAME").map(String::as_str),
            Some("Debian GNU/Linux 12")
        );
        assert!(!fields.contains_key("# comment"));
    }

    #[test]
    fn platform_display() {
        let p = Platform::new(Family::LinuxDebian, Arch::X86_64);
        assert_eq!(p.to_string(), "linux-debian (x86_64)");
    }
}
