//! Version extraction from `--version` style output.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));

#[allow(clippy::expect_used)]
static BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bv?(\d+)\b").expect("valid regex"));

/// A `major.minor.patch` version; missing components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl Version {
    /// Extract the first version-looking token from free-form output.
    ///
    /// `git version 2.43.0` → `2.43.0`, `v20.11.1` → `20.11.1`,
    /// `Python 3.12` → `3.12.0`. Dotted forms win over bare numbers.
    #[must_use]
    pub fn extract(output: &str) -> Option<Self> {
        let num = |m: Option<regex::Match<'_>>| -> Option<u64> {
            m.map_or(Some(0), |m| m.as_str().parse().ok())
        };

        if let Some(caps) = DOTTED.captures(output) {
            return Some(Self {
                major: num(caps.get(1))?,
                minor: num(caps.get(2))?,
                patch: num(caps.get(3))?,
            });
        }
        let caps = BARE.captures(output)?;
        Some(Self {
            major: num(caps.get(1))?,
            minor: 0,
            patch: 0,
        })
    }

    /// Parse a declared minimum such as `"2.20"` or `"18"`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Self::extract(text.trim())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
