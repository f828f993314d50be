//! Catalog sanity checks that produce warnings rather than hard errors.
use std::collections::HashSet;
use std::fmt;

use super::{Capability, Catalog, ConfigStep, Strategy};
use crate::platform::Family;

/// A problem found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Capability name (or `desktop`).
    pub item: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationWarning {
    fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.message)
    }
}

/// Check the whole catalog.
#[must_use]
pub fn validate(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for cap in &catalog.capabilities {
        if !seen.insert(cap.name.as_str()) {
            warnings.push(ValidationWarning::new(&cap.name, "duplicate capability name"));
        }
        check_capability(cap, &mut warnings);
    }

    for setting in &catalog.desktop {
        if setting.schema.trim().is_empty() || setting.key.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                "desktop",
                format!("setting with empty schema or key (value {})", setting.value),
            ));
        }
    }

    warnings
}

fn check_capability(cap: &Capability, warnings: &mut Vec<ValidationWarning>) {
    if cap.detect.first().is_none_or(|p| p.trim().is_empty()) {
        warnings.push(ValidationWarning::new(&cap.name, "empty detection command"));
    }

    for family in &cap.only {
        if Family::from_key(family).is_none() {
            warnings.push(ValidationWarning::new(
                &cap.name,
                format!("unknown family '{family}' in only"),
            ));
        }
    }

    for (family, strategies) in &cap.install {
        if Family::from_key(family).is_none() {
            warnings.push(ValidationWarning::new(
                &cap.name,
                format!("unknown family '{family}' in install"),
            ));
        }
        if !cap.only.is_empty() && !cap.only.contains(family) {
            warnings.push(ValidationWarning::new(
                &cap.name,
                format!("install strategies for '{family}' are unreachable (not in only)"),
            ));
        }
        for strategy in strategies {
            if let Some(problem) = strategy_problem(strategy) {
                warnings.push(ValidationWarning::new(
                    &cap.name,
                    format!("{family}: {problem}"),
                ));
            }
        }
    }

    if cap.required && cap.install.values().all(Vec::is_empty) {
        warnings.push(ValidationWarning::new(
            &cap.name,
            "required capability has no install strategy on any platform",
        ));
    }

    for entry in &cap.configure {
        if let ConfigStep::Command { command, .. } = &entry.step
            && command.first().is_none_or(|p| p.trim().is_empty())
        {
            warnings.push(ValidationWarning::new(
                &cap.name,
                "command step with empty argv",
            ));
        }
        for family in &entry.only {
            if Family::from_key(family).is_none() {
                warnings.push(ValidationWarning::new(
                    &cap.name,
                    format!("unknown family '{family}' in {} step", entry.step.kind()),
                ));
            }
        }
    }
}

fn strategy_problem(strategy: &Strategy) -> Option<String> {
    match strategy {
        Strategy::Apt(p)
        | Strategy::Dnf(p)
        | Strategy::Yum(p)
        | Strategy::Brew(p)
        | Strategy::BrewCask(p)
        | Strategy::Choco(p)
        | Strategy::Scoop(p)
        | Strategy::Pip(p)
        | Strategy::Flatpak(p) => p
            .names()
            .iter()
            .any(|n| n.trim().is_empty())
            .then(|| format!("{} strategy with an empty package name", strategy.kind())),
        Strategy::Command(argv) => argv
            .is_empty()
            .then(|| "command strategy with empty argv".to_string()),
        Strategy::Download(d) => {
            if d.url.contains("{version}") && d.github.is_none() {
                Some("download url uses {version} without a github repo".to_string())
            } else {
                d.sha256
                    .as_ref()
                    .filter(|h| h.len() != 64 || !h.chars().all(|c| c.is_ascii_hexdigit()))
                    .map(|_| "sha256 is not 64 hex characters".to_string())
            }
        }
        Strategy::Archive(a) => (a.url.contains("{version}") && a.github.is_none())
            .then(|| "archive url uses {version} without a github repo".to_string()),
        Strategy::Script(s) => (!s.url.starts_with("https://"))
            .then(|| format!("script url is not https: {}", s.url)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn catalog(src: &str) -> Catalog {
        Catalog::parse(src, "test").unwrap()
    }

    #[test]
    fn clean_catalog_has_no_warnings() {
        let c = catalog(
            r#"
            [[capability]]
            name = "git"
            required = true
            detect = ["git", "--version"]
            [capability.install]
            linux-debian = [{ apt = "git" }]
            "#,
        );
        assert!(validate(&c).is_empty());
    }

    #[test]
    fn duplicate_names_are_reported() {
        let c = catalog(
            r#"
            [[capability]]
            name = "git"
            detect = ["git"]
            [[capability]]
            name = "git"
            detect = ["git"]
            "#,
        );
        let w = validate(&c);
        assert_eq!(w.len(), 1);
        assert!(w[0].message.contains("duplicate"));
    }

    #[test]
    fn required_without_strategies_is_reported() {
        let c = catalog(
            r#"
            [[capability]]
            name = "curl"
            required = true
            detect = ["curl", "--version"]
            "#,
        );
        let w = validate(&c);
        assert!(w.iter().any(|w| w.message.contains("no install strategy")));
    }

    #[test]
    fn unknown_families_and_empty_detect_are_reported() {
        let c = catalog(
            r#"
            [[capability]]
            name = "odd"
            detect = []
            only = ["plan9"]
            [capability.install]
            beos = [{ command = [] }]
            "#,
        );
        let text: Vec<String> = validate(&c).iter().map(ToString::to_string).collect();
        assert!(text.iter().any(|t| t.contains("empty detection")));
        assert!(text.iter().any(|t| t.contains("'plan9' in only")));
        assert!(text.iter().any(|t| t.contains("'beos' in install")));
        assert!(text.iter().any(|t| t.contains("empty argv")));
    }

    #[test]
    fn bad_checksum_and_missing_github_are_reported() {
        let c = catalog(
            r#"
            [[capability]]
            name = "tool"
            detect = ["tool"]
            [capability.install]
            linux-debian = [
              { download = { url = "https://x/{version}/tool", dest = "~/.local/bin/tool" } },
              { download = { url = "https://x/tool", dest = "~/.local/bin/tool", sha256 = "xyz" } },
            ]
            "#,
        );
        let w = validate(&c);
        assert_eq!(w.len(), 2);
        assert!(w[0].message.contains("without a github repo"));
        assert!(w[1].message.contains("sha256"));
    }

    #[test]
    fn empty_configure_command_is_reported() {
        let c = catalog(
            r#"
            [[capability]]
            name = "k3s"
            detect = ["k3s", "--version"]
            [[capability.configure]]
            kind = "command"
            command = []
            "#,
        );
        let w = validate(&c);
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].to_string(), "k3s: command step with empty argv");
    }
}
