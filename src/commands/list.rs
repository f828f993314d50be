//! Command: list the capabilities that apply to this platform.
use std::fmt::Write as _;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Log;

/// Print the capability table to stdout.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    print!("{}", render(&setup.catalog, &setup.platform));
    Ok(())
}

/// Render one line per applicable capability: name, group, whether it is
/// required, and the strategy chain for the platform family.
#[must_use]
pub fn render(catalog: &crate::config::Catalog, platform: &crate::platform::Platform) -> String {
    let rows: Vec<_> = catalog.applicable(platform).collect();
    let width = rows.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for cap in rows {
        let chain = cap
            .strategies_for(&platform.family)
            .iter()
            .map(crate::config::Strategy::kind)
            .collect::<Vec<_>>();
        let chain = if chain.is_empty() {
            "(none)".to_string()
        } else {
            chain.join(" -> ")
        };
        let _ = writeln!(
            out,
            "{:<width$}  {:<9}  {:<8}  {chain}",
            cap.name,
            cap.group.as_str(),
            if cap.required { "required" } else { "optional" },
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Catalog;
    use crate::platform::{Arch, Family, Platform};

    #[test]
    fn debian_lists_apt_for_git() {
        let catalog = Catalog::builtin().unwrap();
        let out = render(&catalog, &Platform::new(Family::LinuxDebian, Arch::X86_64));
        let git = out.lines().find(|l| l.starts_with("git ")).unwrap();
        assert!(git.contains("required"));
        assert!(git.contains("apt"));
    }

    #[test]
    fn unsupported_family_has_no_strategies() {
        let catalog = Catalog::builtin().unwrap();
        let out = render(
            &catalog,
            &Platform::new(Family::Unsupported("arch".to_string()), Arch::X86_64),
        );
        let curl = out.lines().find(|l| l.starts_with("curl ")).unwrap();
        assert!(curl.ends_with("(none)"));
    }
}
