use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::exec::SystemExecutor;
use crate::installer::download::UreqClient;
use crate::logging::{Log, Logger};
use crate::tasks::{self, Context, Selection};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, `HOME` is unset, or a
/// required capability cannot be provisioned.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    if opts.troubleshoot_minikube {
        return super::troubleshoot::run(global, log);
    }

    log.info(&format!("devsetup {}", super::version::version()));

    let setup = super::CommandSetup::init(global, log.as_ref())?;
    let ctx = Context::new(
        Arc::new(setup.platform),
        Arc::clone(log) as Arc<dyn Log>,
        global.dry_run,
        Arc::new(SystemExecutor),
        Arc::new(UreqClient::new()),
    )?;

    let tasks = tasks::install_tasks(&setup.catalog, &selection(opts));
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}

/// Map install flags onto a task selection.
#[must_use]
pub fn selection(opts: &InstallOpts) -> Selection {
    Selection {
        skip_zsh: opts.skip_zsh,
        skip_fonts: opts.skip_fonts,
        install_desktop: opts.install_desktop,
        install_dev_tools: opts.install_dev_tools,
        ensure_taskbar: opts.ensure_taskbar,
        ansible_playbook: (!opts.skip_ansible).then(|| opts.ansible_script.clone()),
        only: opts.only.clone(),
        skip: opts.skip.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;

    fn opts(args: &[&str]) -> InstallOpts {
        match Cli::parse_from(["devsetup", "install"].iter().chain(args)).command {
            Command::Install(opts) => opts,
            other => panic!("expected install, got {other:?}"),
        }
    }

    #[test]
    fn ansible_runs_by_default() {
        let selection = selection(&opts(&[]));
        assert_eq!(
            selection.ansible_playbook,
            Some(PathBuf::from("playbook.yml"))
        );
    }

    #[test]
    fn skip_ansible_drops_playbook() {
        assert!(selection(&opts(&["--skip-ansible"])).ansible_playbook.is_none());
    }

    #[test]
    fn flags_carry_over() {
        let s = selection(&opts(&["--skip-zsh", "--install-dev-tools", "--only", "git"]));
        assert!(s.skip_zsh);
        assert!(s.install_dev_tools);
        assert!(!s.install_desktop);
        assert_eq!(s.only, ["git"]);
    }
}
