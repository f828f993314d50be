pub mod completions;
pub mod detect;
pub mod install;
pub mod list;
pub mod troubleshoot;
pub mod version;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Catalog;
use crate::config::validation::validate;
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::tasks::{self, Context, Task};

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected host platform.
    pub platform: Platform,
    /// Built-in or `--catalog` catalog.
    pub catalog: Catalog,
}

impl CommandSetup {
    /// Detect the platform and load the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or parsed.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let platform = Platform::detect();
        log.info(&format!("platform: {platform}"));
        if let Some(note) = &platform.note {
            log.warn(&format!("{note}; only unrestricted capabilities will be attempted"));
        }

        let catalog = Catalog::resolve(global.catalog.as_deref())?;
        log.debug(&format!(
            "{} capabilities, {} desktop settings",
            catalog.capabilities.len(),
            catalog.desktop.len()
        ));
        report_warnings(&catalog, log);

        Ok(Self { platform, catalog })
    }
}

/// Log catalog validation warnings, if any.
pub fn report_warnings(catalog: &Catalog, log: &dyn Log) {
    let warnings = validate(catalog);
    if warnings.is_empty() {
        return;
    }
    log.warn(&format!("found {} catalog warning(s):", warnings.len()));
    for warning in &warnings {
        log.warn(&format!("  {warning}"));
    }
}

/// Execute every task in order and print the summary.
///
/// Stops at the first failed required task.
///
/// # Errors
///
/// Returns an error naming the required task that failed and why.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        if let Err(e) = tasks::execute(task, ctx) {
            log.print_summary();
            return Err(e.context(format!("required capability '{}' failed", task.name())));
        }
    }

    log.print_summary();
    Ok(())
}
