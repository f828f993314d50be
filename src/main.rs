use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use devsetup_cli::cli::{Cli, Command};
use devsetup_cli::commands;
use devsetup_cli::logging::{Logger, init_subscriber};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let name = args.command.log_name();
    init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));

    match args.command {
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Detect => {
            commands::detect::run();
            Ok(())
        }
        Command::List => commands::list::run(&args.global, log.as_ref()),
        Command::TroubleshootMinikube => commands::troubleshoot::run(&args.global, &log),
        Command::Completions(opts) => {
            commands::completions::run(opts.shell);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
