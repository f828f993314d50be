//! Command-line surface: subcommands, flags and their defaults.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the workstation bootstrapper.
#[derive(Parser, Debug)]
#[command(
    name = "devsetup",
    about = "Cross-platform developer workstation bootstrapper",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Flags accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Use this capability catalog instead of the built-in one
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install and configure the developer toolchain
    Install(InstallOpts),
    /// Print the detected platform
    Detect,
    /// List catalog capabilities that apply to this platform
    List,
    /// Diagnose and start a local minikube cluster
    TroubleshootMinikube,
    /// Print a shell completion script
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Detect => "detect",
            Self::List => "list",
            Self::TroubleshootMinikube => "troubleshoot-minikube",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct InstallOpts {
    /// Do not install Ansible or run the playbook
    #[arg(long)]
    pub skip_ansible: bool,

    /// Leave zsh, the prompt and the login shell alone
    #[arg(long)]
    pub skip_zsh: bool,

    /// Do not install fonts
    #[arg(long)]
    pub skip_fonts: bool,

    /// Install desktop applications and apply desktop settings
    #[arg(long)]
    pub install_desktop: bool,

    /// Install developer and Kubernetes tooling
    #[arg(long)]
    pub install_dev_tools: bool,

    /// Apply taskbar/dock settings
    #[arg(long)]
    pub ensure_taskbar: bool,

    /// Only diagnose minikube, then exit
    #[arg(long)]
    pub troubleshoot_minikube: bool,

    /// Playbook passed to ansible-playbook
    #[arg(long, value_name = "PATH", default_value = "playbook.yml")]
    pub ansible_script: PathBuf,

    /// Run only these capabilities
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub only: Vec<String>,

    /// Skip these capabilities
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub skip: Vec<String>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
