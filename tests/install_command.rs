#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These tests exercise the task list produced by [`tasks::install_tasks`]
//! from the built-in catalog, the flag-to-selection mapping, and the abort
//! behaviour of the command runner when a required capability fails.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use clap::Parser;

use devsetup_cli::cli::{Cli, Command, InstallOpts};
use devsetup_cli::commands;
use devsetup_cli::config::{Catalog, Strategy};
use devsetup_cli::logging::TaskStatus;
use devsetup_cli::platform::{Arch, Family, Platform};
use devsetup_cli::tasks::{self, Selection};

use common::{FakeExecutor, StubHttp, TestEnv, ok};

fn install_opts(args: &[&str]) -> InstallOpts {
    match Cli::parse_from(["devsetup", "install"].iter().chain(args)).command {
        Command::Install(opts) => opts,
        other => panic!("expected install, got {other:?}"),
    }
}

fn names(selection: &Selection) -> Vec<String> {
    let catalog = Catalog::builtin().unwrap();
    tasks::install_tasks(&catalog, selection)
        .iter()
        .map(|t| t.name().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshot: full install task list
// ---------------------------------------------------------------------------

/// Snapshot of every install task name, in execution order, with every
/// optional group switched on.
#[test]
fn install_task_names() {
    let opts = install_opts(&[
        "--install-desktop",
        "--install-dev-tools",
        "--ensure-taskbar",
    ]);
    let task_names = names(&commands::install::selection(&opts));
    insta::assert_snapshot!("install_task_names", task_names.join("\n"));
}

// ---------------------------------------------------------------------------
// Structural invariants
// ---------------------------------------------------------------------------

/// No two install tasks may share the same name.
#[test]
fn install_task_names_are_unique() {
    let opts = install_opts(&["--install-desktop", "--install-dev-tools"]);
    let all = names(&commands::install::selection(&opts));
    let mut seen = HashSet::new();
    for name in &all {
        assert!(seen.insert(name.clone()), "duplicate install task: '{name}'");
    }
}

/// Core capabilities come before everything else so later strategies can
/// rely on curl and git.
#[test]
fn core_capabilities_run_first() {
    let all = names(&commands::install::selection(&install_opts(&[])));
    let curl = all.iter().position(|n| n == "curl").unwrap();
    let starship = all.iter().position(|n| n == "starship").unwrap();
    assert!(curl < starship);
    assert_eq!(all.last().map(String::as_str), Some("ansible playbook"));
}

/// Flatpak fallbacks only work once flatpak and the Flathub remote are in
/// place, so both come before every capability that installs from Flathub.
#[test]
fn flathub_precedes_flatpak_installs() {
    let catalog = Catalog::builtin().unwrap();
    let all = names(&commands::install::selection(&install_opts(&[
        "--install-desktop",
        "--install-dev-tools",
    ])));
    let position = |name: &str| {
        all.iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("{name} not scheduled"))
    };
    let flathub = position("flathub");
    assert!(position("flatpak") < flathub);

    let consumers: Vec<&str> = catalog
        .capabilities
        .iter()
        .filter(|cap| {
            cap.install
                .values()
                .flatten()
                .any(|s| matches!(s, Strategy::Flatpak(_)))
        })
        .map(|cap| cap.name.as_str())
        .collect();
    assert!(consumers.contains(&"vscode"));
    assert!(consumers.contains(&"podman-desktop"));
    for name in consumers {
        assert!(flathub < position(name), "{name} runs before flathub");
    }
}

// ---------------------------------------------------------------------------
// Flag filtering
// ---------------------------------------------------------------------------

#[test]
fn default_run_leaves_optional_groups_out() {
    let all = names(&commands::install::selection(&install_opts(&[])));
    assert!(all.contains(&"zsh".to_string()));
    assert!(all.contains(&"nerd-font".to_string()));
    assert!(!all.contains(&"vscode".to_string()));
    assert!(!all.contains(&"kubectl".to_string()));
    assert!(!all.contains(&"desktop settings".to_string()));
}

#[test]
fn skip_flags_remove_groups() {
    let all = names(&commands::install::selection(&install_opts(&[
        "--skip-zsh",
        "--skip-fonts",
        "--skip-ansible",
    ])));
    for gone in ["zsh", "starship", "nerd-font", "ansible", "ansible playbook"] {
        assert!(!all.contains(&gone.to_string()), "{gone} should be skipped");
    }
    assert!(all.contains(&"git".to_string()));
}

#[test]
fn only_flag_restricts_to_named_capabilities() {
    let all = names(&commands::install::selection(&install_opts(&[
        "--only",
        "git,kubectl",
    ])));
    assert_eq!(all, vec!["git", "kubectl"]);
}

#[test]
fn skip_wins_over_only() {
    let all = names(&commands::install::selection(&install_opts(&[
        "--only",
        "git,curl",
        "--skip",
        "curl",
    ])));
    assert_eq!(all, vec!["git"]);
}

// ---------------------------------------------------------------------------
// Abort on required failure
// ---------------------------------------------------------------------------

const TWO_CAPS: &str = r#"
[[capability]]
name = "curl"
required = true
detect = ["curl", "--version"]

[capability.install]
linux-debian = [{ apt = "curl" }]

[[capability]]
name = "jq"
detect = ["jq", "--version"]

[capability.install]
linux-debian = [{ apt = "jq" }]
"#;

/// A required capability on an unsupported distribution stops the run with
/// a message naming both the capability and the distribution.
#[test]
fn required_capability_on_unsupported_platform_aborts() {
    let catalog = Catalog::parse(TWO_CAPS, "test").unwrap();
    let exec = Arc::new(FakeExecutor::new());
    let env = TestEnv::new(
        Platform::new(Family::Unsupported("arch".to_string()), Arch::X86_64),
        Arc::clone(&exec),
        Arc::new(StubHttp::new()),
    );

    let tasks = tasks::install_tasks(&catalog, &Selection::default());
    let err = commands::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &env.ctx, &env.log)
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("curl"), "{message}");
    assert!(message.contains("arch"), "{message}");
    assert_eq!(env.log.failure_count(), 1);
    // jq never ran
    assert_eq!(env.log.entries().len(), 1);
    assert_eq!(exec.count("jq"), 0);
}

/// An optional failure is recorded and the run carries on.
#[test]
fn optional_failure_does_not_abort() {
    let catalog = Catalog::parse(TWO_CAPS, "test").unwrap();
    let exec = Arc::new(
        FakeExecutor::new()
            .on("curl --version", ok("curl 8.5.0"))
            .on("apt-get update", ok(""))
            .on("apt-get install -y jq", common::fail(100, "E: Unable to locate package jq")),
    );
    let env = TestEnv::new(
        Platform::new(Family::LinuxDebian, Arch::X86_64),
        exec,
        Arc::new(StubHttp::new()),
    );

    let tasks = tasks::install_tasks(&catalog, &Selection::default());
    commands::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &env.ctx, &env.log).unwrap();

    assert_eq!(env.log.count(TaskStatus::Ok), 1);
    assert_eq!(env.log.count(TaskStatus::Failed), 1);
}
