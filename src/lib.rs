//! Developer workstation bootstrapper.
//!
//! Detects the host platform, then walks a declarative capability catalog
//! (`conf/capabilities.toml`): each capability is detected, installed through
//! the first working strategy for the platform family, verified, and then
//! configured with idempotent resources.
//!
//! The public API is organised into layers:
//!
//! - **[`platform`]**: OS family, architecture and graphical session
//! - **[`config`]**: parse and validate the capability catalog
//! - **[`installer`]**: detect, plan, install and verify one capability
//! - **[`resources`]**: idempotent `current_state + apply` configuration primitives
//! - **[`tasks`]**: named units of work wired to the installer and resources
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `detect`, …)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod installer;
pub mod logging;
pub mod platform;
pub mod resources;
pub mod tasks;
