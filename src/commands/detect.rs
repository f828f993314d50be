//! Command: print the detected platform.
use std::fmt::Write as _;

use crate::platform::Platform;

/// Print the platform report to stdout.
pub fn run() {
    println!("{}", report(&Platform::detect()));
}

/// Render the platform report.
#[must_use]
pub fn report(platform: &Platform) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "family:  {}", platform.family);
    let _ = writeln!(out, "arch:    {}", platform.arch);
    let session = match (platform.session.wayland, platform.session.x11) {
        (true, _) => "wayland",
        (false, true) => "x11",
        (false, false) => "none",
    };
    let _ = write!(out, "session: {session}");
    if let Some(desktop) = &platform.session.desktop {
        let _ = write!(out, " ({desktop})");
    }
    if let Some(note) = &platform.note {
        let _ = write!(out, "\nnote:    {note}");
    }
    out
}
