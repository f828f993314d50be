//! Log file location, ANSI stripping and timestamp helpers.
use std::fs;
use std::path::PathBuf;

/// Strip ANSI CSI escape sequences (colours, cursor movement) from a string.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        }
    }
    out
}

/// `$XDG_CACHE_HOME/devsetup/` (or `~/.cache/devsetup/`), created on demand.
pub(super) fn cache_dir() -> Option<PathBuf> {
    let base = std::env::var("XDG_CACHE_HOME").map_or_else(
        |_| {
            std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .map_or_else(|_| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = base.join("devsetup");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Path of the run log for `command`.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    Some(cache_dir()?.join(format!("{command}.log")))
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time as `HH:MM:SS`.
pub(super) fn utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_colours() {
        assert_eq!(strip_ansi("\x1b[31mERROR\x1b[0m boom"), "ERROR boom");
        assert_eq!(
            strip_ansi("\x1b[1;34m==>\x1b[0m \x1b[1mInstall\x1b[0m"),
            "==> Install"
        );
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn strip_ansi_handles_cursor_sequences() {
        assert_eq!(strip_ansi("\x1b[2Kline"), "line");
        assert_eq!(strip_ansi("\x1b[3;4Hx"), "x");
        assert_eq!(strip_ansi(""), "");
    }

    #[test]
    fn timestamp_formats() {
        let t = utc_time();
        assert_eq!(t.len(), 8);
        assert_eq!(&t[2..3], ":");
        let dt = utc_datetime();
        assert_eq!(dt.len(), 19);
        assert_eq!(&dt[10..11], " ");
    }
}
