//! A single colored, carriage-return-terminated progress line per
//! node, written to stderr as scope values complete.
//!
//! Grounded on `color.rs`'s `should_colorize` (`NO_COLOR`/`COLOR` env
//! plus a TTY check, no external color crate) and `_print_progression`
//! (percentage plus a `\r` so the line overwrites itself).

use std::io::{IsTerminal, Write};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";
/// Clear to end of line, then carriage return, matches `settings.RETURN`.
const RETURN: &str = "\x1b[K\r";

fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stderr().is_terminal()
}

/// Print (or overwrite) one node's progress line.
pub fn print_progress(description: &str, fraction: f64, is_ok: bool) {
    let percent = (fraction * 100.0).round();
    let mut stderr = std::io::stderr();
    if should_colorize() {
        let color = if is_ok { GREEN } else { RED };
        let _ = write!(stderr, "{color}{description}: {percent:.0}%{RESET}{RETURN}");
    } else {
        let _ = write!(stderr, "{description}: {percent:.0}%{RETURN}");
    }
    let _ = stderr.flush();
}

/// Print the trailing newline once a node's run has finished.
pub fn finish_progress() {
    let _ = writeln!(std::io::stderr());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_panic_without_a_terminal() {
        std::env::set_var("NO_COLOR", "1");
        print_progress("build", 0.5, true);
        finish_progress();
        std::env::remove_var("NO_COLOR");
    }
}
