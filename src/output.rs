//! Output switches read from the environment once per process.

use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `SQLSTEP_QUIET` set to `1`, `true`, `yes` or `on` hides the progress bar.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| flag_enabled(std::env::var("SQLSTEP_QUIET").ok().as_deref()))
}

/// A live progress bar is drawn only on an interactive stdout.
pub fn progress_enabled() -> bool {
    !is_quiet() && console::Term::stdout().is_term()
}

fn flag_enabled(value: Option<&str>) -> bool {
    match value {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => false,
    }
}
