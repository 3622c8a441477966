use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT_THEME: OnceLock<Theme> = OnceLock::new();
static STDERR_THEME: OnceLock<Theme> = OnceLock::new();

/// Styles by role in a run report.
#[derive(Debug, Clone)]
pub struct Theme {
    pub banner: Style,
    pub committed: Style,
    pub failed: Style,
    pub caution: Style,
    pub accent: Style,
    pub label: Style,
    pub index: Style,
    pub command: Style,
}

impl Theme {
    /// Colors only when `term` is a terminal and `NO_COLOR` / `CLICOLOR=0` are unset.
    pub fn for_term(term: &console::Term) -> Self {
        if term.is_term() && console::colors_enabled() {
            Self::colored()
        } else {
            Self::plain()
        }
    }

    pub fn colored() -> Self {
        Self {
            banner: Style::new().cyan().bold(),
            committed: Style::new().green().bold(),
            failed: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
            accent: Style::new().magenta(),
            label: Style::new().white().dimmed(),
            index: Style::new().blue().bold(),
            command: Style::new().cyan().underline(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            banner: none,
            committed: none,
            failed: none,
            caution: none,
            accent: none,
            label: none,
            index: none,
            command: none,
        }
    }
}

/// Theme for stdout (progress, summaries, listings).
pub fn theme() -> &'static Theme {
    STDOUT_THEME.get_or_init(|| Theme::for_term(&console::Term::stdout()))
}

/// Theme for stderr (warnings, failure reports).
pub fn err_theme() -> &'static Theme {
    STDERR_THEME.get_or_init(|| Theme::for_term(&console::Term::stderr()))
}
