use crate::ui::theme::{err_theme, theme};
use crate::ui::Icons;
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::RUN, text.style(theme().banner));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().label), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::COMMITTED, label.style(theme().committed));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::CAUTION, label.style(err_theme().caution));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::NOTE.style(theme().accent),
        label.style(theme().label),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().banner));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().label), value);
}

/// An indexed statement, as listed by `sqlstep split`.
pub fn statement(index: usize, sql: &str) {
    println!("{}", format!("[{}]", index).style(theme().index));
    for line in sql.lines() {
        println!("    {}", line);
    }
}

/// The failing statement and the exact command that resumes at it.
pub fn failure_report(index: usize, sql: &str, resume_command: &str) {
    let t = err_theme();
    eprintln!();
    eprintln!(
        "{} {}",
        Icons::FAILED,
        format!("Statement #{} failed:", index).style(t.failed)
    );
    for line in sql.lines() {
        eprintln!("    {}", line.style(t.label));
    }
    eprintln!();
    eprintln!(
        "{} Fix the data or script, then resume with:\n    {}",
        Icons::RESUME,
        resume_command.style(t.command)
    );
}
