use crate::output::progress_enabled;
use crate::ui::progress_message::ProgressMessage;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Progress bar for statement execution, fed from the engine over a channel.
pub struct RunProgress {
    bar: ProgressBar,
    handle: Option<thread::JoinHandle<()>>,
}

impl RunProgress {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let bar = if progress_enabled() {
            let bar = ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}") {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started {
                        total,
                        pending: _,
                        resume_from,
                    } => {
                        bar_clone.set_length(total as u64);
                        bar_clone.set_position(resume_from as u64);
                        bar_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Executing { index, preview } => {
                        bar_clone.set_message(format!("#{} {}", index, preview));
                    }
                    ProgressMessage::Committed { index: _ } => {
                        bar_clone.inc(1);
                    }
                    ProgressMessage::Failed { index } => {
                        bar_clone.abandon_with_message(format!("Failed at #{}", index));
                    }
                    ProgressMessage::Finished => {
                        bar_clone.finish_with_message("Done");
                    }
                }
            }
        });

        (
            Self {
                bar,
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Wait for the UI thread to drain once every sender is dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
        self.bar.finish_and_clear();
    }

    pub fn finish_with_summary(self, elapsed: Duration, executed: usize, skipped: usize) {
        self.join();
        println!();
        println!(
            "{} {}",
            Icons::COMMITTED.style(theme().committed),
            format!("Complete in {}", HumanDuration(elapsed)).style(theme().committed)
        );
        println!(
            "  {} {} executed  {} {} skipped",
            Icons::SCRIPT.style(theme().accent),
            executed,
            Icons::SKIP.style(theme().accent),
            skipped
        );
    }
}
