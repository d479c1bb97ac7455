use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Progress over records written to the store
pub struct IngestProgress {
    pb: ProgressBar,
}

impl IngestProgress {
    pub fn new(total_records: usize) -> Self {
        let pb = if console::Term::stdout().is_term() && !crate::output::is_quiet() {
            ProgressBar::new(total_records as u64).with_message("Writing records")
        } else {
            ProgressBar::hidden()
        };
        Self { pb }
    }

    pub fn inc(&self, records: usize) {
        self.pb.inc(records as u64);
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_summary(&self, duration: Duration, records: usize, batches: usize) {
        self.pb.finish_and_clear();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {} records  {} {} batches",
            Icons::FILE.style(theme().info.clone()),
            records,
            Icons::PACKAGE.style(theme().info.clone()),
            batches
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if console::Term::stdout().is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
