use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

const PB_STYLE: &str = "{spinner:.blue} {prefix:>9.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos:>3}% {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Percentage bar for one job. Hidden automatically when stderr is not a
/// terminal.
pub struct ProgressTracker {
    pb:     ProgressBar,
    finish: Option<String>,
}

impl ProgressTracker {
    pub fn set(&self, percent: u8) { self.pb.set_position(u64::from(percent.min(100))); }

    /// Print `line` to stdout without tearing the bar.
    pub fn println(&self, line: &str) { self.pb.suspend(|| println!("{line}")); }

    pub fn finish(self) {
        match self.finish {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish(),
        }
    }

    pub fn abandon(self) { self.pb.abandon(); }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTrackerBuilder {
    prefix: Option<String>,
    finish: Option<String>,
}

impl ProgressTrackerBuilder {
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn with_finish(mut self, finish: &str) -> Self {
        self.finish = Some(finish.to_string());
        self
    }

    pub fn build(self) -> ProgressTracker {
        let pb = ProgressBar::new(100);
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        if let Some(prefix) = self.prefix {
            pb.set_prefix(prefix);
        }
        ProgressTracker {
            pb,
            finish: self.finish,
        }
    }
}
