//! Application UI. For now, this is progress bars, the end-of-run summary,
//! and keeping log output from scribbling over either of them.
//!
//! This is adapted from `substudy` by Eric Kidd, which is licensed under
//! Apache-2.0 OR MIT. Used with permission.

use std::{
    borrow::Cow,
    io::{self, Write as _},
    sync::Arc,
    time::Duration,
};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::{
    pipeline::{BatchSummary, ProgressReporter, SummaryReporter},
    prelude::*,
};

/// Application UI state.
#[derive(Clone)]
pub struct Ui {
    /// Our progress bars.
    multi_progress: Arc<MultiProgress>,
}

impl Ui {
    /// Create a new UI. This sets up logging and and progress bars.
    pub fn init() -> Ui {
        let multi_progress =
            Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::stderr()));
        Ui { multi_progress }
    }

    /// Create a new UI for unit tests.
    #[cfg(test)]
    pub fn init_for_tests() -> Ui {
        let multi_progress =
            Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()));
        Ui { multi_progress }
    }

    /// Get a writer than can be used to write to stderr, for use with `tracing`
    /// and other output code.
    pub fn get_stderr_writer(&self) -> SafeStderrWriter {
        SafeStderrWriter { ui: self.clone() }
    }

    /// Get a reference to our progress bars.
    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi_progress
    }

    /// Create a new progress bar with default settings.
    pub fn new_progress_bar(&self, config: &ProgressConfig<'_>, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len).with_style(default_progress_style());
        let pb = self.multi_progress.add(pb);
        #[cfg(test)]
        pb.set_draw_target(ProgressDrawTarget::hidden());
        pb.set_prefix(config.emoji.to_owned());
        pb.set_message(config.msg.to_owned());
        pb.enable_steady_tick(Duration::from_millis(250));
        pb.with_finish(indicatif::ProgressFinish::WithMessage(Cow::Owned(
            config.done_msg.to_owned(),
        )))
    }
}

/// Configuration for a progress bar.
pub struct ProgressConfig<'a> {
    /// Emoji to display in the progress bar.
    pub emoji: &'a str,
    /// Message to display in a running progress bar.
    pub msg: &'a str,
    /// Message to display in a progress bar when it is done.
    pub done_msg: &'a str,
}

fn default_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {prefix:3}{msg:25} {pos:>4}/{len:4} {elapsed_precise} {wide_bar:.cyan/blue} {eta_precise}")
        .expect("bad progress bar template")
}

impl ProgressReporter for ProgressBar {
    fn on_progress(&self, completed: usize, total: usize) {
        self.set_length(total as u64);
        self.set_position(completed as u64);
        if completed == total {
            self.finish_using_style();
        }
    }
}

/// Prints the end-of-run summary to standard output.
pub struct ConsoleSummary {
    ui: Ui,
}

impl ConsoleSummary {
    pub fn new(ui: Ui) -> Self {
        Self { ui }
    }

    /// Render the summary as text.
    fn render(summary: &BatchSummary, input_dir: &Path, output_dir: &Path) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", style("Processing complete!").bold()));
        out.push_str(&format!("  Input directory:  {}\n", input_dir.display()));
        out.push_str(&format!("  Output directory: {}\n", output_dir.display()));

        out.push_str(&format!("Processed files: {}\n", summary.processed.len()));
        for path in &summary.processed {
            out.push_str(&format!("  {} {}\n", style("✓").green(), path.display()));
        }

        if !summary.skipped.is_empty() {
            out.push_str(&format!("Skipped files: {}\n", summary.skipped.len()));
            for skipped in &summary.skipped {
                out.push_str(&format!(
                    "  {} {} ({})\n",
                    style("-").yellow(),
                    skipped.path.display(),
                    skipped.reason
                ));
            }
        }

        if summary.errors.is_empty() {
            out.push_str("Errors: None\n");
        } else {
            out.push_str(&format!("Errors: {}\n", summary.errors.len()));
            for failed in &summary.errors {
                out.push_str(&format!("  {} {}\n", style("✗").red(), failed.detail));
            }
        }
        out
    }
}

impl SummaryReporter for ConsoleSummary {
    fn on_complete(&self, summary: &BatchSummary, input_dir: &Path, output_dir: &Path) {
        let text = Self::render(summary, input_dir, output_dir);
        self.ui.multi_progress().suspend(|| print!("{}", text));
    }
}

/// A writer which can used to write to `stderr`. It will hide and show progress
/// bars as needed, so that they don't interfere with the output.
#[derive(Clone)]
pub struct SafeStderrWriter {
    ui: Ui,
}

// The `tracing-indicatif` crate suggests that we should implement the following
// methods.
impl io::Write for SafeStderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.multi_progress().suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.multi_progress().suspend(|| io::stderr().flush())
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_vectored(bufs))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_all(buf))
    }

    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_fmt(fmt))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SafeStderrWriter {
    type Writer = SafeStderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
