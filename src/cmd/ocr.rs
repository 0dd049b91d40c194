//! The `ocr` subcommand.

use std::sync::Arc;

use clap::Args;

use crate::{
    async_utils::io::write_json,
    config::ToolOpts,
    passwords::{CliPasswordPrompt, PasswordBook},
    pipeline::{
        BatchProcessor, BatchSummary, CancelFlag, SummaryReporter as _,
        discover_input_files, ensure_output_dir_writable,
    },
    prelude::*,
    ui::{ConsoleSummary, ProgressConfig, Ui},
};

/// Options for the `ocr` subcommand.
#[derive(Args, Clone, Debug)]
pub struct OcrOpts {
    /// Directory containing the PDFs to OCR. Subdirectories are ignored.
    pub input_dir: PathBuf,

    /// Directory to write `ocr_*.pdf` files to. Created if needed.
    pub output_dir: PathBuf,

    #[clap(flatten)]
    pub tools: ToolOpts,

    /// A TOML or JSON table mapping file names to passwords. Consulted before
    /// prompting.
    #[clap(long)]
    pub passwords: Option<PathBuf>,

    /// Never ask for passwords on the terminal.
    #[clap(long)]
    pub no_prompt: bool,

    /// Also write the summary to this file as JSON.
    #[clap(long)]
    pub summary_json: Option<PathBuf>,

    /// What portion of inputs should we allow to fail? Specified as a
    /// number between 0.0 and 1.0.
    #[clap(long, default_value = "1.0")]
    pub allowed_failure_rate: f32,
}

/// The `ocr` subcommand.
#[instrument(level = "debug", skip_all, fields(input_dir = %opts.input_dir.display()))]
pub async fn cmd_ocr(ui: Ui, opts: &OcrOpts) -> Result<()> {
    let config = opts.tools.load().await?;

    // Check everything that would stop the whole batch before we start.
    let inputs = discover_input_files(&opts.input_dir).await?;
    ensure_output_dir_writable(&opts.output_dir).await?;

    let book = match &opts.passwords {
        Some(path) => PasswordBook::load(path).await?,
        None => PasswordBook::default(),
    };
    let prompt_ui = (!opts.no_prompt).then(|| ui.clone());
    let prompt = Arc::new(CliPasswordPrompt::new(book, prompt_ui));

    let pb = ui.new_progress_bar(
        &ProgressConfig {
            emoji: "📄",
            msg: "OCRing files",
            done_msg: "OCRed files",
        },
        inputs.len() as u64,
    );

    let cancel = CancelFlag::new();
    let processor =
        BatchProcessor::from_config(&config, prompt).with_cancel_flag(cancel.clone());

    // Losing the race drops the batch, which deletes any decrypted copy and
    // staging file and kills the running tool.
    let summary = tokio::select! {
        summary = processor.run(&inputs, &opts.output_dir, &pb) => summary,
        () = second_interrupt(cancel) => {
            pb.abandon();
            return Err(anyhow!("interrupted twice, abandoned the current file"));
        }
    };
    pb.finish_using_style();

    ConsoleSummary::new(ui).on_complete(&summary, &opts.input_dir, &opts.output_dir);

    if let Some(path) = &opts.summary_json {
        write_json(path, &summary)
            .await
            .with_context(|| format!("cannot write summary to {:?}", path))?;
    }

    check_failure_rate(&summary, opts.allowed_failure_rate)
}

/// Wait for Ctrl-C twice. The first asks `cancel` to stop the batch after the
/// current file.
async fn second_interrupt(cancel: CancelFlag) {
    if tokio::signal::ctrl_c().await.is_err() {
        return std::future::pending().await;
    }
    warn!("Interrupted, stopping after the current file (press Ctrl-C again to abandon it)");
    cancel.cancel();
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fail if too many files could not be processed.
fn check_failure_rate(summary: &BatchSummary, allowed_failure_rate: f32) -> Result<()> {
    let failure_rate = summary.failure_rate();
    if failure_rate > allowed_failure_rate {
        Err(anyhow!(
            "{}/{} ({:.2}%) of files failed, but only {:.2}% were allowed",
            summary.errors.len(),
            summary.total(),
            failure_rate * 100.0,
            allowed_failure_rate * 100.0
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::ProcessingOutcome;

    use super::*;

    fn half_failed() -> BatchSummary {
        let mut summary = BatchSummary::default();
        summary.record(ProcessingOutcome::Processed {
            path: PathBuf::from("a.pdf"),
        });
        summary.record(ProcessingOutcome::Failed {
            path: PathBuf::from("b.pdf"),
            detail: "Failed to decrypt b.pdf".to_owned(),
        });
        summary
    }

    #[test]
    fn failure_rate_within_limit_is_ok() {
        assert!(check_failure_rate(&half_failed(), 1.0).is_ok());
        assert!(check_failure_rate(&half_failed(), 0.5).is_ok());
    }

    #[test]
    fn failure_rate_over_limit_is_an_error() {
        let err = check_failure_rate(&half_failed(), 0.1).unwrap_err();
        assert!(err.to_string().starts_with("1/2 (50.00%)"), "{err}");
    }

    #[tokio::test]
    async fn missing_input_directory_stops_before_creating_output() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let opts = OcrOpts {
            input_dir: dir.path().join("missing"),
            output_dir: dir.path().join("out"),
            tools: ToolOpts::default(),
            passwords: None,
            no_prompt: true,
            summary_json: None,
            allowed_failure_rate: 1.0,
        };
        let result = cmd_ocr(Ui::init_for_tests(), &opts).await;
        assert!(result.is_err());
        assert!(!dir.path().join("out").exists());
        Ok(())
    }
}
