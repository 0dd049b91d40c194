//! Running the external OCR tool.

use std::{process::Stdio, time::Duration};

use tempfile::TempPath;
use tokio::process::Command;

use crate::{
    async_utils::{detach_from_terminal_signals, log_command_output},
    config::ToolConfig,
    prelude::*,
};

use super::error::OcrError;

/// Interface for OCRing one PDF into another.
#[async_trait]
pub trait OcrInvoker: Send + Sync + 'static {
    /// OCR `input`, writing a searchable PDF to `output`.
    ///
    /// This must never leave a partial file at `output`, and must not
    /// overwrite an existing one.
    async fn run(&self, input: &Path, output: &Path) -> Result<(), OcrError>;
}

/// [`OcrInvoker`] wrapping the `ocrmypdf` CLI tool.
pub struct OcrMyPdfInvoker {
    /// The `ocrmypdf` executable.
    program: PathBuf,
    /// Extra arguments to pass before our standard ones.
    extra_args: Vec<String>,
    /// How long to wait before killing the tool.
    timeout: Option<Duration>,
}

impl OcrMyPdfInvoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: vec![],
            timeout: None,
        }
    }

    /// Create an invoker from our tool configuration.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            extra_args: config.ocrmypdf_extra_args.clone(),
            timeout: config.ocr_timeout(),
            ..Self::new(config.ocrmypdf.clone())
        }
    }

    /// Build the command line for one file.
    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .arg("--force-ocr")
            .arg("--output-type")
            .arg("pdf")
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        detach_from_terminal_signals(&mut cmd);
        cmd
    }
}

/// Create an empty staging file in the same directory as `output`, so that
/// we can rename it into place atomically.
fn staging_path_for(output: &Path) -> Result<TempPath, OcrError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|source| OcrError::Publish {
            path: output.to_owned(),
            source,
        })?;
    Ok(file.into_temp_path())
}

#[async_trait]
impl OcrInvoker for OcrMyPdfInvoker {
    #[instrument(level = "debug", skip_all, fields(input = %input.display(), output = %output.display()))]
    async fn run(&self, input: &Path, output: &Path) -> Result<(), OcrError> {
        // Dropping `staging` deletes whatever the tool managed to write.
        let staging = staging_path_for(output)?;
        let mut cmd = self.command(input, &staging);

        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| OcrError::TimedOut(timeout))?,
            None => cmd.output().await,
        };
        let cmd_output = result.map_err(OcrError::Spawn)?;
        log_command_output("ocrmypdf", &cmd_output);

        if !cmd_output.status.success() {
            return Err(OcrError::Failed {
                exit_code: cmd_output.status.code(),
                stderr: String::from_utf8_lossy(&cmd_output.stderr).into_owned(),
            });
        }

        staging
            .persist_noclobber(output)
            .map_err(|err| OcrError::Publish {
                path: output.to_owned(),
                source: err.error,
            })?;
        debug!("OCR output saved");
        Ok(())
    }
}
