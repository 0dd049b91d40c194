//! Making password-free copies of encrypted PDFs.

use std::{process::Stdio, sync::LazyLock};

use regex::Regex;
use tempfile::TempPath;
use tokio::{io::AsyncWriteExt as _, process::Command};

use crate::{
    async_utils::{detach_from_terminal_signals, log_command_output},
    prelude::*,
};

use super::{error::DecryptError, password::Credentials};

/// How `qpdf` tells us that the password was wrong.
static WRONG_PASSWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)invalid password").expect("failed to compile regex"));

/// A decrypted copy of an input file.
///
/// The file is deleted when this is dropped, so holding one of these for the
/// duration of a single file's processing guarantees cleanup on every path.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Take ownership of an existing file, which will be deleted on drop.
    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The path of the decrypted copy.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            error!(
                path = ?self.path.display(),
                "failed to delete decrypted copy: {}",
                err
            );
        }
    }
}

/// Interface for decrypting a PDF.
#[async_trait]
pub trait Decryptor: Send + Sync + 'static {
    /// Write a decrypted copy of `input` next to it. On failure, no file is
    /// left behind.
    async fn decrypt(
        &self,
        input: &Path,
        credentials: &Credentials,
    ) -> Result<TempArtifact, DecryptError>;
}

/// Create a unique, empty sibling file for the decrypted copy of `input`.
pub fn sibling_temp_path(input: &Path) -> Result<TempPath, DecryptError> {
    let dir = match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let stem = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&format!("{}_temp", stem))
        .suffix(".pdf")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// [`Decryptor`] wrapping `qpdf --decrypt`.
///
/// The password is sent on standard input using `--password-file=-`, so that it
/// never appears in the process list.
pub struct QpdfDecryptor {
    qpdf: PathBuf,
}

impl QpdfDecryptor {
    pub fn new(qpdf: impl Into<PathBuf>) -> Self {
        Self { qpdf: qpdf.into() }
    }
}

#[async_trait]
impl Decryptor for QpdfDecryptor {
    #[instrument(level = "debug", skip_all, fields(input = %input.display()))]
    async fn decrypt(
        &self,
        input: &Path,
        credentials: &Credentials,
    ) -> Result<TempArtifact, DecryptError> {
        if credentials.is_empty() {
            return Err(DecryptError::NoPassword);
        }

        // If we bail out before the end of this function, `temp_path` deletes
        // the partial output.
        let temp_path = sibling_temp_path(input)?;

        let mut cmd = Command::new(&self.qpdf);
        cmd.arg("--password-file=-")
            .arg("--decrypt")
            .arg(input)
            .arg(&*temp_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = detach_from_terminal_signals(&mut cmd)
            .spawn()
            .map_err(|err| {
                DecryptError::Io(format!("cannot run {:?}: {}", self.qpdf, err))
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            let mut line = credentials.password().to_owned();
            line.push('\n');
            stdin.write_all(line.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;
        log_command_output("qpdf", &output);

        // Exit status 3 means "succeeded with warnings".
        match output.status.code() {
            Some(0) | Some(3) => {
                debug!(output = %temp_path.display(), "Decrypted PDF");
                Ok(TempArtifact::from_path(temp_path.keep().map_err(|err| {
                    DecryptError::Io(err.error.to_string())
                })?))
            }
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if WRONG_PASSWORD_REGEX.is_match(&stderr) {
                    Err(DecryptError::WrongPassword)
                } else {
                    Err(DecryptError::Io(stderr.trim().to_owned()))
                }
            }
        }
    }
}
