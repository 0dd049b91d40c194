//! Per-file failures.
//!
//! These never abort a batch. [`super::BatchProcessor`] turns each of them into
//! a [`super::ProcessingOutcome::Failed`] record and moves on.

use std::io;

use thiserror::Error;

use crate::prelude::*;

/// We could not open an input file far enough to see whether it's encrypted.
#[derive(Debug, Error)]
#[error("cannot read {}: {message}", .path.display())]
pub struct ReadError {
    /// The file we were trying to read.
    pub path: PathBuf,
    /// What went wrong.
    pub message: String,
}

impl ReadError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_owned(),
            message: message.into(),
        }
    }
}

/// Decrypting a password-protected file failed.
#[derive(Debug, Error)]
pub enum DecryptError {
    /// Nobody supplied a password.
    #[error("no password supplied")]
    NoPassword,

    /// The decryption tool rejected the password.
    #[error("incorrect password")]
    WrongPassword,

    /// Reading the input or writing the decrypted copy failed.
    #[error("I/O error during decryption: {0}")]
    Io(String),
}

impl From<io::Error> for DecryptError {
    fn from(err: io::Error) -> Self {
        DecryptError::Io(err.to_string())
    }
}

/// The OCR step failed.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The OCR tool exited with a failure status.
    #[error("{}", .stderr.trim_end())]
    Failed {
        /// The exit code, if the tool exited normally.
        exit_code: Option<i32>,
        /// Everything the tool wrote to standard error.
        stderr: String,
    },

    /// The OCR tool did not finish in time and was killed.
    #[error("OCR timed out after {} seconds", .0.as_secs())]
    TimedOut(std::time::Duration),

    /// The OCR tool could not be started.
    #[error("cannot run OCR tool: {0}")]
    Spawn(#[source] io::Error),

    /// OCR worked, but moving the result into place failed.
    #[error("cannot write {}: {source}", .path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
