//! Detecting encrypted PDFs and asking for their passwords.

use std::{
    fmt,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use tokio::process::Command;

use crate::{
    async_utils::{
        detach_from_terminal_signals, log_command_output, spawn_blocking_propagating_panics,
    },
    prelude::*,
};

use super::error::ReadError;

/// `qpdf` prefixes warnings, including those about repaired damage, like this.
static WARNING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*WARNING:").expect("failed to compile regex"));

/// A password for one input file.
///
/// This lives only as long as the processing of that file, and its [`Debug`]
/// output never contains the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    password: String,
}

impl Credentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// The password itself.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Did the user decline to supply a password?
    pub fn is_empty(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Something that can ask a human (or a lookup table) for a password.
///
/// This is called from a blocking thread, so implementations may block on
/// terminal input.
pub trait PasswordPrompt: Send + Sync + 'static {
    /// Ask for the password of `display_name`. `None` means no password is
    /// available.
    fn prompt_for_password(&self, display_name: &str) -> Option<String>;
}

impl<F> PasswordPrompt for F
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    fn prompt_for_password(&self, display_name: &str) -> Option<String> {
        self(display_name)
    }
}

/// Interface for checking whether a PDF is encrypted.
#[async_trait]
pub trait EncryptionProbe: Send + Sync + 'static {
    /// Is the PDF at `path` encrypted?
    async fn is_encrypted(&self, path: &Path) -> Result<bool, ReadError>;
}

/// [`EncryptionProbe`] wrapping `qpdf --is-encrypted`.
///
/// `qpdf` exits with 0 for encrypted files and 2 for unencrypted ones. It
/// prints warnings for damaged files it can still read, and errors for files
/// it can't.
pub struct QpdfEncryptionProbe {
    qpdf: PathBuf,
}

impl QpdfEncryptionProbe {
    pub fn new(qpdf: impl Into<PathBuf>) -> Self {
        Self { qpdf: qpdf.into() }
    }
}

#[async_trait]
impl EncryptionProbe for QpdfEncryptionProbe {
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    async fn is_encrypted(&self, path: &Path) -> Result<bool, ReadError> {
        let mut cmd = Command::new(&self.qpdf);
        cmd.arg("--is-encrypted").arg(path).kill_on_drop(true);
        let output = detach_from_terminal_signals(&mut cmd)
            .output()
            .await
            .map_err(|err| {
                ReadError::new(path, format!("cannot run {:?}: {}", self.qpdf, err))
            })?;
        log_command_output("qpdf", &output);

        // Damaged but readable files still get an answer, with warnings.
        let stderr = String::from_utf8_lossy(&output.stderr);
        let errors = stderr
            .lines()
            .filter(|line| !line.trim().is_empty() && !is_warning_line(line))
            .collect::<Vec<_>>();
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) if errors.is_empty() => Ok(false),
            _ => Err(ReadError::new(path, stderr.trim())),
        }
    }
}

/// Is this a `qpdf` warning, rather than an error?
fn is_warning_line(line: &str) -> bool {
    WARNING_REGEX.is_match(line)
}

/// Decides whether a file needs a password, and gets one if it does.
#[derive(Clone)]
pub struct PasswordResolver {
    probe: Arc<dyn EncryptionProbe>,
    prompt: Arc<dyn PasswordPrompt>,
}

impl PasswordResolver {
    pub fn new(probe: Arc<dyn EncryptionProbe>, prompt: Arc<dyn PasswordPrompt>) -> Self {
        Self { probe, prompt }
    }

    /// Get the credentials for `path`.
    ///
    /// Returns `None` for unencrypted files, without prompting. For encrypted
    /// files, this always returns credentials, but they will be empty if the
    /// prompt had no answer.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn resolve(&self, path: &Path) -> Result<Option<Credentials>, ReadError> {
        // Make sure we can open the file before handing it to anyone else.
        tokio::fs::File::open(path)
            .await
            .map_err(|err| ReadError::new(path, err.to_string()))?;

        if !self.probe.is_encrypted(path).await? {
            trace!("File is not encrypted");
            return Ok(None);
        }

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(file = %display_name, "File is encrypted, asking for password");
        let prompt = self.prompt.clone();
        let password = spawn_blocking_propagating_panics(move || {
            prompt.prompt_for_password(&display_name)
        })
        .await;
        Ok(Some(Credentials::new(password.unwrap_or_default())))
    }
}
