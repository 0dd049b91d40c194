//! The batch OCR pipeline.
//!
//! For each input file, in order, we:
//!
//! 1. Decide whether it needs processing at all ([`output_policy`]).
//! 2. Find out whether it's encrypted, and get a password if so
//!    ([`password`]).
//! 3. Make a decrypted temporary copy if we have a password ([`decrypt`]).
//! 4. Run OCR on the file or its decrypted copy ([`ocr`]).
//!
//! Every file ends up with exactly one [`ProcessingOutcome`]. Per-file
//! failures are recorded and never stop the batch.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;

use crate::{config::ToolConfig, prelude::*};

use self::{
    decrypt::{Decryptor, QpdfDecryptor},
    ocr::{OcrInvoker, OcrMyPdfInvoker},
    output_policy::{SkipReason, output_path_for, should_skip},
    password::{EncryptionProbe, PasswordPrompt, PasswordResolver, QpdfEncryptionProbe},
};

pub mod decrypt;
pub mod error;
pub mod ocr;
pub mod output_policy;
pub mod password;

/// What happened to a single input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// We wrote an OCRed copy.
    Processed { path: PathBuf },
    /// We decided not to touch this file.
    Skipped { path: PathBuf, reason: SkipReason },
    /// Something went wrong.
    Failed { path: PathBuf, detail: String },
}

impl ProcessingOutcome {
    /// The input file this outcome is about.
    pub fn path(&self) -> &Path {
        match self {
            ProcessingOutcome::Processed { path }
            | ProcessingOutcome::Skipped { path, .. }
            | ProcessingOutcome::Failed { path, .. } => path,
        }
    }
}

/// A skipped file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A failed file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub detail: String,
}

/// The outcomes of a whole batch, each list in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    pub errors: Vec<FailedFile>,
}

impl BatchSummary {
    /// Record an outcome.
    pub fn record(&mut self, outcome: ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Processed { path } => self.processed.push(path),
            ProcessingOutcome::Skipped { path, reason } => {
                self.skipped.push(SkippedFile { path, reason })
            }
            ProcessingOutcome::Failed { path, detail } => {
                self.errors.push(FailedFile { path, detail })
            }
        }
    }

    /// How many files did we see in total?
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.errors.len()
    }

    /// What fraction of files failed?
    pub fn failure_rate(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.errors.len() as f32 / total as f32,
        }
    }
}

/// Receives progress updates, once per file, after that file is finished.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

/// Receives the final results of a batch.
pub trait SummaryReporter {
    fn on_complete(&self, summary: &BatchSummary, input_dir: &Path, output_dir: &Path);
}

/// A flag which asks a running batch to stop at the next file boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// List the PDFs directly inside `input_dir`, sorted by path.
///
/// Subdirectories are not searched. Failing to read the directory is fatal for
/// the whole batch, so it is reported before we start.
#[instrument(level = "debug", skip_all, fields(input_dir = %input_dir.display()))]
pub async fn discover_input_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(input_dir)
        .await
        .with_context(|| format!("cannot read input directory {:?}", input_dir))?;
    let mut paths = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("cannot read entry in {:?}", input_dir))?
    {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            paths.push(path);
        }
    }
    paths.sort();
    debug!(count = paths.len(), "Found input files");
    Ok(paths)
}

/// Make sure we can write to `output_dir`, creating it if needed.
#[instrument(level = "debug", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn ensure_output_dir_writable(output_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("cannot create output directory {:?}", output_dir))?;
    let check = tempfile::Builder::new()
        .prefix(".ocr-batch-write-check")
        .tempfile_in(output_dir)
        .with_context(|| format!("cannot write to output directory {:?}", output_dir))?;
    drop(check);
    Ok(())
}

/// Runs the pipeline over a list of files.
pub struct BatchProcessor {
    resolver: PasswordResolver,
    decryptor: Arc<dyn Decryptor>,
    ocr: Arc<dyn OcrInvoker>,
    cancel: CancelFlag,
}

impl BatchProcessor {
    pub fn new(
        probe: Arc<dyn EncryptionProbe>,
        prompt: Arc<dyn PasswordPrompt>,
        decryptor: Arc<dyn Decryptor>,
        ocr: Arc<dyn OcrInvoker>,
    ) -> Self {
        Self {
            resolver: PasswordResolver::new(probe, prompt),
            decryptor,
            ocr,
            cancel: CancelFlag::new(),
        }
    }

    /// Create a processor using `qpdf` and `ocrmypdf` as configured.
    pub fn from_config(config: &ToolConfig, prompt: Arc<dyn PasswordPrompt>) -> Self {
        Self::new(
            Arc::new(QpdfEncryptionProbe::new(config.qpdf.clone())),
            prompt,
            Arc::new(QpdfDecryptor::new(config.qpdf.clone())),
            Arc::new(OcrMyPdfInvoker::from_config(config)),
        )
    }

    /// Use `cancel` to stop this batch early.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process every file in `inputs`, writing results into `output_dir`.
    ///
    /// This always visits every file. If cancelled, the remaining files are
    /// recorded as skipped.
    #[instrument(level = "debug", skip_all, fields(count = inputs.len()))]
    pub async fn run(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        progress: &dyn ProgressReporter,
    ) -> BatchSummary {
        let total = inputs.len();
        let mut summary = BatchSummary::default();
        for (idx, input) in inputs.iter().enumerate() {
            let outcome = if self.cancel.is_cancelled() {
                ProcessingOutcome::Skipped {
                    path: input.clone(),
                    reason: SkipReason::Cancelled,
                }
            } else {
                self.process_file(input, output_dir).await
            };
            let path = outcome.path().display();
            match &outcome {
                ProcessingOutcome::Processed { .. } => info!(%path, "Processed"),
                ProcessingOutcome::Skipped { reason, .. } => {
                    info!(%path, %reason, "Skipped")
                }
                ProcessingOutcome::Failed { detail, .. } => {
                    warn!(%path, %detail, "Failed")
                }
            }
            summary.record(outcome);
            progress.on_progress(idx + 1, total);
        }
        summary
    }

    /// Process a single file.
    ///
    /// Any decrypted copy lives only inside this function, and is deleted when
    /// it goes out of scope, whether or not OCR worked. Dropping the returned
    /// future part way through also deletes it, and kills any running tool.
    #[instrument(level = "debug", skip_all, fields(path = %input.display()))]
    pub async fn process_file(&self, input: &Path, output_dir: &Path) -> ProcessingOutcome {
        let path = input.to_owned();
        if let Some(reason) = should_skip(input, output_dir) {
            return ProcessingOutcome::Skipped { path, reason };
        }
        let output = output_path_for(input, output_dir);

        let credentials = match self.resolver.resolve(input).await {
            Ok(credentials) => credentials,
            Err(err) => {
                return ProcessingOutcome::Failed {
                    path,
                    detail: err.to_string(),
                };
            }
        };

        let decrypted = match credentials {
            Some(credentials) => match self.decryptor.decrypt(input, &credentials).await {
                Ok(artifact) => Some(artifact),
                Err(err) => {
                    warn!(path = %path.display(), "Decryption failed: {}", err);
                    return ProcessingOutcome::Failed {
                        detail: format!("Failed to decrypt {}", path.display()),
                        path,
                    };
                }
            },
            None => None,
        };
        let ocr_input = decrypted
            .as_ref()
            .map(|artifact| artifact.path())
            .unwrap_or(input);

        match self.ocr.run(ocr_input, &output).await {
            Ok(()) => ProcessingOutcome::Processed { path },
            Err(err) => ProcessingOutcome::Failed {
                detail: format!("{}: {}", path.display(), err),
                path,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Mutex};

    use super::{
        decrypt::tests::FakeDecryptor,
        ocr::tests::FakeOcr,
        password::tests::{ContentsProbe, RecordingPrompt},
        *,
    };

    /// Progress reporter which remembers every update.
    #[derive(Default)]
    struct RecordingProgress {
        updates: Mutex<Vec<(usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn on_progress(&self, completed: usize, total: usize) {
            self.updates.lock().unwrap().push((completed, total));
        }
    }

    /// Progress reporter which cancels the batch after `after` files.
    struct CancelAfter {
        after: usize,
        cancel: CancelFlag,
    }

    impl ProgressReporter for CancelAfter {
        fn on_progress(&self, completed: usize, _total: usize) {
            if completed == self.after {
                self.cancel.cancel();
            }
        }
    }

    /// An input directory, an output directory and a processor wired to fakes.
    struct Fixture {
        input_dir: tempfile::TempDir,
        output_dir: tempfile::TempDir,
        prompt: Arc<RecordingPrompt>,
        decryptor: Arc<FakeDecryptor>,
        ocr: Arc<FakeOcr>,
        processor: BatchProcessor,
    }

    impl Fixture {
        fn new(password_answer: Option<&str>) -> Result<Self> {
            let prompt = RecordingPrompt::new(password_answer);
            let decryptor = FakeDecryptor::new("secret");
            let ocr = FakeOcr::new();
            let processor = BatchProcessor::new(
                Arc::new(ContentsProbe),
                prompt.clone(),
                decryptor.clone(),
                ocr.clone(),
            );
            Ok(Self {
                input_dir: tempfile::TempDir::new()?,
                output_dir: tempfile::TempDir::new()?,
                prompt,
                decryptor,
                ocr,
                processor,
            })
        }

        fn add(&self, name: &str, contents: &str) -> Result<PathBuf> {
            let path = self.input_dir.path().join(name);
            fs::write(&path, contents)?;
            Ok(path)
        }

        async fn run(&self) -> Result<(BatchSummary, Vec<(usize, usize)>)> {
            let inputs = discover_input_files(self.input_dir.path()).await?;
            let progress = RecordingProgress::default();
            let summary = self
                .processor
                .run(&inputs, self.output_dir.path(), &progress)
                .await;
            let updates = progress.updates.into_inner().unwrap();
            Ok((summary, updates))
        }

        /// Names of everything left in the input directory.
        fn input_dir_names(&self) -> Result<Vec<String>> {
            let mut names = fs::read_dir(self.input_dir.path())?
                .map(|entry| -> Result<String> {
                    Ok(entry?.file_name().to_string_lossy().into_owned())
                })
                .collect::<Result<Vec<_>>>()?;
            names.sort();
            Ok(names)
        }
    }

    #[tokio::test]
    async fn end_to_end_with_correct_password() -> Result<()> {
        let fx = Fixture::new(Some("secret"))?;
        let a = fx.add("a.pdf", "%PDF-1.4 plain")?;
        let b = fx.add("ocr_b.pdf", "%PDF-1.4 plain")?;
        let c = fx.add("c.pdf", "%PDF-1.4 ENCRYPTED")?;

        let (summary, updates) = fx.run().await?;
        assert_eq!(summary.processed, [a.clone(), c.clone()]);
        assert_eq!(
            summary.skipped,
            [SkippedFile {
                path: b,
                reason: SkipReason::ReservedPrefix
            }]
        );
        assert!(summary.errors.is_empty());
        assert_eq!(updates, [(1, 3), (2, 3), (3, 3)]);

        // OCR ran on `a.pdf` directly, and on a decrypted copy of `c.pdf`.
        let created = fx.decryptor.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert_eq!(fx.ocr.inputs(), [a, created[0].clone()]);
        assert!(!created[0].exists());
        assert_eq!(fx.input_dir_names()?, ["a.pdf", "c.pdf", "ocr_b.pdf"]);

        let c_out = fs::read_to_string(fx.output_dir.path().join("ocr_c.pdf"))?;
        assert!(c_out.contains("decrypted"));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_fails_without_ocr_or_temp_files() -> Result<()> {
        let fx = Fixture::new(Some("wrong"))?;
        let c = fx.add("c.pdf", "%PDF-1.4 ENCRYPTED")?;

        let (summary, _) = fx.run().await?;
        assert!(summary.processed.is_empty());
        assert_eq!(
            summary.errors,
            [FailedFile {
                path: c.clone(),
                detail: format!("Failed to decrypt {}", c.display()),
            }]
        );
        assert!(fx.ocr.inputs().is_empty());
        assert_eq!(fx.input_dir_names()?, ["c.pdf"]);
        assert!(!fx.output_dir.path().join("ocr_c.pdf").exists());
        Ok(())
    }

    /// Log output captured from `tracing`.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn decryption_failure_reason_is_logged_as_warning() -> Result<()> {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let fx = Fixture::new(Some("wrong"))?;
        let c = fx.add("c.pdf", "%PDF-1.4 ENCRYPTED")?;
        let outcome = fx.processor.process_file(&c, fx.output_dir.path()).await;
        assert_eq!(
            outcome,
            ProcessingOutcome::Failed {
                path: c.clone(),
                detail: format!("Failed to decrypt {}", c.display()),
            }
        );

        let logged = String::from_utf8(logs.0.lock().unwrap().clone())?;
        assert!(logged.contains("WARN"), "{logged}");
        assert!(logged.contains("Decryption failed: incorrect password"), "{logged}");
        Ok(())
    }

    #[tokio::test]
    async fn absent_password_fails_without_ocr() -> Result<()> {
        let fx = Fixture::new(None)?;
        fx.add("c.pdf", "%PDF-1.4 ENCRYPTED")?;

        let (summary, updates) = fx.run().await?;
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].detail.starts_with("Failed to decrypt"));
        assert!(fx.ocr.inputs().is_empty());
        assert_eq!(fx.prompt.times_called(), 1);
        assert_eq!(updates, [(1, 1)]);
        Ok(())
    }

    #[tokio::test]
    async fn unencrypted_files_never_prompt() -> Result<()> {
        let fx = Fixture::new(Some("secret"))?;
        fx.add("a.pdf", "%PDF-1.4 plain")?;
        fx.add("b.PDF", "%PDF-1.4 plain")?;

        let (summary, _) = fx.run().await?;
        assert_eq!(summary.processed.len(), 2);
        assert_eq!(fx.prompt.times_called(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn existing_outputs_are_skipped_and_untouched() -> Result<()> {
        let fx = Fixture::new(None)?;
        let a = fx.add("a.pdf", "%PDF-1.4 plain")?;
        let existing = fx.output_dir.path().join("ocr_a.pdf");
        fs::write(&existing, b"original bytes")?;

        let (summary, _) = fx.run().await?;
        assert_eq!(
            summary.skipped,
            [SkippedFile {
                path: a,
                reason: SkipReason::OutputExists
            }]
        );
        assert!(fx.ocr.inputs().is_empty());
        assert_eq!(fs::read(&existing)?, b"original bytes");
        Ok(())
    }

    #[tokio::test]
    async fn ocr_failures_are_recorded_and_the_batch_continues() -> Result<()> {
        let fx = Fixture::new(None)?;
        let a = fx.add("a.pdf", "%PDF-1.4 BROKEN")?;
        let b = fx.add("b.pdf", "%PDF-1.4 plain")?;

        let (summary, updates) = fx.run().await?;
        assert_eq!(summary.processed, [b]);
        assert_eq!(
            summary.errors,
            [FailedFile {
                path: a.clone(),
                detail: format!("{}: cannot process this file", a.display()),
            }]
        );
        assert_eq!(updates, [(1, 2), (2, 2)]);
        Ok(())
    }

    #[tokio::test]
    async fn decrypted_copy_is_removed_when_ocr_fails() -> Result<()> {
        // The fake decryptor accepts "secret", but the fake OCR then rejects
        // the decrypted copy because it has been told this input is broken.
        struct BrokenAfterDecrypt;

        #[async_trait]
        impl OcrInvoker for BrokenAfterDecrypt {
            async fn run(
                &self,
                input: &Path,
                _output: &Path,
            ) -> Result<(), error::OcrError> {
                assert!(input.exists());
                Err(error::OcrError::Failed {
                    exit_code: Some(1),
                    stderr: "boom".to_owned(),
                })
            }
        }

        let decryptor = FakeDecryptor::new("secret");
        let processor = BatchProcessor::new(
            Arc::new(ContentsProbe),
            RecordingPrompt::new(Some("secret")),
            decryptor.clone(),
            Arc::new(BrokenAfterDecrypt),
        );
        let input_dir = tempfile::TempDir::new()?;
        let output_dir = tempfile::TempDir::new()?;
        let c = input_dir.path().join("c.pdf");
        fs::write(&c, "%PDF-1.4 ENCRYPTED")?;

        let outcome = processor.process_file(&c, output_dir.path()).await;
        assert_eq!(
            outcome,
            ProcessingOutcome::Failed {
                path: c.clone(),
                detail: format!("{}: boom", c.display()),
            }
        );
        let created = decryptor.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(!created[0].exists());
        Ok(())
    }

    #[tokio::test]
    async fn abandoning_a_file_mid_ocr_removes_decrypted_copy() -> Result<()> {
        // OCR which never finishes, so that the caller has to give up on it.
        struct Hangs;

        #[async_trait]
        impl OcrInvoker for Hangs {
            async fn run(
                &self,
                input: &Path,
                _output: &Path,
            ) -> Result<(), error::OcrError> {
                assert!(input.exists());
                std::future::pending().await
            }
        }

        let decryptor = FakeDecryptor::new("secret");
        let processor = BatchProcessor::new(
            Arc::new(ContentsProbe),
            RecordingPrompt::new(Some("secret")),
            decryptor.clone(),
            Arc::new(Hangs),
        );
        let input_dir = tempfile::TempDir::new()?;
        let output_dir = tempfile::TempDir::new()?;
        let c = input_dir.path().join("c.pdf");
        fs::write(&c, "%PDF-1.4 ENCRYPTED")?;

        let progress = RecordingProgress::default();
        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            processor.run(&[c], output_dir.path(), &progress),
        )
        .await;
        assert!(abandoned.is_err());

        let created = decryptor.created.lock().unwrap().clone();
        assert_eq!(created.len(), 1);
        assert!(!created[0].exists());
        assert_eq!(fs::read_dir(input_dir.path())?.count(), 1);
        assert_eq!(fs::read_dir(output_dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_inputs_are_failures() -> Result<()> {
        let fx = Fixture::new(None)?;
        let missing = fx.input_dir.path().join("gone.pdf");
        let progress = RecordingProgress::default();
        let summary = fx
            .processor
            .run(&[missing.clone()], fx.output_dir.path(), &progress)
            .await;
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, missing);
        assert!(summary.errors[0].detail.starts_with("cannot read"));
        assert_eq!(progress.updates.lock().unwrap().as_slice(), [(1, 1)]);
        Ok(())
    }

    #[tokio::test]
    async fn second_run_skips_everything_processed_by_the_first() -> Result<()> {
        let fx = Fixture::new(Some("secret"))?;
        fx.add("a.pdf", "%PDF-1.4 plain")?;
        fx.add("c.pdf", "%PDF-1.4 ENCRYPTED")?;

        let (first, _) = fx.run().await?;
        assert_eq!(first.processed.len(), 2);

        let (second, _) = fx.run().await?;
        assert!(second.processed.is_empty());
        let skipped = second
            .skipped
            .iter()
            .map(|skipped| (skipped.path.clone(), skipped.reason))
            .collect::<Vec<_>>();
        let expected = first
            .processed
            .iter()
            .map(|path| (path.clone(), SkipReason::OutputExists))
            .collect::<Vec<_>>();
        assert_eq!(skipped, expected);
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_files() -> Result<()> {
        let fx = Fixture::new(None)?;
        let cancel = CancelFlag::new();
        let processor = BatchProcessor::new(
            Arc::new(ContentsProbe),
            fx.prompt.clone(),
            fx.decryptor.clone(),
            fx.ocr.clone(),
        )
        .with_cancel_flag(cancel.clone());
        let a = fx.add("a.pdf", "%PDF-1.4 plain")?;
        let b = fx.add("b.pdf", "%PDF-1.4 plain")?;
        let c = fx.add("c.pdf", "%PDF-1.4 plain")?;

        let progress = CancelAfter { after: 1, cancel };
        let summary = processor
            .run(&[a.clone(), b.clone(), c.clone()], fx.output_dir.path(), &progress)
            .await;
        assert_eq!(summary.processed, [a]);
        assert_eq!(
            summary.skipped,
            [
                SkippedFile {
                    path: b,
                    reason: SkipReason::Cancelled
                },
                SkippedFile {
                    path: c,
                    reason: SkipReason::Cancelled
                },
            ]
        );
        assert_eq!(summary.total(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn discovery_ignores_subdirectories_and_other_files() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join("b.pdf"), "")?;
        fs::write(dir.path().join("A.PDF"), "")?;
        fs::write(dir.path().join("notes.txt"), "")?;
        fs::create_dir(dir.path().join("nested.pdf"))?;
        fs::write(dir.path().join("nested.pdf").join("deep.pdf"), "")?;

        let found = discover_input_files(dir.path()).await?;
        assert_eq!(found, [dir.path().join("A.PDF"), dir.path().join("b.pdf")]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_input_directory_is_fatal() {
        assert!(
            discover_input_files(Path::new("/does/not/exist"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn output_directory_is_created() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let out = dir.path().join("new").join("out");
        ensure_output_dir_writable(&out).await?;
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out)?.count(), 0);
        Ok(())
    }

    #[test]
    fn failure_rate_counts_errors() {
        let mut summary = BatchSummary::default();
        assert_eq!(summary.failure_rate(), 0.0);
        summary.record(ProcessingOutcome::Processed {
            path: PathBuf::from("a.pdf"),
        });
        summary.record(ProcessingOutcome::Failed {
            path: PathBuf::from("b.pdf"),
            detail: "bad".to_owned(),
        });
        assert_eq!(summary.failure_rate(), 0.5);
    }
}
