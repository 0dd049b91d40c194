//! External tool configuration.
//!
//! The pipeline never looks at `PATH` or other environment variables itself.
//! Everything it needs to find its tools arrives in a [`ToolConfig`].

use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{async_utils::io::read_json_or_toml, prelude::*};

/// Paths and settings for the external tools we orchestrate.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// The `ocrmypdf` executable.
    pub ocrmypdf: PathBuf,

    /// The `qpdf` executable, used to detect encryption and to decrypt.
    pub qpdf: PathBuf,

    /// Kill `ocrmypdf` if it runs longer than this many seconds.
    pub ocr_timeout_secs: Option<u64>,

    /// Extra arguments for `ocrmypdf`, placed before the standard ones.
    pub ocrmypdf_extra_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ocrmypdf: PathBuf::from("ocrmypdf"),
            qpdf: PathBuf::from("qpdf"),
            ocr_timeout_secs: None,
            ocrmypdf_extra_args: vec![],
        }
    }
}

impl ToolConfig {
    /// How long may a single OCR run take?
    pub fn ocr_timeout(&self) -> Option<Duration> {
        self.ocr_timeout_secs.map(Duration::from_secs)
    }
}

/// Command-line options for locating tools.
#[derive(Args, Clone, Debug, Default)]
pub struct ToolOpts {
    /// A TOML or JSON file with tool settings. Command-line options override
    /// values from this file.
    #[clap(long = "config")]
    pub config_path: Option<PathBuf>,

    /// Path to the `ocrmypdf` executable.
    #[clap(long, env = "OCRMYPDF")]
    pub ocrmypdf: Option<PathBuf>,

    /// Path to the `qpdf` executable.
    #[clap(long, env = "QPDF")]
    pub qpdf: Option<PathBuf>,

    /// Kill the OCR tool if it takes longer than this many seconds on one
    /// file.
    #[clap(long = "ocr-timeout", value_name = "SECONDS")]
    pub ocr_timeout_secs: Option<u64>,
}

impl ToolOpts {
    /// Build our final [`ToolConfig`], reading `--config` if present.
    #[instrument(level = "debug", skip_all)]
    pub async fn load(&self) -> Result<ToolConfig> {
        let base = match &self.config_path {
            Some(path) => read_json_or_toml::<ToolConfig>(path)
                .await
                .with_context(|| format!("cannot load tool config {:?}", path))?,
            None => ToolConfig::default(),
        };
        let config = self.apply_overrides(base);
        debug!(?config, "Loaded tool configuration");
        Ok(config)
    }

    /// Apply command-line overrides to a config.
    fn apply_overrides(&self, mut config: ToolConfig) -> ToolConfig {
        if let Some(ocrmypdf) = &self.ocrmypdf {
            config.ocrmypdf = ocrmypdf.clone();
        }
        if let Some(qpdf) = &self.qpdf {
            config.qpdf = qpdf.clone();
        }
        if self.ocr_timeout_secs.is_some() {
            config.ocr_timeout_secs = self.ocr_timeout_secs;
        }
        config
    }
}
