//! The `check-tools` subcommand.

use clap::Args;
use tokio::process::Command;

use crate::{async_utils::check_for_command_failure, config::ToolOpts, prelude::*};

/// Options for the `check-tools` subcommand.
#[derive(Args, Clone, Debug)]
pub struct CheckToolsOpts {
    #[clap(flatten)]
    pub tools: ToolOpts,
}

/// Make sure every external tool we need can be run.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_check_tools(opts: &CheckToolsOpts) -> Result<()> {
    let config = opts.tools.load().await?;
    let mut missing = vec![];
    for (name, program) in [("ocrmypdf", &config.ocrmypdf), ("qpdf", &config.qpdf)] {
        match tool_version(name, program).await {
            Ok(version) => println!("{}: {} ({})", name, version, program.display()),
            Err(err) => {
                println!("{}: not available ({:#})", name, err);
                missing.push(name);
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("missing tools: {}", missing.join(", ")))
    }
}

/// Run `<program> --version` and return the first line it prints.
async fn tool_version(name: &str, program: &Path) -> Result<String> {
    let output = Command::new(program)
        .arg("--version")
        .output()
        .await
        .with_context(|| format!("cannot run {:?}", program))?;
    check_for_command_failure(name, &output)?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_owned())
}
