//! Where passwords come from when running from the command line.
//!
//! We first look in an optional password file, and then (if allowed) ask on
//! the terminal.

use std::collections::BTreeMap;

use console::Term;

use crate::{
    async_utils::io::read_json_or_toml, pipeline::password::PasswordPrompt, prelude::*,
    ui::Ui,
};

/// Known passwords, keyed by file name.
#[derive(Default)]
pub struct PasswordBook {
    passwords: BTreeMap<String, String>,
}

impl PasswordBook {
    /// Load a TOML or JSON table mapping file names to passwords.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self> {
        let passwords = read_json_or_toml::<BTreeMap<String, String>>(path)
            .await
            .with_context(|| format!("cannot load passwords from {:?}", path))?;
        debug!(count = passwords.len(), "Loaded passwords");
        Ok(Self { passwords })
    }

    /// Look up the password for a file name.
    pub fn get(&self, display_name: &str) -> Option<&str> {
        self.passwords.get(display_name).map(String::as_str)
    }
}

/// [`PasswordPrompt`] for the command line.
pub struct CliPasswordPrompt {
    book: PasswordBook,
    /// Used to hide progress bars while we're prompting. `None` means we may
    /// not prompt at all.
    ui: Option<Ui>,
}

impl CliPasswordPrompt {
    pub fn new(book: PasswordBook, ui: Option<Ui>) -> Self {
        Self { book, ui }
    }

    /// Ask on the terminal. Returns `None` if there is no terminal or the user
    /// just pressed Enter.
    fn ask_terminal(ui: &Ui, display_name: &str) -> Option<String> {
        let term = Term::stderr();
        if !term.is_term() {
            warn!(file = %display_name, "Cannot prompt for password without a terminal");
            return None;
        }
        let answer = ui.multi_progress().suspend(|| -> std::io::Result<String> {
            term.write_str(&format!("Password for {}: ", display_name))?;
            term.read_secure_line()
        });
        match answer {
            Ok(password) if !password.is_empty() => Some(password),
            Ok(_) => None,
            Err(err) => {
                warn!(file = %display_name, "Could not read password: {}", err);
                None
            }
        }
    }
}

impl PasswordPrompt for CliPasswordPrompt {
    fn prompt_for_password(&self, display_name: &str) -> Option<String> {
        if let Some(password) = self.book.get(display_name) {
            debug!(file = %display_name, "Using password from password file");
            return Some(password.to_owned());
        }
        match &self.ui {
            Some(ui) => Self::ask_terminal(ui, display_name),
            None => {
                debug!(file = %display_name, "No password available");
                None
            }
        }
    }
}
