//! The trigger action mini-language.
//!
//! An action line's first whitespace-delimited token names a verb; the rest
//! is the verb's argument string. `execute` returns at most one line of text
//! to type back into the terminal, `Ok(None)` when there is nothing to type
//! (unknown verb, cancelled picker), and `Err` only for real failures such
//! as a command that cannot be launched. The watch loop treats `Err` as
//! "no result" after logging it, so a broken action never stops watching.

use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Source of secrets for the `keepass` verb. Implemented by the credential
/// picker; absent when the add-on is built or configured without one.
pub trait SecretSource {
    /// Resolve a secret, with `filter` seeding the picker's search box.
    /// `Ok(None)` means the user cancelled or the source is unavailable.
    fn secret(&self, filter: &str) -> Result<Option<String>>;
}

/// The verbs an action line can start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Run a command, type back the last line of its stdout.
    Exec,
    /// Type back the argument text verbatim.
    Input,
    /// Type back a secret chosen through the credential picker.
    Keepass,
}

impl Verb {
    pub fn parse(token: &str) -> Option<Verb> {
        match token {
            "exec" => Some(Verb::Exec),
            "input" => Some(Verb::Input),
            "keepass" => Some(Verb::Keepass),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Verb::Exec => "exec",
            Verb::Input => "input",
            Verb::Keepass => "keepass",
        }
    }
}

/// Executes trigger action lines.
pub struct Dispatcher {
    secrets: Option<Box<dyn SecretSource>>,
}

impl Dispatcher {
    /// A dispatcher without a credential source; `keepass` actions resolve
    /// to nothing.
    pub fn new() -> Self {
        Self { secrets: None }
    }

    pub fn with_secret_source(source: Box<dyn SecretSource>) -> Self {
        Self {
            secrets: Some(source),
        }
    }

    /// Run one action line, returning the single-line result with trailing
    /// whitespace stripped.
    pub fn execute(&self, action_line: &str) -> Result<Option<String>> {
        let line = action_line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (line, ""),
        };
        match Verb::parse(token) {
            Some(Verb::Exec) => self.run_exec(rest).map(Some),
            Some(Verb::Input) => Ok(Some(rest.to_string())),
            Some(Verb::Keepass) => self.pull_secret(rest),
            None => {
                debug!(verb = token, "ignoring unknown trigger verb");
                Ok(None)
            }
        }
    }

    fn run_exec(&self, command_line: &str) -> Result<String> {
        let words = shell_words::split(command_line)
            .with_context(|| format!("malformed exec command: {command_line}"))?;
        let Some((program, args)) = words.split_first() else {
            bail!("empty exec command");
        };
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to launch '{program}'"))?;
        if !output.status.success() {
            debug!(program = %program, status = %output.status, "exec command exited non-zero");
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(last_line(&stdout))
    }

    fn pull_secret(&self, filter: &str) -> Result<Option<String>> {
        match &self.secrets {
            Some(source) => source.secret(filter),
            None => {
                debug!("keepass action disabled: no credential source configured");
                Ok(None)
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Last line of captured output, trailing whitespace stripped. Empty output
/// yields an empty string.
fn last_line(output: &str) -> String {
    output
        .trim_end()
        .rsplit('\n')
        .next()
        .unwrap_or("")
        .to_string()
}
