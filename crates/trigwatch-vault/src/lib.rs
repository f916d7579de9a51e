//! Interactive credential picker over an encrypted KDBX database.
//!
//! The picker is a [`SecretSource`] for the dispatcher's `keepass` verb. It
//! owns no GUI: the host supplies modal dialogs through [`PromptUi`], and
//! the database backend sits behind [`SecretStore`] so tests (and hosts
//! built without the `kdbx` feature) can substitute their own.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};
use trigwatch_dispatch::SecretSource;

#[cfg(feature = "kdbx")]
mod kdbx;
#[cfg(feature = "kdbx")]
pub use kdbx::KdbxStore;

/// One credential, snapshotted read-only for a single picker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub username: String,
    pub title: String,
    pub group: String,
    pub secret: String,
}

/// Modal dialogs supplied by the host. Both calls block the event loop
/// until the user answers, the same way the host's own dialogs do.
pub trait PromptUi {
    /// Masked text entry for the database master passphrase. `None` means
    /// the dialog was cancelled.
    fn prompt_passphrase(&self) -> Option<String>;

    /// Searchable list selection. `initial_filter` seeds the search box;
    /// live filtering should use [`filter_entries`]. Returns the index of
    /// the chosen entry, or `None` when dismissed.
    fn prompt_select(&self, entries: &[CredentialEntry], initial_filter: &str) -> Option<usize>;
}

/// Backend that opens the database and lists its entries.
pub trait SecretStore {
    fn load_entries(&self, path: &Path, passphrase: &str) -> Result<Vec<CredentialEntry>>;
}

/// Filter predicate shared by the picker UI and tests: case-insensitive
/// substring match against the entry username.
pub fn filter_entries<'a>(
    entries: &'a [CredentialEntry],
    filter: &str,
) -> Vec<&'a CredentialEntry> {
    let needle = filter.to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.username.to_lowercase().contains(&needle))
        .collect()
}

/// The credential picker.
///
/// Starts locked. The first use prompts once for the master passphrase and
/// caches it for the lifetime of the process; a cancelled prompt leaves the
/// picker locked. The cache is never invalidated, not even when an open
/// fails: a mistyped passphrase keeps failing on every later invocation
/// until the host restarts.
pub struct VaultPicker<S, P> {
    database: Option<PathBuf>,
    store: S,
    prompt: P,
    passphrase: RefCell<Option<String>>,
}

impl<S: SecretStore, P: PromptUi> VaultPicker<S, P> {
    pub fn new(database: Option<PathBuf>, store: S, prompt: P) -> Self {
        Self {
            database,
            store,
            prompt,
            passphrase: RefCell::new(None),
        }
    }

    /// Whether a master passphrase is cached.
    pub fn is_unlocked(&self) -> bool {
        self.passphrase.borrow().is_some()
    }

    /// Run one picker invocation: unlock if needed, open the database,
    /// let the user choose an entry, return its secret.
    pub fn pick(&self, filter: &str) -> Result<Option<String>> {
        let Some(path) = self.database.clone() else {
            debug!("credential picker disabled: no database configured");
            return Ok(None);
        };
        let Some(passphrase) = self.cached_or_prompted_passphrase() else {
            debug!("master passphrase prompt cancelled");
            return Ok(None);
        };
        let entries = match self.store.load_entries(&path, &passphrase) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "failed to open credential database {}: {err:#}",
                    path.display()
                );
                return Ok(None);
            }
        };
        let Some(index) = self.prompt.prompt_select(&entries, filter) else {
            debug!("credential selection dismissed");
            return Ok(None);
        };
        Ok(entries.get(index).map(|entry| entry.secret.clone()))
    }

    fn cached_or_prompted_passphrase(&self) -> Option<String> {
        if let Some(cached) = self.passphrase.borrow().clone() {
            return Some(cached);
        }
        // The prompt is modal and pumps the host event loop, so no borrow
        // is held while it runs.
        let entered = self.prompt.prompt_passphrase()?;
        *self.passphrase.borrow_mut() = Some(entered.clone());
        Some(entered)
    }
}

impl<S: SecretStore, P: PromptUi> SecretSource for VaultPicker<S, P> {
    fn secret(&self, filter: &str) -> Result<Option<String>> {
        self.pick(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(username: &str, secret: &str) -> CredentialEntry {
        CredentialEntry {
            username: username.to_string(),
            title: format!("{username} account"),
            group: "root".to_string(),
            secret: secret.to_string(),
        }
    }

    #[test]
    fn filter_is_case_insensitive_substring_on_username() {
        let entries = vec![
            entry("Admin", "a"),
            entry("deploy-bot", "b"),
            entry("administrator", "c"),
        ];
        let hits = filter_entries(&entries, "admin");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].username, "Admin");
        assert_eq!(hits[1].username, "administrator");
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let entries = vec![entry("a", "1"), entry("b", "2")];
        assert_eq!(filter_entries(&entries, "").len(), 2);
    }
}
