//! KDBX-backed [`SecretStore`] using the `keepass` crate.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use keepass::db::{Group, Node};
use keepass::{Database, DatabaseKey};

use crate::{CredentialEntry, SecretStore};

/// Opens a KDBX database fresh on every invocation; entries are never
/// cached between picks.
pub struct KdbxStore;

impl SecretStore for KdbxStore {
    fn load_entries(&self, path: &Path, passphrase: &str) -> Result<Vec<CredentialEntry>> {
        let mut file = File::open(path)
            .with_context(|| format!("cannot read database {}", path.display()))?;
        let key = DatabaseKey::new().with_password(passphrase);
        let db = Database::open(&mut file, key)
            .with_context(|| format!("cannot open database {}", path.display()))?;
        let mut entries = Vec::new();
        collect_entries(&db.root, &mut entries);
        Ok(entries)
    }
}

fn collect_entries(group: &Group, out: &mut Vec<CredentialEntry>) {
    for node in &group.children {
        match node {
            Node::Group(child) => collect_entries(child, out),
            Node::Entry(entry) => out.push(CredentialEntry {
                username: entry.get_username().unwrap_or_default().to_string(),
                title: entry.get_title().unwrap_or_default().to_string(),
                group: group.name.clone(),
                secret: entry.get_password().unwrap_or_default().to_string(),
            }),
        }
    }
}
